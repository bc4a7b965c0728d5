/// RSS and sitemap rendering
use crate::db::{about, categories, posts};
use crate::error::Result;
use crate::models::{PostFilter, PostSummary, SitemapEntry};
use crate::services::posts::PostService;
use sqlx::PgPool;
use std::fmt::Write;

pub const RSS_ITEMS: i64 = 20;
const SITEMAP_POSTS: i64 = 10_000;

/// Escape text for XML element content and attribute values
pub fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

/// RSS 2.0 channel for `posts`
pub fn render_rss(site_name: &str, base_url: &str, posts: &[PostSummary]) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n<channel>\n");
    let _ = writeln!(xml, "<title>{}</title>", xml_escape(site_name));
    let _ = writeln!(xml, "<link>{}/</link>", xml_escape(base_url));
    let _ = writeln!(xml, "<description>Latest posts from {}</description>", xml_escape(site_name));
    let _ = writeln!(
        xml,
        "<atom:link href=\"{}/feed.xml\" rel=\"self\" type=\"application/rss+xml\"/>",
        xml_escape(base_url)
    );
    if let Some(latest) = posts.iter().filter_map(|p| p.published_at).max() {
        let _ = writeln!(xml, "<lastBuildDate>{}</lastBuildDate>", latest.to_rfc2822());
    }

    for post in posts {
        let link = format!("{}/posts/{}", base_url, post.slug);
        xml.push_str("<item>\n");
        let _ = writeln!(xml, "<title>{}</title>", xml_escape(&post.title));
        let _ = writeln!(xml, "<link>{}</link>", xml_escape(&link));
        let _ = writeln!(xml, "<guid isPermaLink=\"true\">{}</guid>", xml_escape(&link));
        let _ = writeln!(xml, "<description>{}</description>", xml_escape(&post.excerpt));
        let author = post
            .author
            .display_name
            .as_deref()
            .unwrap_or(&post.author.username);
        let _ = writeln!(xml, "<dc:creator>{}</dc:creator>", xml_escape(author));
        if let Some(category) = &post.category {
            let _ = writeln!(xml, "<category>{}</category>", xml_escape(&category.name));
        }
        if let Some(published_at) = post.published_at {
            let _ = writeln!(xml, "<pubDate>{}</pubDate>", published_at.to_rfc2822());
        }
        xml.push_str("</item>\n");
    }

    xml.push_str("</channel>\n</rss>\n");
    xml
}

/// XML sitemap: home, about, categories, then posts
pub fn render_sitemap(
    base_url: &str,
    posts: &[SitemapEntry],
    category_slugs: &[String],
    has_about: bool,
) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

    let _ = writeln!(xml, "<url><loc>{}/</loc></url>", xml_escape(base_url));
    if has_about {
        let _ = writeln!(xml, "<url><loc>{}/about</loc></url>", xml_escape(base_url));
    }
    for slug in category_slugs {
        let _ = writeln!(
            xml,
            "<url><loc>{}</loc></url>",
            xml_escape(&format!("{}/categories/{}", base_url, slug))
        );
    }
    for entry in posts {
        let _ = writeln!(
            xml,
            "<url><loc>{}</loc><lastmod>{}</lastmod></url>",
            xml_escape(&format!("{}/posts/{}", base_url, entry.slug)),
            entry.updated_at.format("%Y-%m-%d")
        );
    }

    xml.push_str("</urlset>\n");
    xml
}

pub struct FeedService {
    pool: PgPool,
}

impl FeedService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn rss(&self, site_name: &str, base_url: &str) -> Result<String> {
        let page = PostService::new(self.pool.clone())
            .list_posts(&PostFilter::published(), RSS_ITEMS, 0)
            .await?;
        Ok(render_rss(site_name, base_url, &page.items))
    }

    pub async fn sitemap(&self, base_url: &str) -> Result<String> {
        let entries = posts::sitemap_entries(&self.pool, SITEMAP_POSTS).await?;
        let category_slugs = categories::all_slugs(&self.pool).await?;
        let has_about = about::get(&self.pool).await?.is_some();
        Ok(render_sitemap(base_url, &entries, &category_slugs, has_about))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthorSummary;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn summary(title: &str, slug: &str) -> PostSummary {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        PostSummary {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            excerpt: "An <intro> & more".to_string(),
            cover_image_url: None,
            status: "published".to_string(),
            featured: false,
            reading_time_minutes: 1,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            author: AuthorSummary {
                id: Uuid::new_v4(),
                username: "alice".to_string(),
                display_name: None,
                avatar_url: None,
            },
            category: None,
            tags: vec![],
            published_at: Some(at),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(xml_escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(xml_escape("bell\u{7}"), "bell");
    }

    #[test]
    fn rss_contains_items() {
        let xml = render_rss(
            "Inkwell",
            "https://blog.example.com",
            &[summary("Hello & Goodbye", "hello-goodbye")],
        );
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<title>Hello &amp; Goodbye</title>"));
        assert!(xml.contains("<link>https://blog.example.com/posts/hello-goodbye</link>"));
        assert!(xml.contains("<description>An &lt;intro&gt; &amp; more</description>"));
        assert!(xml.contains("<pubDate>Wed, "));
        assert!(xml.contains("May 2024 12:00:00 +0000</pubDate>"));
    }

    #[test]
    fn sitemap_lists_everything() {
        let entries = vec![SitemapEntry {
            slug: "first-post".to_string(),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap(),
        }];
        let xml = render_sitemap("https://blog.example.com", &entries, &["rust".to_string()], true);
        assert!(xml.contains("<loc>https://blog.example.com/about</loc>"));
        assert!(xml.contains("<loc>https://blog.example.com/categories/rust</loc>"));
        assert!(xml.contains(
            "<loc>https://blog.example.com/posts/first-post</loc><lastmod>2024-05-02</lastmod>"
        ));

        let xml = render_sitemap("https://blog.example.com", &[], &[], false);
        assert!(!xml.contains("/about"));
    }
}
