/// URL slug helpers

/// Lower-case ASCII alphanumerics; every other run of characters becomes a
/// single `-`; leading and trailing dashes are trimmed. May return an empty
/// string, callers pick their own fallback.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// [`slugify`] capped at `max_len` bytes, falling back to `fallback` when empty
pub fn slugify_or(input: &str, fallback: &str, max_len: usize) -> String {
    let mut slug = slugify(input);
    if slug.len() > max_len {
        slug.truncate(max_len);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// First free slug among `base`, `base-1`, `base-2`, … given the slugs
/// already taken (as returned by a `base` / `base-%` prefix query).
pub fn next_available(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|s| s == base) {
        return base.to_string();
    }

    let prefix = format!("{}-", base);
    let mut used: Vec<u64> = taken
        .iter()
        .filter_map(|s| s.strip_prefix(&prefix))
        .filter(|suffix| !suffix.starts_with('0'))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .collect();
    used.sort_unstable();
    used.dedup();

    let mut candidate = 1;
    for n in used {
        if n == candidate {
            candidate += 1;
        } else if n > candidate {
            break;
        }
    }

    format!("{}-{}", base, candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust 2024 -- what's new?  "), "rust-2024-what-s-new");
        assert_eq!(slugify("Crème brûlée"), "cr-me-br-l-e");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_or_fallback_and_cap() {
        assert_eq!(slugify_or("日本語", "post", 80), "post");
        assert_eq!(slugify_or("abc def ghi", "post", 4), "abc");
    }

    #[test]
    fn duplicate_slug_increments_suffix() {
        assert_eq!(next_available("hello-world", &[]), "hello-world");

        let taken = vec!["hello-world".to_string()];
        assert_eq!(next_available("hello-world", &taken), "hello-world-1");

        let taken = vec![
            "hello-world".to_string(),
            "hello-world-1".to_string(),
            "hello-world-2".to_string(),
        ];
        assert_eq!(next_available("hello-world", &taken), "hello-world-3");
    }

    #[test]
    fn smallest_free_suffix_is_reused() {
        let taken = vec![
            "hello-world".to_string(),
            "hello-world-2".to_string(),
            "hello-world-3".to_string(),
        ];
        assert_eq!(next_available("hello-world", &taken), "hello-world-1");
    }

    #[test]
    fn unrelated_prefix_matches_are_ignored() {
        let taken = vec![
            "hello-world".to_string(),
            "hello-world-tour".to_string(),
            "hello-world-01".to_string(),
        ];
        assert_eq!(next_available("hello-world", &taken), "hello-world-1");
    }
}
