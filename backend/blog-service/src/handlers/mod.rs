/// HTTP handlers and the route table
///
/// Handlers stay thin: parse and validate the request, build the service
/// they need from [`AppState`], and map the result to a status code.
pub mod about;
pub mod admin;
pub mod analytics;
pub mod auth;
pub mod comments;
pub mod engagement;
pub mod feeds;
pub mod health;
pub mod posts;
pub mod taxonomy;
pub mod uploads;
pub mod users;

use crate::middleware::SessionMiddleware;
use crate::services::auth::SessionMeta;
use crate::AppState;
use actix_middleware::{client_ip, render_metrics, RateLimitConfig, RateLimitMiddleware};
use actix_web::{web, HttpRequest, HttpResponse};

const MAX_USER_AGENT_LEN: usize = 512;

/// IP address and User-Agent recorded with a new session
pub(crate) fn client_meta(req: &HttpRequest, trust_proxy_headers: bool) -> SessionMeta {
    SessionMeta {
        ip_address: client_ip(req.peer_addr(), &req.connection_info(), trust_proxy_headers),
        user_agent: user_agent(req).map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect()),
    }
}

pub(crate) fn user_agent(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
}

async fn metrics_endpoint() -> HttpResponse {
    render_metrics()
}

/// Register every route. Session resolution wraps the whole `/api/v1` scope;
/// the auth endpoints are additionally rate limited per client IP.
pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    let auth_limit = RateLimitConfig {
        max_requests: state.config.redis.auth_rate_limit_max,
        window_seconds: state.config.redis.auth_rate_limit_window_secs,
        redis_timeout_ms: state.config.redis.timeout_ms,
        trust_proxy_headers: state.config.app.trust_proxy_headers,
    };

    cfg.route("/metrics", web::get().to(metrics_endpoint))
        .route("/feed.xml", web::get().to(feeds::rss))
        .route("/sitemap.xml", web::get().to(feeds::sitemap))
        // Health check endpoints
        .route("/api/v1/health", web::get().to(health::health_summary))
        .route("/api/v1/health/ready", web::get().to(health::readiness_summary))
        .route("/api/v1/health/live", web::get().to(health::liveness_check))
        .service(
            web::scope("/api/v1")
                .wrap(SessionMiddleware::new(
                    state.db.clone(),
                    &state.config.session.cookie_name,
                ))
                .service(
                    web::scope("/auth")
                        .wrap(RateLimitMiddleware::new(
                            "auth",
                            auth_limit,
                            state.rate_limiter.clone(),
                        ))
                        .route("/signup", web::post().to(auth::signup))
                        .route("/signup/verify", web::post().to(auth::verify_signup))
                        .route("/signin", web::post().to(auth::signin))
                        .route("/signin/verify", web::post().to(auth::verify_signin))
                        .route("/password/forgot", web::post().to(auth::forgot_password))
                        .route("/password/reset", web::post().to(auth::reset_password))
                        .route("/otp/resend", web::post().to(auth::resend_code))
                        .route("/signout", web::post().to(auth::signout))
                        .route("/me", web::get().to(auth::me))
                        .route("/sessions", web::get().to(auth::list_sessions))
                        .route("/sessions/{session_id}", web::delete().to(auth::revoke_session)),
                )
                .service(
                    web::scope("/posts")
                        .service(
                            web::resource("")
                                .route(web::get().to(posts::list_posts))
                                .route(web::post().to(posts::create_post)),
                        )
                        .service(
                            web::resource("/{post}")
                                .route(web::get().to(posts::get_post))
                                .route(web::patch().to(posts::update_post))
                                .route(web::delete().to(posts::delete_post)),
                        )
                        .route("/{post_id}/publish", web::post().to(posts::publish_post))
                        .route("/{post_id}/unpublish", web::post().to(posts::unpublish_post))
                        .service(
                            web::resource("/{post_id}/like")
                                .route(web::post().to(engagement::like_post))
                                .route(web::delete().to(engagement::unlike_post)),
                        )
                        .service(
                            web::resource("/{post_id}/bookmark")
                                .route(web::post().to(engagement::bookmark_post))
                                .route(web::delete().to(engagement::unbookmark_post)),
                        )
                        .service(
                            web::resource("/{post_id}/comments")
                                .route(web::get().to(comments::list_comments))
                                .route(web::post().to(comments::create_comment)),
                        ),
                )
                .service(
                    web::resource("/comments/{comment_id}")
                        .route(web::patch().to(comments::update_comment))
                        .route(web::delete().to(comments::delete_comment)),
                )
                .service(
                    web::scope("/categories")
                        .service(
                            web::resource("")
                                .route(web::get().to(taxonomy::list_categories))
                                .route(web::post().to(taxonomy::create_category)),
                        )
                        .service(
                            web::resource("/{category}")
                                .route(web::get().to(taxonomy::get_category))
                                .route(web::patch().to(taxonomy::update_category))
                                .route(web::delete().to(taxonomy::delete_category)),
                        ),
                )
                .route("/tags", web::get().to(taxonomy::list_tags))
                .route("/tags/{tag_id}", web::delete().to(taxonomy::delete_tag))
                .service(
                    web::scope("/users")
                        .service(web::resource("/me").route(web::patch().to(users::update_profile)))
                        .route("/me/password", web::put().to(users::change_password))
                        .route("/me/posts", web::get().to(users::my_posts))
                        .route("/me/bookmarks", web::get().to(users::my_bookmarks))
                        .route("/me/likes", web::get().to(users::my_likes))
                        .route("/{username}", web::get().to(users::get_profile))
                        .route("/{username}/posts", web::get().to(users::list_user_posts)),
                )
                .route("/uploads/images", web::post().to(uploads::upload_image))
                .route("/analytics/page-views", web::post().to(analytics::track_page_view))
                .service(
                    web::resource("/about")
                        .route(web::get().to(about::get_about))
                        .route(web::put().to(about::upsert_about)),
                )
                .service(
                    web::scope("/admin")
                        .route("/dashboard", web::get().to(admin::dashboard))
                        .route("/analytics", web::get().to(analytics::analytics_summary))
                        .route("/users", web::get().to(admin::list_users))
                        .route("/users/{user_id}/role", web::patch().to(admin::set_user_role))
                        .route("/users/{user_id}", web::delete().to(admin::delete_user))
                        .route("/posts", web::get().to(admin::list_all_posts))
                        .route("/posts/{post_id}/featured", web::patch().to(admin::set_featured))
                        .route("/comments", web::get().to(admin::list_recent_comments)),
                ),
        );
}
