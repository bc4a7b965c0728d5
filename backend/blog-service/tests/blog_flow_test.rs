//! Database-backed flows
//!
//! Skipped unless `TEST_DATABASE_URL` or `BLOG_TEST_CONTAINERS=1` is set.

mod common;

use actix_web::{http::StatusCode, test, web, App};
use actix_web::cookie::Cookie;
use blog_service::db::users;
use blog_service::models::{Actor, CreatePostRequest, PostStatus, UpdatePostRequest};
use blog_service::services::auth::{SessionMeta, SigninOutcome};
use blog_service::services::{
    CommentService, EngagementService, OtpPurpose, OtpService, PostService, TaxonomyService,
};
use blog_service::{handlers, AppError};
use common::{bearer, build_state, signed_in_user, test_db, unique};
use serial_test::serial;

fn draft(title: &str) -> CreatePostRequest {
    CreatePostRequest {
        title: title.to_string(),
        content: "Body text for the post".to_string(),
        excerpt: None,
        cover_image_url: None,
        category_id: None,
        tags: vec![],
        publish: false,
    }
}

fn published(title: &str) -> CreatePostRequest {
    CreatePostRequest {
        publish: true,
        ..draft(title)
    }
}

#[actix_web::test]
#[serial]
async fn duplicate_titles_get_numbered_slugs() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (author, _) = signed_in_user(&state, false).await;
    let posts = PostService::new(state.db.clone());

    let title = unique("Same Title ");
    let base = title.to_lowercase().replace(' ', "-");

    let mut slugs = Vec::new();
    for _ in 0..3 {
        let post = posts.create_post(author.id, &draft(&title)).await.unwrap();
        slugs.push(post.post.slug);
    }

    assert_eq!(
        slugs,
        vec![base.clone(), format!("{}-1", base), format!("{}-2", base)]
    );
}

#[actix_web::test]
#[serial]
async fn replies_flatten_and_cascade_with_parent() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (author, _) = signed_in_user(&state, false).await;
    let (reader, _) = signed_in_user(&state, false).await;

    let post = PostService::new(state.db.clone())
        .create_post(author.id, &published(&unique("Thread ")))
        .await
        .unwrap();
    let post_id = post.post.id;
    let comments = CommentService::new(state.db.clone());

    let top = comments
        .create_comment(post_id, reader.id, "First!", None)
        .await
        .unwrap();
    let reply = comments
        .create_comment(post_id, author.id, "Thanks", Some(top.id))
        .await
        .unwrap();
    let nested = comments
        .create_comment(post_id, reader.id, "You're welcome", Some(reply.id))
        .await
        .unwrap();
    assert_eq!(reply.parent_id, Some(top.id));
    assert_eq!(nested.parent_id, Some(top.id));

    let threads = comments.list_comments(post_id, None).await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].replies.len(), 2);

    comments
        .delete_comment(
            top.id,
            Actor {
                user_id: reader.id,
                is_admin: false,
            },
        )
        .await
        .unwrap();
    let threads = comments.list_comments(post_id, None).await.unwrap();
    assert!(threads.is_empty());
}

#[actix_web::test]
#[serial]
async fn comments_on_drafts_are_rejected() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (author, _) = signed_in_user(&state, false).await;

    let post = PostService::new(state.db.clone())
        .create_post(author.id, &draft(&unique("Hidden ")))
        .await
        .unwrap();

    let err = CommentService::new(state.db.clone())
        .create_comment(post.post.id, author.id, "note to self", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[actix_web::test]
#[serial]
async fn liking_twice_counts_once() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (author, _) = signed_in_user(&state, false).await;
    let (reader, _) = signed_in_user(&state, false).await;

    let post = PostService::new(state.db.clone())
        .create_post(author.id, &published(&unique("Likeable ")))
        .await
        .unwrap();
    let engagement = EngagementService::new(state.db.clone());

    let first = engagement.like(post.post.id, reader.id).await.unwrap();
    let second = engagement.like(post.post.id, reader.id).await.unwrap();
    assert_eq!(first.like_count, 1);
    assert_eq!(second.like_count, 1);

    let after = engagement.unlike(post.post.id, reader.id).await.unwrap();
    assert!(!after.liked);
    assert_eq!(after.like_count, 0);

    let again = engagement.unlike(post.post.id, reader.id).await.unwrap();
    assert_eq!(again.like_count, 0);
}

#[actix_web::test]
#[serial]
async fn otp_codes_are_single_use_and_superseded() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let otp = OtpService::new(
        state.db.clone(),
        state.email.clone(),
        None,
        state.config.otp.clone(),
    );
    let email = format!("{}@example.com", unique("otp"));

    let old = otp.issue(&email, OtpPurpose::Signup).await.unwrap();
    let current = otp.issue(&email, OtpPurpose::Signup).await.unwrap();
    if old != current {
        let err = otp.verify(&email, OtpPurpose::Signup, &old).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    let attempts: i32 = sqlx::query_scalar(
        "SELECT attempts FROM otp_codes WHERE email = $1 AND consumed_at IS NULL",
    )
    .bind(&email)
    .fetch_one(&state.db)
    .await
    .unwrap();
    assert_eq!(attempts, if old != current { 1 } else { 0 });

    otp.verify(&email, OtpPurpose::Signup, &current).await.unwrap();
    let err = otp
        .verify(&email, OtpPurpose::Signup, &current)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // a code for one purpose never satisfies another
    let signin = otp.issue(&email, OtpPurpose::Signin).await.unwrap();
    let err = otp
        .verify(&email, OtpPurpose::PasswordReset, &signin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[actix_web::test]
#[serial]
async fn expired_otp_is_refused() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let otp = OtpService::new(
        state.db.clone(),
        state.email.clone(),
        None,
        state.config.otp.clone(),
    );
    let email = format!("{}@example.com", unique("late"));

    let code = otp.issue(&email, OtpPurpose::PasswordReset).await.unwrap();
    sqlx::query("UPDATE otp_codes SET expires_at = NOW() - INTERVAL '1 minute' WHERE email = $1")
        .bind(&email)
        .execute(&state.db)
        .await
        .unwrap();

    let err = otp
        .verify(&email, OtpPurpose::PasswordReset, &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[actix_web::test]
#[serial]
async fn signup_then_verify_sets_session_cookie() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure(cfg, &state)),
    )
    .await;

    let username = unique("writer");
    let email = format!("{}@example.com", username);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/auth/signup")
            .set_json(serde_json::json!({
                "email": email,
                "username": username,
                "password": "correct-horse-42"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // the emailed code is not observable; a reissue supersedes it
    let code = OtpService::new(
        state.db.clone(),
        state.email.clone(),
        None,
        state.config.otp.clone(),
    )
    .issue(&email, OtpPurpose::Signup)
    .await
    .unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/auth/signup/verify")
            .set_json(serde_json::json!({ "email": email, "code": code }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == state.config.session.cookie_name)
        .expect("session cookie");
    assert!(cookie.http_only().unwrap_or(false));
    let token = cookie.value().to_string();

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["username"], username.as_str());
    assert_eq!(body["user"]["email_verified"], true);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .cookie(actix_web::cookie::Cookie::new(
                state.config.session.cookie_name.clone(),
                token,
            ))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
#[serial]
async fn drafts_are_visible_only_to_their_author() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (author, author_token) = signed_in_user(&state, false).await;
    let (_, other_token) = signed_in_user(&state, false).await;

    let post = PostService::new(state.db.clone())
        .create_post(author.id, &draft(&unique("Draft ")))
        .await
        .unwrap();
    let uri = format!("/api/v1/posts/{}", post.post.slug);

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure(cfg, &state)),
    )
    .await;

    let anonymous = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);

    let other = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&other_token))
            .to_request(),
    )
    .await;
    assert_eq!(other.status(), StatusCode::NOT_FOUND);

    let own = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&author_token))
            .to_request(),
    )
    .await;
    assert_eq!(own.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(own).await;
    assert_eq!(body["status"], "draft");

    let marker = post.post.title.rsplit(' ').next().unwrap_or_default();
    let listing = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/posts?q={}", marker))
            .to_request(),
    )
    .await;
    assert_eq!(listing.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(listing).await;
    assert_eq!(body["total_count"], 0);
}

#[actix_web::test]
#[serial]
async fn admin_routes_require_admin_role() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (_, user_token) = signed_in_user(&state, false).await;
    let (_, admin_token) = signed_in_user(&state, true).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure(cfg, &state)),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/admin/dashboard")
            .insert_header(bearer(&user_token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/admin/dashboard")
            .insert_header(bearer(&admin_token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/admin/analytics?days=7")
            .insert_header(bearer(&admin_token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
#[serial]
async fn signout_revokes_the_session() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (_, token) = signed_in_user(&state, false).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure(cfg, &state)),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/auth/signout")
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn title_change_reslugs_drafts_only() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (author, _) = signed_in_user(&state, false).await;
    let actor = Actor {
        user_id: author.id,
        is_admin: false,
    };
    let posts = PostService::new(state.db.clone());

    let post = posts.create_post(author.id, &draft(&unique("First Title "))).await.unwrap();
    let id = post.post.id;

    let renamed = unique("Second Title ");
    let updated = posts
        .update_post(
            id,
            actor,
            &UpdatePostRequest {
                title: Some(renamed.clone()),
                ..UpdatePostRequest::default()
            },
        )
        .await
        .unwrap();
    let renamed_slug = renamed.to_lowercase().replace(' ', "-");
    assert_eq!(updated.post.slug, renamed_slug);

    let edited = posts
        .update_post(
            id,
            actor,
            &UpdatePostRequest {
                title: Some(renamed.clone()),
                content: Some("Rewritten body".to_string()),
                ..UpdatePostRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.post.slug, renamed_slug);
    assert_eq!(edited.content, "Rewritten body");

    posts.set_status(id, actor, PostStatus::Published).await.unwrap();
    let live = posts
        .update_post(
            id,
            actor,
            &UpdatePostRequest {
                title: Some(unique("Third Title ")),
                ..UpdatePostRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(live.post.slug, renamed_slug);
    assert!(live.post.title.starts_with("Third Title "));
}

#[actix_web::test]
#[serial]
async fn deleting_a_category_leaves_posts_uncategorized() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (author, _) = signed_in_user(&state, false).await;
    let taxonomy = TaxonomyService::new(state.db.clone());
    let posts = PostService::new(state.db.clone());

    let category = taxonomy
        .create_category(&unique("Category "), None)
        .await
        .unwrap();
    let post = posts
        .create_post(
            author.id,
            &CreatePostRequest {
                category_id: Some(category.id),
                ..published(&unique("Filed "))
            },
        )
        .await
        .unwrap();
    assert_eq!(
        post.post.category.as_ref().map(|c| c.slug.as_str()),
        Some(category.slug.as_str())
    );

    taxonomy.delete_category(category.id).await.unwrap();

    let post = posts.get_post(&post.post.slug, None).await.unwrap();
    assert!(post.post.category.is_none());
}

#[actix_web::test]
#[serial]
async fn tags_with_colliding_slugs_stay_distinct() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (author, _) = signed_in_user(&state, false).await;
    let posts = PostService::new(state.db.clone());

    let marker = unique("t");
    let plus = format!("{}++", marker);
    let sharp = format!("{}#", marker);
    let post = posts
        .create_post(
            author.id,
            &CreatePostRequest {
                tags: vec![plus.clone(), sharp.clone()],
                ..draft(&unique("Languages "))
            },
        )
        .await
        .unwrap();
    let tags = post.post.tags;
    let plus_tag = tags.iter().find(|t| t.name == plus).expect("C++ style tag");
    let sharp_tag = tags.iter().find(|t| t.name == sharp).expect("C# style tag");
    assert_ne!(plus_tag.id, sharp_tag.id);
    assert_eq!(plus_tag.slug, marker);
    assert_eq!(sharp_tag.slug, format!("{}-1", marker));

    let post = posts
        .create_post(
            author.id,
            &CreatePostRequest {
                tags: vec!["中文".to_string(), "日本語".to_string()],
                ..draft(&unique("Scripts "))
            },
        )
        .await
        .unwrap();
    let tags = post.post.tags;
    assert_eq!(tags.len(), 2);
    let chinese = tags.iter().find(|t| t.name == "中文").expect("chinese tag");
    let japanese = tags.iter().find(|t| t.name == "日本語").expect("japanese tag");
    assert_ne!(chinese.id, japanese.id);
    assert_ne!(chinese.slug, japanese.slug);

    let post = posts
        .create_post(
            author.id,
            &CreatePostRequest {
                tags: vec![plus.to_uppercase()],
                ..draft(&unique("Shouting "))
            },
        )
        .await
        .unwrap();
    assert_eq!(post.post.tags.len(), 1);
    assert_eq!(post.post.tags[0].id, plus_tag.id);
    assert_eq!(post.post.tags[0].name, plus);
}

#[actix_web::test]
#[serial]
async fn usernames_are_unique_regardless_of_case() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());

    let name = unique("Writer");
    let hash = crypto_core::hash_password("password123").unwrap();
    users::create_user(&state.db, &format!("{}@example.com", unique("a")), &name, &hash, None)
        .await
        .unwrap();

    let err = users::create_user(
        &state.db,
        &format!("{}@example.com", unique("b")),
        &name.to_lowercase(),
        &hash,
        None,
    )
    .await
    .unwrap_err();
    match AppError::from(err) {
        AppError::Conflict(message) => assert_eq!(message, "Username already taken"),
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[actix_web::test]
#[serial]
async fn page_views_skip_bots_and_issue_the_visitor_cookie_once() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (author, _) = signed_in_user(&state, false).await;
    let posts = PostService::new(state.db.clone());
    let post = posts
        .create_post(author.id, &published(&unique("Popular ")))
        .await
        .unwrap();
    let slug = post.post.slug.clone();
    let cookie_name = state.config.analytics.visitor_cookie_name.clone();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure(cfg, &state)),
    )
    .await;
    let view = || {
        test::TestRequest::post()
            .uri("/api/v1/analytics/page-views")
            .set_json(serde_json::json!({ "path": format!("/posts/{}", slug), "post_slug": slug }))
    };
    const BROWSER: &str =
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

    let resp = test::call_service(
        &app,
        view()
            .insert_header(("User-Agent", "Googlebot/2.1 (+http://www.google.com/bot.html)"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.response().cookies().all(|c| c.name() != cookie_name));
    let count = posts.get_post(&slug, None).await.unwrap().post.view_count;
    assert_eq!(count, 0);

    let resp = test::call_service(&app, view().insert_header(("User-Agent", BROWSER)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let visitor = resp
        .response()
        .cookies()
        .find(|c| c.name() == cookie_name)
        .map(|c| c.value().to_string())
        .expect("visitor cookie");

    let resp = test::call_service(
        &app,
        view()
            .insert_header(("User-Agent", BROWSER))
            .cookie(Cookie::new(cookie_name.clone(), visitor))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.response().cookies().all(|c| c.name() != cookie_name));

    let count = posts.get_post(&slug, None).await.unwrap().post.view_count;
    assert_eq!(count, 2);
}

#[actix_web::test]
#[serial]
async fn password_reset_signs_out_every_session() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (user, token) = signed_in_user(&state, false).await;

    let code = OtpService::new(
        state.db.clone(),
        state.email.clone(),
        None,
        state.config.otp.clone(),
    )
    .issue(&user.email, OtpPurpose::PasswordReset)
    .await
    .unwrap();
    let auth = state.auth_service();
    auth.reset_password(&user.email, &code, "fresh-password-42")
        .await
        .unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure(cfg, &state)),
    )
    .await;
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let err = auth
        .signin(&user.email, "password123", SessionMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    let outcome = auth
        .signin(&user.email, "fresh-password-42", SessionMeta::default())
        .await
        .unwrap();
    assert!(matches!(outcome, SigninOutcome::Authenticated(_)));
}

#[actix_web::test]
#[serial]
async fn unknown_email_signin_matches_wrong_password() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (user, _) = signed_in_user(&state, false).await;
    let auth = state.auth_service();

    let unknown = auth
        .signin(
            &format!("{}@example.com", unique("nobody")),
            "password123",
            SessionMeta::default(),
        )
        .await
        .unwrap_err();
    let wrong = auth
        .signin(&user.email, "not-the-password1", SessionMeta::default())
        .await
        .unwrap_err();

    assert_eq!(unknown.to_string(), wrong.to_string());
    assert!(matches!(unknown, AppError::Unauthorized(_)));
}

#[actix_web::test]
#[serial]
async fn otp_locks_after_too_many_wrong_codes() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let otp = OtpService::new(
        state.db.clone(),
        state.email.clone(),
        None,
        state.config.otp.clone(),
    );
    let email = format!("{}@example.com", unique("guess"));

    let code = otp.issue(&email, OtpPurpose::Signin).await.unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..state.config.otp.max_attempts {
        match otp.verify(&email, OtpPurpose::Signin, wrong).await {
            Err(AppError::BadRequest(message)) => assert_eq!(message, "Invalid verification code"),
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    match otp.verify(&email, OtpPurpose::Signin, &code).await {
        Err(AppError::BadRequest(message)) => assert!(message.starts_with("Too many attempts")),
        other => panic!("expected lockout, got {:?}", other),
    }
}

#[actix_web::test]
#[serial]
async fn profile_rejects_display_name_longer_than_the_column() {
    let Some(db) = test_db().await else { return };
    let state = build_state(db.pool.clone());
    let (_, token) = signed_in_user(&state, false).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure(cfg, &state)),
    )
    .await;
    let resp = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri("/api/v1/users/me")
            .insert_header(bearer(&token))
            .set_json(serde_json::json!({ "display_name": "x".repeat(65) }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
