/// Auth handlers - signup/signin with emailed codes, password reset, sessions
use crate::error::Result;
use crate::handlers::client_meta;
use crate::middleware::{expired_session_cookie, session_cookie, AuthUser};
use crate::models::UserResponse;
use crate::services::auth::{OpenedSession, SigninOutcome, SignupInput};
use crate::services::{OtpPurpose, UserService};
use crate::validators::normalize_email;
use crate::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(custom(function = "crate::validators::validate_username_shape"))]
    pub username: String,
    pub password: String,
    #[validate(length(max = 64))]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "crate::validators::validate_otp_code"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SigninRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "crate::validators::validate_otp_code"))]
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResendCodeRequest {
    #[validate(email)]
    pub email: String,
    pub purpose: OtpPurpose,
}

#[derive(Debug, Serialize)]
pub struct CodeSentResponse {
    pub message: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    /// Same value as the session cookie, for clients that send `Authorization: Bearer`
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct OtpRequiredResponse {
    pub otp_required: bool,
    pub expires_in: i64,
}

fn session_response(state: &AppState, opened: OpenedSession) -> HttpResponse {
    let cookie = session_cookie(&state.config.session, opened.token.clone());
    HttpResponse::Ok().cookie(cookie).json(AuthResponse {
        user: opened.user.into(),
        token: opened.token,
    })
}

/// POST /api/v1/auth/signup
pub async fn signup(state: web::Data<AppState>, req: web::Json<SignupRequest>) -> Result<HttpResponse> {
    req.validate()?;
    let email = normalize_email(&req.email);

    let expires_in = state
        .auth_service()
        .signup(SignupInput {
            email: &email,
            username: req.username.trim(),
            password: &req.password,
            display_name: req.display_name.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        })
        .await?;

    Ok(HttpResponse::Created().json(CodeSentResponse {
        message: "Verification code sent".to_string(),
        expires_in,
    }))
}

/// POST /api/v1/auth/signup/verify
pub async fn verify_signup(
    http: HttpRequest,
    state: web::Data<AppState>,
    req: web::Json<VerifyCodeRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let meta = client_meta(&http, state.config.app.trust_proxy_headers);
    let opened = state
        .auth_service()
        .verify_signup(&normalize_email(&req.email), req.code.trim(), meta)
        .await?;
    Ok(session_response(&state, opened))
}

/// POST /api/v1/auth/signin
///
/// 202 with `otp_required` when a second step is needed, otherwise 200 with a session.
pub async fn signin(
    http: HttpRequest,
    state: web::Data<AppState>,
    req: web::Json<SigninRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let meta = client_meta(&http, state.config.app.trust_proxy_headers);
    let outcome = state
        .auth_service()
        .signin(&normalize_email(&req.email), &req.password, meta)
        .await?;

    Ok(match outcome {
        SigninOutcome::OtpRequired { expires_in } => HttpResponse::Accepted().json(OtpRequiredResponse {
            otp_required: true,
            expires_in,
        }),
        SigninOutcome::Authenticated(opened) => session_response(&state, opened),
    })
}

/// POST /api/v1/auth/signin/verify
pub async fn verify_signin(
    http: HttpRequest,
    state: web::Data<AppState>,
    req: web::Json<VerifyCodeRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let meta = client_meta(&http, state.config.app.trust_proxy_headers);
    let opened = state
        .auth_service()
        .verify_signin(&normalize_email(&req.email), req.code.trim(), meta)
        .await?;
    Ok(session_response(&state, opened))
}

/// POST /api/v1/auth/password/forgot
pub async fn forgot_password(
    state: web::Data<AppState>,
    req: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    state
        .auth_service()
        .forgot_password(&normalize_email(&req.email))
        .await;

    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "message": "If the account exists, a reset code has been sent"
    })))
}

/// POST /api/v1/auth/password/reset
pub async fn reset_password(
    state: web::Data<AppState>,
    req: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    state
        .auth_service()
        .reset_password(&normalize_email(&req.email), req.code.trim(), &req.new_password)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/v1/auth/otp/resend
pub async fn resend_code(
    state: web::Data<AppState>,
    req: web::Json<ResendCodeRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    state
        .auth_service()
        .resend_code(&normalize_email(&req.email), req.purpose)
        .await?;

    Ok(HttpResponse::Accepted().json(CodeSentResponse {
        message: "Verification code sent".to_string(),
        expires_in: state.config.otp.ttl_secs,
    }))
}

/// POST /api/v1/auth/signout
pub async fn signout(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    state
        .auth_service()
        .signout(user.session_id, user.user_id)
        .await?;

    Ok(HttpResponse::NoContent()
        .cookie(expired_session_cookie(&state.config.session))
        .finish())
}

/// GET /api/v1/auth/me
pub async fn me(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let me = UserService::new(state.db.clone()).me(user.user_id).await?;
    Ok(HttpResponse::Ok().json(me))
}

/// GET /api/v1/auth/sessions
pub async fn list_sessions(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let sessions = state
        .auth_service()
        .list_sessions(user.user_id, user.session_id)
        .await?;
    Ok(HttpResponse::Ok().json(sessions))
}

/// DELETE /api/v1/auth/sessions/{session_id}
pub async fn revoke_session(
    state: web::Data<AppState>,
    user: AuthUser,
    session_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let session_id = session_id.into_inner();
    state
        .auth_service()
        .revoke_session(user.user_id, session_id)
        .await?;

    let mut response = HttpResponse::NoContent();
    if session_id == user.session_id {
        response.cookie(expired_session_cookie(&state.config.session));
    }
    Ok(response.finish())
}
