/// Authentication flows: signup, signin, password reset and sessions
use crate::config::{OtpConfig, SessionConfig};
use crate::db::{sessions, users};
use crate::error::{AppError, Result};
use crate::models::{SessionView, User};
use crate::services::email::mask_email;
use crate::services::otp::{OtpPurpose, OtpService};
use crate::validators::validate_password;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

/// Bytes of entropy in a session token
const SESSION_TOKEN_BYTES: usize = 32;

/// Verified against when the email is unknown so both signin failures cost one argon2 run
static DUMMY_PASSWORD_HASH: Lazy<Option<String>> =
    Lazy::new(|| crypto_core::hash_password("inkwell-dummy-password").ok());

/// Client details recorded with a new session
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A freshly opened session; `token` goes to the client exactly once
#[derive(Debug)]
pub struct OpenedSession {
    pub user: User,
    pub token: String,
}

#[derive(Debug)]
pub enum SigninOutcome {
    OtpRequired { expires_in: i64 },
    Authenticated(OpenedSession),
}

pub struct SignupInput<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub display_name: Option<&'a str>,
}

#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    otp: OtpService,
    session: SessionConfig,
    signin_otp_required: bool,
}

impl AuthService {
    pub fn new(db: PgPool, otp: OtpService, session: SessionConfig, otp_config: &OtpConfig) -> Self {
        Self {
            db,
            otp,
            session,
            signin_otp_required: otp_config.signin_required,
        }
    }

    /// Register (or re-register an unverified) account and email a signup code.
    ///
    /// Returns the code lifetime in seconds.
    pub async fn signup(&self, input: SignupInput<'_>) -> Result<i64> {
        validate_password(input.password)?;

        let existing = users::find_by_email(&self.db, input.email).await?;
        if matches!(&existing, Some(user) if user.email_verified) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let except = existing.as_ref().map(|u| u.id);
        if users::username_taken(&self.db, input.username, except).await? {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = crypto_core::hash_password(input.password)?;
        let user = match existing {
            Some(user) => {
                users::refresh_unverified(
                    &self.db,
                    user.id,
                    input.username,
                    &password_hash,
                    input.display_name,
                )
                .await?
            }
            None => {
                users::create_user(
                    &self.db,
                    input.email,
                    input.username,
                    &password_hash,
                    input.display_name,
                )
                .await?
            }
        };

        self.otp.issue(input.email, OtpPurpose::Signup).await?;
        info!(user_id = %user.id, email = %mask_email(input.email), "Signup pending verification");
        Ok(self.otp.ttl_secs())
    }

    pub async fn verify_signup(&self, email: &str, code: &str, meta: SessionMeta) -> Result<OpenedSession> {
        self.otp.verify(email, OtpPurpose::Signup, code).await?;

        let user = users::find_by_email(&self.db, email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let user = users::mark_email_verified(&self.db, user.id).await?;

        info!(user_id = %user.id, "Email verified");
        self.open_session(user, meta).await
    }

    pub async fn signin(&self, email: &str, password: &str, meta: SessionMeta) -> Result<SigninOutcome> {
        let Some(user) = users::find_by_email(&self.db, email).await? else {
            if let Some(hash) = DUMMY_PASSWORD_HASH.as_deref() {
                let _ = crypto_core::verify_password(password, hash);
            }
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        };

        if !crypto_core::verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Signin with wrong password");
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        }

        if !user.email_verified {
            return Err(AppError::Forbidden("Email address not verified".to_string()));
        }

        if self.signin_otp_required {
            self.otp.issue(email, OtpPurpose::Signin).await?;
            return Ok(SigninOutcome::OtpRequired {
                expires_in: self.otp.ttl_secs(),
            });
        }

        Ok(SigninOutcome::Authenticated(self.open_session(user, meta).await?))
    }

    pub async fn verify_signin(&self, email: &str, code: &str, meta: SessionMeta) -> Result<OpenedSession> {
        self.otp.verify(email, OtpPurpose::Signin, code).await?;

        let user = users::find_by_email(&self.db, email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        if !user.email_verified {
            return Err(AppError::Forbidden("Email address not verified".to_string()));
        }

        self.open_session(user, meta).await
    }

    /// Never reveals whether the account exists; failures are only logged
    pub async fn forgot_password(&self, email: &str) {
        match users::find_by_email(&self.db, email).await {
            Ok(Some(_)) => {
                if let Err(e) = self.otp.issue(email, OtpPurpose::PasswordReset).await {
                    warn!(email = %mask_email(email), error = %e, "Failed to issue password reset code");
                }
            }
            Ok(None) => {
                info!(email = %mask_email(email), "Password reset requested for unknown email");
            }
            Err(e) => {
                warn!(email = %mask_email(email), error = %e, "Password reset lookup failed");
            }
        }
    }

    /// Replace the password and sign the user out everywhere
    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<()> {
        validate_password(new_password)?;
        self.otp.verify(email, OtpPurpose::PasswordReset, code).await?;

        let user = users::find_by_email(&self.db, email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let password_hash = crypto_core::hash_password(new_password)?;
        users::update_password(&self.db, user.id, &password_hash).await?;
        let revoked = sessions::revoke_all(&self.db, user.id, None).await?;

        info!(user_id = %user.id, revoked_sessions = revoked, "Password reset");
        Ok(())
    }

    /// Reissue a code for a flow that is still waiting on one
    pub async fn resend_code(&self, email: &str, purpose: OtpPurpose) -> Result<()> {
        let pending = self.otp.has_pending(email, purpose).await?;

        if purpose == OtpPurpose::PasswordReset {
            if pending {
                self.otp.issue(email, purpose).await?;
            }
            return Ok(());
        }

        if !pending {
            return Err(AppError::NotFound("No pending verification".to_string()));
        }
        self.otp.issue(email, purpose).await?;
        Ok(())
    }

    /// Check the current password, store the new one and revoke all other sessions
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_session: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = users::find_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !crypto_core::verify_password(current_password, &user.password_hash)? {
            return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
        }
        validate_password(new_password)?;

        let password_hash = crypto_core::hash_password(new_password)?;
        users::update_password(&self.db, user_id, &password_hash).await?;
        let revoked = sessions::revoke_all(&self.db, user_id, Some(current_session)).await?;

        info!(user_id = %user_id, revoked_sessions = revoked, "Password changed");
        Ok(())
    }

    pub async fn open_session(&self, user: User, meta: SessionMeta) -> Result<OpenedSession> {
        let token = crypto_core::generate_token(SESSION_TOKEN_BYTES);
        let expires_at = Utc::now() + Duration::days(self.session.ttl_days);

        let session_id = sessions::create_session(
            &self.db,
            user.id,
            &crypto_core::sha256_hex(&token),
            meta.ip_address.as_deref(),
            meta.user_agent.as_deref(),
            expires_at,
        )
        .await?;

        info!(user_id = %user.id, session_id = %session_id, "Session opened");
        Ok(OpenedSession { user, token })
    }

    pub async fn signout(&self, session_id: Uuid, user_id: Uuid) -> Result<()> {
        sessions::revoke(&self.db, session_id, user_id).await?;
        info!(user_id = %user_id, session_id = %session_id, "Signed out");
        Ok(())
    }

    pub async fn list_sessions(&self, user_id: Uuid, current_session: Uuid) -> Result<Vec<SessionView>> {
        Ok(sessions::list_active(&self.db, user_id)
            .await?
            .into_iter()
            .map(|s| SessionView::from_session(s, current_session))
            .collect())
    }

    /// Revoke one of the caller's own sessions
    pub async fn revoke_session(&self, user_id: Uuid, session_id: Uuid) -> Result<()> {
        if !sessions::revoke(&self.db, session_id, user_id).await? {
            return Err(AppError::NotFound("Session not found".to_string()));
        }
        info!(user_id = %user_id, session_id = %session_id, "Session revoked");
        Ok(())
    }
}
