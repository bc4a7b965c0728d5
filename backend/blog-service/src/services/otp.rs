/// One-time code issue and verification
///
/// Codes are six digits from a CSPRNG. Only their SHA-256 digest is stored,
/// and issuing a code supersedes any earlier unconsumed code for the same
/// `(email, purpose)`.
use crate::config::OtpConfig;
use crate::db::otp_codes::{self, OtpRecord};
use crate::error::{AppError, Result};
use crate::metrics::{OTP_ISSUED_TOTAL, OTP_VERIFICATIONS_TOTAL};
use crate::services::email::{mask_email, EmailService};
use actix_middleware::RateLimiter;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

pub const OTP_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Signup,
    Signin,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Signup => "signup",
            OtpPurpose::Signin => "signin",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }
}

/// Result of comparing a submitted code against the pending record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Expired,
    TooManyAttempts,
    Mismatch,
}

impl OtpCheck {
    fn outcome(&self) -> &'static str {
        match self {
            OtpCheck::Valid => "valid",
            OtpCheck::Expired => "expired",
            OtpCheck::TooManyAttempts => "too_many_attempts",
            OtpCheck::Mismatch => "invalid",
        }
    }
}

/// Expiry is checked before the attempt budget, which is checked before the digest
pub fn evaluate(
    record: &OtpRecord,
    code_hash: &str,
    now: DateTime<Utc>,
    max_attempts: i32,
) -> OtpCheck {
    if record.expires_at <= now {
        OtpCheck::Expired
    } else if record.attempts >= max_attempts {
        OtpCheck::TooManyAttempts
    } else if record.code_hash == code_hash {
        OtpCheck::Valid
    } else {
        OtpCheck::Mismatch
    }
}

#[derive(Clone)]
pub struct OtpService {
    db: PgPool,
    email: EmailService,
    limiter: Option<Arc<RateLimiter>>,
    config: OtpConfig,
}

impl OtpService {
    pub fn new(
        db: PgPool,
        email: EmailService,
        limiter: Option<Arc<RateLimiter>>,
        config: OtpConfig,
    ) -> Self {
        Self {
            db,
            email,
            limiter,
            config,
        }
    }

    /// Seconds a freshly issued code stays valid
    pub fn ttl_secs(&self) -> i64 {
        self.config.ttl_secs
    }

    /// Generate, store and email a code. Returns the plaintext code.
    pub async fn issue(&self, email: &str, purpose: OtpPurpose) -> Result<String> {
        if let Some(limiter) = &self.limiter {
            let key = format!("otp:{}", email);
            if limiter
                .hit_or_allow(&key, self.config.max_per_hour, 3600)
                .await
            {
                warn!(email = %mask_email(email), purpose = purpose.as_str(), "OTP issue rate limited");
                return Err(AppError::RateLimited(
                    "Too many codes requested, try again later".to_string(),
                ));
            }
        }

        let code = crypto_core::generate_numeric_code(OTP_DIGITS);
        let expires_at = Utc::now() + Duration::seconds(self.config.ttl_secs);
        otp_codes::replace_code(
            &self.db,
            email,
            purpose.as_str(),
            &crypto_core::sha256_hex(&code),
            expires_at,
        )
        .await?;

        let ttl_minutes = (self.config.ttl_secs + 59) / 60;
        self.email
            .send_otp_email(email, &code, purpose, ttl_minutes)
            .await?;

        OTP_ISSUED_TOTAL.with_label_values(&[purpose.as_str()]).inc();
        info!(email = %mask_email(email), purpose = purpose.as_str(), "OTP issued");
        Ok(code)
    }

    /// Check `code` and consume it on success.
    ///
    /// A wrong code is counted against the record even though the request fails.
    pub async fn verify(&self, email: &str, purpose: OtpPurpose, code: &str) -> Result<()> {
        let mut tx = self.db.begin().await?;

        let record = match otp_codes::find_pending_for_update(&mut *tx, email, purpose.as_str()).await? {
            Some(record) => record,
            None => {
                OTP_VERIFICATIONS_TOTAL
                    .with_label_values(&[purpose.as_str(), "not_found"])
                    .inc();
                return Err(AppError::NotFound("Verification code not found".to_string()));
            }
        };

        let check = evaluate(
            &record,
            &crypto_core::sha256_hex(code.trim()),
            Utc::now(),
            self.config.max_attempts,
        );
        OTP_VERIFICATIONS_TOTAL
            .with_label_values(&[purpose.as_str(), check.outcome()])
            .inc();

        match check {
            OtpCheck::Valid => {
                otp_codes::consume(&mut *tx, record.id).await?;
                tx.commit().await?;
                Ok(())
            }
            OtpCheck::Expired => Err(AppError::BadRequest(
                "Verification code expired".to_string(),
            )),
            OtpCheck::TooManyAttempts => Err(AppError::BadRequest(
                "Too many attempts, request a new code".to_string(),
            )),
            OtpCheck::Mismatch => {
                otp_codes::increment_attempts(&mut *tx, record.id).await?;
                tx.commit().await?;
                warn!(
                    email = %mask_email(email),
                    purpose = purpose.as_str(),
                    attempts = record.attempts + 1,
                    "OTP mismatch"
                );
                Err(AppError::BadRequest("Invalid verification code".to_string()))
            }
        }
    }

    /// Whether an unconsumed code exists for the flow
    pub async fn has_pending(&self, email: &str, purpose: OtpPurpose) -> Result<bool> {
        Ok(otp_codes::has_pending(&self.db, email, purpose.as_str()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record(code: &str, attempts: i32, expires_in: i64) -> OtpRecord {
        OtpRecord {
            id: Uuid::new_v4(),
            code_hash: crypto_core::sha256_hex(code),
            attempts,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }

    #[test]
    fn matching_code_is_valid() {
        let rec = record("123456", 0, 600);
        assert_eq!(
            evaluate(&rec, &crypto_core::sha256_hex("123456"), Utc::now(), 5),
            OtpCheck::Valid
        );
    }

    #[test]
    fn wrong_code_is_mismatch() {
        let rec = record("123456", 2, 600);
        assert_eq!(
            evaluate(&rec, &crypto_core::sha256_hex("654321"), Utc::now(), 5),
            OtpCheck::Mismatch
        );
    }

    #[test]
    fn expired_code_fails_even_when_correct() {
        let rec = record("123456", 0, -1);
        assert_eq!(
            evaluate(&rec, &crypto_core::sha256_hex("123456"), Utc::now(), 5),
            OtpCheck::Expired
        );
    }

    #[test]
    fn exhausted_attempts_block_correct_code() {
        let rec = record("123456", 5, 600);
        assert_eq!(
            evaluate(&rec, &crypto_core::sha256_hex("123456"), Utc::now(), 5),
            OtpCheck::TooManyAttempts
        );
    }

    #[test]
    fn purpose_strings_match_schema() {
        assert_eq!(OtpPurpose::Signup.as_str(), "signup");
        assert_eq!(OtpPurpose::Signin.as_str(), "signin");
        assert_eq!(OtpPurpose::PasswordReset.as_str(), "password_reset");
        let parsed: OtpPurpose = serde_json::from_str("\"password_reset\"").unwrap();
        assert_eq!(parsed, OtpPurpose::PasswordReset);
    }
}
