use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

lazy_static! {
    /// Posts created through the API.
    pub static ref POSTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "blog_posts_created_total",
        "Total posts created"
    )
    .expect("failed to register blog_posts_created_total");

    /// One-time codes issued, by purpose.
    pub static ref OTP_ISSUED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_otp_issued_total",
        "One-time codes issued segmented by purpose",
        &["purpose"]
    )
    .expect("failed to register blog_otp_issued_total");

    /// Verification attempts (valid/invalid/expired/too_many_attempts/not_found).
    pub static ref OTP_VERIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_otp_verifications_total",
        "One-time code verification attempts segmented by purpose and outcome",
        &["purpose", "outcome"]
    )
    .expect("failed to register blog_otp_verifications_total");

    /// Page views recorded, by device type.
    pub static ref PAGE_VIEWS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_page_views_total",
        "Page views recorded segmented by device type",
        &["device"]
    )
    .expect("failed to register blog_page_views_total");

    pub static ref COMMENTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "blog_comments_created_total",
        "Total comments created"
    )
    .expect("failed to register blog_comments_created_total");

    pub static ref UPLOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_image_uploads_total",
        "Image uploads segmented by result",
        &["result"]
    )
    .expect("failed to register blog_image_uploads_total");
}
