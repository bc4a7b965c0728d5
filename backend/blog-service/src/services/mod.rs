/// Business logic layer
pub mod about;
pub mod analytics;
pub mod auth;
pub mod comments;
pub mod email;
pub mod engagement;
pub mod feeds;
pub mod media;
pub mod otp;
pub mod posts;
pub mod slug;
pub mod taxonomy;
pub mod users;

pub use about::AboutService;
pub use analytics::AnalyticsService;
pub use auth::AuthService;
pub use comments::CommentService;
pub use email::EmailService;
pub use engagement::EngagementService;
pub use feeds::FeedService;
pub use media::{ImageStore, MediaService, S3ImageStore};
pub use otp::{OtpPurpose, OtpService};
pub use posts::PostService;
pub use taxonomy::TaxonomyService;
pub use users::UserService;
