pub mod article;
pub mod category;
pub mod comment;
pub mod mfa_secret;
pub mod notification;
pub mod session_token;
pub mod tag;
pub mod user;

pub use article::ArticleRepository;
pub use category::CategoryRepository;
pub use comment::CommentRepository;
pub use mfa_secret::MfaSecretRepository;
pub use notification::NotificationRepository;
pub use session_token::SessionTokenRepository;
pub use tag::TagRepository;
pub use user::UserRepository;
