pub mod article;
pub mod category;
pub mod comment;
pub mod mfa_secret;
pub mod notification;
pub mod session_token;
pub mod tag;
pub mod user;

pub use article::Article;
pub use category::Category;
pub use comment::Comment;
pub use mfa_secret::MfaSecret;
pub use notification::Notification;
pub use session_token::{SessionToken, TokenScope};
pub use tag::Tag;
pub use user::{User, UserPublic};
