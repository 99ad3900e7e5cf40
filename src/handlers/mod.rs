pub mod articles;
pub mod categories;
pub mod comments;
pub mod health;
pub mod login;
pub mod mfa;
pub mod notifications;
pub mod profile;
pub mod register;
pub mod tags;

pub use articles::{create_article, delete_article, get_article, list_articles, update_article};
pub use categories::{create_category, list_categories};
pub use comments::{create_comment, list_comments};
pub use health::health_check;
pub use login::login;
pub use mfa::{confirm_mfa, setup_mfa, verify_mfa};
pub use notifications::list_notifications;
pub use profile::profile;
pub use register::register;
pub use tags::{create_tag, list_tags};
