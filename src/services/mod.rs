pub mod import;
pub mod mailer;
pub mod tokens;
