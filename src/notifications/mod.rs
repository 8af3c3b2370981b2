//! Notifications sent to users outside the HTTP response.

pub mod email;

pub use email::{mailer_from_config, verification_email, verification_url, Mailer, OutgoingEmail};
