//! Database models split into domain-specific modules.

pub mod assessment;
pub mod common;
pub mod course;
pub mod enrollment;
pub mod group;
pub mod question;
pub mod response;
pub mod review_template;
pub mod user;

pub use assessment::*;
pub use common::*;
pub use course::*;
pub use enrollment::*;
pub use group::*;
pub use question::*;
pub use response::*;
pub use review_template::*;
pub use user::*;
