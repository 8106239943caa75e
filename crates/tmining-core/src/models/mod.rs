//! Registry records for users and model metadata.

pub mod model;
pub mod user;

pub use model::ModelRecord;
pub use user::{Claims, User, UserRecord};
