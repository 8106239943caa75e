//! Registry-aware training, validation and prediction.

pub mod error;
pub mod service;

pub use error::{ServiceError, ServiceResult};
pub use service::{ModelService, RegisteredModel};
