//! tmining core
//!
//! Multi-user model registry and the services built on it:
//! - Layered configuration (`config`)
//! - Pooled SQLite storage and repositories (`storage`)
//! - Users, model metadata and name resolution (`registry`)
//! - Training, validation and prediction against registered models (`training`)

pub mod config;
pub mod models;
pub mod registry;
pub mod storage;
pub mod training;

pub use config::{ConfigError, CoreConfig};
pub use models::{Claims, ModelRecord, User, UserRecord};
pub use registry::{ModelRegistry, NameResolution};
pub use storage::{ConnectionManager, DatabaseLocation, PoolSettings, StorageError, StorageResult};
pub use training::{ModelService, RegisteredModel, ServiceError, ServiceResult};
