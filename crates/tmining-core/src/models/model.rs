use serde::{Deserialize, Serialize};

/// Metadata of a registered model. The artifact itself lives in the artifact
/// store under `identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Display name; not unique.
    pub name: String,
    pub identifier: String,
    pub shared: bool,
    pub owner_identifier: String,
}

impl ModelRecord {
    /// Whether `reader` may load this model's artifact.
    pub fn is_readable_by(&self, reader: &str) -> bool {
        self.shared || self.owner_identifier == reader
    }
}
