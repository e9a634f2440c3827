use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};

/// Dependency container settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct ContainerSettings {
    /// Maximum nesting of recursive resolutions before `make` gives up.
    /// Default: 64
    pub max_depth: Option<usize>,
}

pub const DEFAULT_MAX_DEPTH: usize = 64;

impl ContainerSettings {
    pub fn max_depth(&self) -> usize {
        self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }
}
