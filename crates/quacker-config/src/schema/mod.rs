//! Configuration schema types for Quacker.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod realtime;
mod system;

pub use realtime::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Quacker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuackerConfig {
    pub realtime: RealtimeSection,
    pub logging: LoggingConfig,
}
