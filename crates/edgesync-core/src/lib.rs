pub mod config;
pub mod store_uri;
pub mod types;

pub use config::{AgentConfig, ConfigError, RolloutConfig};
pub use store_uri::{StoreUri, StoreUriError};
pub use types::VersionTag;
