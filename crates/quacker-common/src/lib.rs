pub mod errors;

pub use errors::{ConfigError, QuackerError};

pub type Result<T> = std::result::Result<T, QuackerError>;
