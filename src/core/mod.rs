

pub mod config;
pub mod error;
pub mod retrieval_modes;

pub use self::config::{RetrievalConfig, SynthConfig};
pub use error::{Result, RetrievalError, SynthError};
pub use retrieval_modes::RetrievalMode;
