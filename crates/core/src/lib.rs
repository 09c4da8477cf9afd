pub mod config;
pub mod error;
pub mod journal;
pub mod paths;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use journal::Journal;
pub use paths::Paths;
pub use types::{AvailableDate, ClaimResult, TargetWindow};
