pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use error::{NpadError, NpadResult};
pub use types::RetentionClass;
