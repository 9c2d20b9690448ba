pub mod config;
pub mod error;
pub mod error_utils;
pub mod ledger;
pub mod source;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use ledger::*;
pub use source::*;
pub use types::*;
