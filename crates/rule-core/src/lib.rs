pub mod aggregate;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod io;
pub mod log;
pub mod log_repo;
pub mod paths;
pub mod review;
pub mod schema;
pub mod schema_repo;
pub mod session;
pub mod store;
pub mod subscription;
pub mod types;

pub use error::{ErrorKind, Result, RuleError};
