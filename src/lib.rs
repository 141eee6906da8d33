pub mod config;
pub mod errors;
pub mod generate;
pub mod grouping;
pub mod models;
pub mod policy;
pub mod scanner;
pub mod utils;

// Re-export commonly used items for tests
pub use errors::{AppError, AppResult};
pub use models::{Permission, PermissionDoc};
