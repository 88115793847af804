pub mod backend;
pub mod error;
mod models;
pub mod validator;

pub use crate::backend::{Checker, CheckerHandle, checker_for};
pub use crate::models::{CheckResult, CheckType, DEFAULT_CONFIDENCE, StorageType};
