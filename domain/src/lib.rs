pub mod error;
pub mod models;
pub mod outcome;
pub mod repositories;
pub mod validation;

pub use error::{AuthenticationFailure, DomainError, ErrorKind, FieldIssue, RuleViolation};
pub use outcome::{DomainResult, ResultExt};
