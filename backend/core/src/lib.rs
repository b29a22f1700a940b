pub mod error;
pub mod permission;
pub mod resource;

pub use error::{IamGenError, Result};
pub use permission::{service_of, PermissionSet, WILDCARD};
pub use resource::{ResourceRecord, SourceLocation};
