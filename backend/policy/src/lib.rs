//! `iamgen-policy`: turns resolved resources into a least-privilege policy document.

pub mod builder;
pub mod coverage;
pub mod generator;
pub mod hashing;
pub mod types;
pub mod validator;

pub use builder::PolicyBuilder;
pub use coverage::{analyze_gaps, compute_coverage, CoverageReport};
pub use generator::PolicyGenerator;
pub use hashing::content_hash;
pub use types::{
    Effect, GenerationOptions, GroupBy, Policy, PolicyMetadata, Statement, POLICY_VERSION,
};
pub use validator::{validate, PolicyWarning};
