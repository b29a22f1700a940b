use thiserror::Error;

/// Top-level error type for the iamgen pipeline.
#[derive(Debug, Error)]
pub enum IamGenError {
    /// A knowledge-base source could not be found or read.
    #[error("failed to load mapping source {path}: {reason}")]
    Load { path: String, reason: String },

    /// A knowledge-base source was read but its content has the wrong shape.
    #[error("failed to parse mapping source {source_name}: {message}")]
    Parse { source_name: String, message: String },

    #[error("no mapping found for resource type: {0}")]
    UnmappedResource(String),

    #[error("resource list cannot be absent")]
    EmptyInput,

    #[error("policy cannot be absent")]
    NilPolicy,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IamGenError {
    pub fn load(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IamGenError>;
