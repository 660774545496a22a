use std::path::PathBuf;

pub type AuthzResult<T> = Result<T, AuthzError>;

#[derive(thiserror::Error, Debug)]
pub enum AuthzError {
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("fields not writable on {entity_type}: {}", fields.join(", "))]
    FieldsNotWritable {
        entity_type: String,
        fields: Vec<String>,
    },
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid snapshot {} at `{}`", path.display(), source.path())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AuthzError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn fields_not_writable(entity_type: impl Into<String>, fields: Vec<String>) -> Self {
        Self::FieldsNotWritable {
            entity_type: entity_type.into(),
            fields,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn decode(
        path: impl Into<PathBuf>,
        source: serde_path_to_error::Error<serde_json::Error>,
    ) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// True for errors that represent an authorization decision rather than a fault.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::Forbidden(_) | Self::FieldsNotWritable { .. })
    }
}
