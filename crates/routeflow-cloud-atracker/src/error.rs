//! Activity tracker provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtrackerError {
    #[error("Environment variable not set: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown target reference: target:{0}")]
    UnresolvedTarget(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] routeflow_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, AtrackerError>;

impl From<AtrackerError> for routeflow_cloud::CloudError {
    fn from(e: AtrackerError) -> Self {
        use routeflow_cloud::CloudError;
        match e {
            AtrackerError::CloudError(inner) => inner,
            AtrackerError::Http(inner) => CloudError::Transport(inner.to_string()),
            AtrackerError::JsonError(inner) => CloudError::Json(inner),
            AtrackerError::IoError(inner) => CloudError::Io(inner),
            AtrackerError::NotFound(what) => CloudError::ResourceNotFound(what),
            other => CloudError::InvalidConfig(other.to_string()),
        }
    }
}
