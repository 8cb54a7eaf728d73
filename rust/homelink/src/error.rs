use thiserror::Error;

#[derive(Error, Debug)]
pub enum HomelinkError {
    #[error("Zenoh error: {0}")]
    ZenohError(#[from] zenoh::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Camera not accessible: {0}")]
    CameraUnavailable(String),
    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HomelinkError>;
