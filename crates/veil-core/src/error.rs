use thiserror::Error;

#[derive(Debug, Error)]
pub enum VeilError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error("No tokio runtime available to drive the autolock timer")]
    NoRuntime,

    #[error("Settings persistence failed: {0:#}")]
    Persistence(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VeilError>;
