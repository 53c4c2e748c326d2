use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CalibrationError {
    #[error("need at least 2 calibration points, got {got}")]
    InsufficientPoints { got: usize },
    #[error("regression failed: {0}")]
    Fit(String),
}

#[derive(Debug, Error, Clone)]
pub enum LayoutError {
    #[error("configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Error, Clone)]
pub enum EngineError {
    #[error("sample has {got} values, need {want}")]
    InputSize { got: usize, want: usize },
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
