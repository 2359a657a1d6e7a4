use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid sample field `{field}`: {reason}")]
    InvalidSample { field: &'static str, reason: String },

    #[error("invalid data: {0}")]
    InvalidData(String),
}
