use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Malformed {tensor} tensor: unsupported shape {shape:?}")]
    MalformedTensor {
        tensor: &'static str,
        shape: Vec<usize>,
    },

    #[error("Invalid frame dimensions {width}x{height}")]
    InvalidFrameDimensions { width: u32, height: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid label table: {0}")]
    InvalidLabelTable(String),
}

impl EngineError {
    pub fn malformed(tensor: &'static str, shape: &[usize]) -> Self {
        EngineError::MalformedTensor {
            tensor,
            shape: shape.to_vec(),
        }
    }
}
