use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfqaError {
    #[error("Configuration error: {0}")]
    Config(String),
}
