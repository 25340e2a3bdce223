use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("No artwork found for {content_id} after {attempts} candidate URLs")]
    NotFound { content_id: String, attempts: usize },

    #[error("Title index parse error at line {line}: {message}")]
    IndexParse { line: usize, message: String },
}
