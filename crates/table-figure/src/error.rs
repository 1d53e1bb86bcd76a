use thiserror::Error;

#[derive(Debug, Error)]
pub enum FigureError {
    /// The resolver worker needs a tokio runtime to run on.
    #[error("no tokio runtime available to run the image resolver")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("the editor runtime cannot upload images")]
    UploadUnavailable,

    #[error("an image upload is already in progress")]
    UploadInProgress,

    #[error("image upload failed: {0}")]
    Upload(#[source] anyhow::Error),

    #[error("image source proxy failed: {0}")]
    Proxy(#[source] anyhow::Error),
}

/// Why a probe could not read an image's dimensions. The resolver folds
/// every variant into an incomplete result.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("unsupported image source: {0}")]
    Unsupported(String),

    #[error("image failed to load: {0}")]
    Load(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}
