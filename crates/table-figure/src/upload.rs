//! State behind the two image input popups: uploading a file and entering a
//! URL. Both end in the [`ImageProps`] a source command inserts.

use std::sync::Arc;

use manos_plate_core::{EditorRuntime, ImageLike};
use parking_lot::Mutex;
use tracing::debug;

use crate::command::ImageProps;
use crate::error::FigureError;
use crate::resolve::{ImageResolver, ImageResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Pending,
    Done(ImageLike),
    Failed(String),
}

impl From<ImageLike> for ImageProps {
    fn from(image: ImageLike) -> Self {
        Self {
            id: image.id,
            src: image.src,
            width: image.width,
            height: image.height,
        }
    }
}

/// One upload through the host runtime. A failure is reported to the caller
/// and recorded; nothing is retried.
pub struct ImageUploadSession {
    runtime: Option<Arc<dyn EditorRuntime>>,
    state: Mutex<UploadState>,
}

impl ImageUploadSession {
    pub fn new(runtime: Option<Arc<dyn EditorRuntime>>) -> Self {
        Self {
            runtime,
            state: Mutex::new(UploadState::Idle),
        }
    }

    pub fn state(&self) -> UploadState {
        self.state.lock().clone()
    }

    pub async fn upload(&self, bytes: Vec<u8>) -> Result<ImageProps, FigureError> {
        let runtime = self
            .runtime
            .clone()
            .filter(|runtime| runtime.can_upload_image())
            .ok_or(FigureError::UploadUnavailable)?;
        {
            let mut state = self.state.lock();
            if *state == UploadState::Pending {
                return Err(FigureError::UploadInProgress);
            }
            *state = UploadState::Pending;
        }

        match runtime.upload_image(bytes).await {
            Ok(image) => {
                *self.state.lock() = UploadState::Done(image.clone());
                Ok(image.into())
            }
            Err(err) => {
                debug!(%err, "image upload failed");
                *self.state.lock() = UploadState::Failed(err.to_string());
                Err(FigureError::Upload(err))
            }
        }
    }
}

/// URL entry with a live preview. Sources the runtime can proxy are
/// rewritten before they are resolved.
pub struct ImageUrlSession {
    runtime: Option<Arc<dyn EditorRuntime>>,
    resolver: ImageResolver,
    src: String,
    preview: Option<ImageResult>,
}

impl ImageUrlSession {
    pub fn new(runtime: Option<Arc<dyn EditorRuntime>>, resolver: ImageResolver) -> Self {
        Self {
            runtime,
            resolver,
            src: String::new(),
            preview: None,
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn preview(&self) -> Option<&ImageResult> {
        self.preview.as_ref()
    }

    pub async fn set_src(&mut self, input: &str) -> Result<&ImageResult, FigureError> {
        let mut src = input.trim().to_string();
        if let Some(runtime) = &self.runtime
            && runtime.can_proxy_image_src(&src)
        {
            src = runtime
                .get_proxy_image_src(&src)
                .await
                .map_err(FigureError::Proxy)?;
        }

        let result = self.resolver.resolve(&src).await;
        self.src = src;
        Ok(&*self.preview.insert(result))
    }

    /// What to insert, if a source was entered.
    pub fn confirm(&self) -> Option<ImageProps> {
        if self.src.is_empty() {
            return None;
        }
        let (width, height) = self
            .preview
            .as_ref()
            .filter(|preview| preview.complete)
            .map_or((0, 0), |preview| (preview.natural_width, preview.natural_height));
        Some(ImageProps {
            id: String::new(),
            src: self.src.clone(),
            width,
            height,
        })
    }
}
