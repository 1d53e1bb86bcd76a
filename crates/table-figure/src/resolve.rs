//! Resolves image sources to their natural dimensions.
//!
//! Requests go through one FIFO queue drained by a single worker task, so at
//! most one probe is ever in flight. Every request yields an [`ImageResult`];
//! failures show up as `complete: false`, never as an error.

use std::collections::HashMap;
use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, trace};
use url::Url;

use crate::config::ResolverConfig;
use crate::error::{FigureError, ProbeError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub complete: bool,
    pub width: u32,
    pub height: u32,
    pub natural_width: u32,
    pub natural_height: u32,
    pub src: String,
}

impl ImageResult {
    pub fn incomplete(src: &str) -> Self {
        Self {
            src: src.to_string(),
            ..Self::default()
        }
    }

    fn loaded(mut self, size: ImageSize) -> Self {
        self.width = size.width;
        self.height = size.height;
        self.natural_width = size.width;
        self.natural_height = size.height;
        self.complete = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// One load attempt. Probes that render the image place it `offset_left`
/// pixels from the viewport's left edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub src: String,
    pub offset_left: i64,
}

/// Loads an image far enough to learn its size.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn load(&self, request: ProbeRequest) -> Result<ImageSize, ProbeError>;
}

/// Host network signal. `None` means the host cannot tell, which counts as
/// online.
pub trait NetworkStatus: Send + Sync {
    fn is_online(&self) -> Option<bool>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeOnline;

impl NetworkStatus for AssumeOnline {
    fn is_online(&self) -> Option<bool> {
        None
    }
}

#[derive(Debug)]
pub struct NetworkSignal {
    online: AtomicBool,
}

impl NetworkSignal {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl NetworkStatus for NetworkSignal {
    fn is_online(&self) -> Option<bool> {
        Some(self.online.load(Ordering::SeqCst))
    }
}

/// Successful results keyed by the exact source string. Clones share the
/// same entries.
#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    entries: Arc<Mutex<HashMap<String, ImageResult>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the cached result, so callers never alias the cache.
    pub fn get(&self, src: &str) -> Option<ImageResult> {
        self.entries.lock().get(src).cloned()
    }

    pub fn insert(&self, src: impl Into<String>, result: ImageResult) {
        self.entries.lock().insert(src.into(), result);
    }

    pub fn contains(&self, src: &str) -> bool {
        self.entries.lock().contains_key(src)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

enum Job {
    Resolve {
        src: String,
        span: tracing::Span,
        reply: oneshot::Sender<ImageResult>,
    },
    Shutdown,
}

/// Handle to the resolver queue. Clones feed the same worker.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    tx: mpsc::UnboundedSender<Job>,
    cache: ImageCache,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Job::Resolve { src, .. } => f.debug_struct("Resolve").field("src", src).finish(),
            Job::Shutdown => f.write_str("Shutdown"),
        }
    }
}

pub struct ImageResolverBuilder {
    probe: Arc<dyn ImageProbe>,
    network: Arc<dyn NetworkStatus>,
    cache: ImageCache,
    config: ResolverConfig,
}

impl ImageResolverBuilder {
    pub fn network(mut self, network: Arc<dyn NetworkStatus>) -> Self {
        self.network = network;
        self
    }

    pub fn cache(mut self, cache: ImageCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Starts the worker on the current tokio runtime.
    pub fn spawn(self) -> Result<ImageResolver, FigureError> {
        let handle = Handle::try_current()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            probe: self.probe,
            network: self.network,
            cache: self.cache.clone(),
            config: self.config,
        };
        handle.spawn(worker.run(rx));
        Ok(ImageResolver {
            tx,
            cache: self.cache,
        })
    }
}

impl ImageResolver {
    pub fn builder(probe: Arc<dyn ImageProbe>) -> ImageResolverBuilder {
        ImageResolverBuilder {
            probe,
            network: Arc::new(AssumeOnline),
            cache: ImageCache::new(),
            config: ResolverConfig::default(),
        }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Queues `src` immediately and returns a future for its result. The
    /// queue position is fixed when this is called, not when the future is
    /// first polled.
    pub fn resolve(&self, src: &str) -> impl Future<Output = ImageResult> + Send + 'static {
        let (reply, rx) = oneshot::channel();
        let queued = self
            .tx
            .send(Job::Resolve {
                src: src.to_string(),
                span: tracing::Span::current(),
                reply,
            })
            .is_ok();
        let src = src.to_string();

        async move {
            if !queued {
                debug!(%src, "image resolver is shut down");
                return ImageResult::incomplete(&src);
            }
            rx.await.unwrap_or_else(|_| ImageResult::incomplete(&src))
        }
    }

    /// Stops the worker once the requests queued so far are done. Later
    /// requests resolve incomplete.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Job::Shutdown);
    }
}

struct Worker {
    probe: Arc<dyn ImageProbe>,
    network: Arc<dyn NetworkStatus>,
    cache: ImageCache,
    config: ResolverConfig,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = rx.recv().await {
            match job {
                Job::Resolve { src, span, reply } => {
                    let result = self.process(&src).instrument(span).await;
                    let _ = reply.send(result);
                }
                Job::Shutdown => break,
            }
        }
        trace!("image resolver worker stopped");
    }

    async fn process(&self, src: &str) -> ImageResult {
        let result = ImageResult::incomplete(src);

        if self.network.is_online() == Some(false) {
            debug!(%src, "offline, skipping image probe");
            return result;
        }
        if let Some(cached) = self.cache.get(src) {
            trace!(%src, "image cache hit");
            return cached;
        }
        if src.is_empty() || !self.scheme_supported(src) {
            debug!(%src, "image source not probed");
            return result;
        }

        let request = ProbeRequest {
            src: src.to_string(),
            offset_left: self.config.probe_offset,
        };
        match self.probe.load(request).await {
            Ok(size) => {
                let loaded = result.loaded(size);
                self.cache.insert(src, loaded.clone());
                loaded
            }
            Err(err) => {
                debug!(%src, %err, "image probe failed");
                result
            }
        }
    }

    fn scheme_supported(&self, src: &str) -> bool {
        let scheme = match Url::parse(src) {
            Ok(url) => Some(url.scheme().to_string()),
            Err(url::ParseError::RelativeUrlWithoutBase) => self.config.document_scheme.clone(),
            Err(err) => {
                debug!(%src, %err, "unparseable image source");
                None
            }
        };
        scheme.is_some_and(|scheme| {
            self.config
                .schemes
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(&scheme))
        })
    }
}

/// Reads dimensions from base64 `data:` URLs without touching the network.
/// Other sources are rejected; hosts provide their own probe for those.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUrlProbe;

impl DataUrlProbe {
    fn decode(src: &str) -> Result<ImageSize, ProbeError> {
        let (header, payload) = src
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .ok_or_else(|| ProbeError::Unsupported(src.to_string()))?;
        if !header.ends_with(";base64") {
            return Err(ProbeError::Unsupported(format!("non-base64 data URL ({header})")));
        }

        let bytes = BASE64_STANDARD.decode(payload.trim())?;
        let (width, height) = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(ImageSize { width, height })
    }
}

#[async_trait]
impl ImageProbe for DataUrlProbe {
    async fn load(&self, request: ProbeRequest) -> Result<ImageSize, ProbeError> {
        Self::decode(&request.src)
    }
}
