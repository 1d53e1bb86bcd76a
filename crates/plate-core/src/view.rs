use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::ops::Transaction;
use crate::state::EditorState;

/// What the host returns after storing an uploaded image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLike {
    #[serde(default)]
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Host services the editor may call out to. Every capability defaults to
/// "unsupported".
#[async_trait]
pub trait EditorRuntime: Send + Sync {
    fn can_upload_image(&self) -> bool {
        false
    }

    async fn upload_image(&self, _bytes: Vec<u8>) -> anyhow::Result<ImageLike> {
        anyhow::bail!("image upload is not supported by this runtime")
    }

    fn can_proxy_image_src(&self, _src: &str) -> bool {
        false
    }

    async fn get_proxy_image_src(&self, src: &str) -> anyhow::Result<String> {
        Ok(src.to_string())
    }
}

pub trait EditorView: Send + Sync {
    /// Snapshot of the current state.
    fn state(&self) -> EditorState;
    fn dispatch(&self, tr: Transaction);
    fn focus(&self);
    fn runtime(&self) -> Option<Arc<dyn EditorRuntime>>;
}

#[derive(Debug, Default)]
pub struct EditorConfig {
    pub max_history: usize,
}

impl EditorConfig {
    fn with_defaults(mut self) -> Self {
        if self.max_history == 0 {
            self.max_history = 200;
        }
        self
    }
}

/// In-memory view: applies dispatched transactions to its state and keeps
/// the most recent ones.
pub struct Editor {
    state: Mutex<EditorState>,
    history: Mutex<Vec<Transaction>>,
    runtime: Option<Arc<dyn EditorRuntime>>,
    config: EditorConfig,
    focus_count: AtomicUsize,
}

impl Editor {
    pub fn new(state: EditorState) -> Self {
        Self::with_config(state, EditorConfig::default())
    }

    pub fn with_config(state: EditorState, config: EditorConfig) -> Self {
        Self {
            state: Mutex::new(state),
            history: Mutex::new(Vec::new()),
            runtime: None,
            config: config.with_defaults(),
            focus_count: AtomicUsize::new(0),
        }
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn EditorRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn history(&self) -> Vec<Transaction> {
        self.history.lock().clone()
    }

    pub fn focus_count(&self) -> usize {
        self.focus_count.load(Ordering::SeqCst)
    }
}

impl EditorView for Editor {
    fn state(&self) -> EditorState {
        self.state.lock().clone()
    }

    fn dispatch(&self, tr: Transaction) {
        {
            let mut state = self.state.lock();
            let next = state.apply(&tr);
            *state = next;
        }

        let mut history = self.history.lock();
        history.push(tr);
        if history.len() > self.config.max_history {
            history.remove(0);
        }
    }

    fn focus(&self) {
        self.focus_count.fetch_add(1, Ordering::SeqCst);
    }

    fn runtime(&self) -> Option<Arc<dyn EditorRuntime>> {
        self.runtime.clone()
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("state", &*self.state.lock())
            .field("config", &self.config)
            .field("has_runtime", &self.runtime.is_some())
            .finish()
    }
}
