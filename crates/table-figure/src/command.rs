//! Toolbar commands.
//!
//! Every command answers the same questions: can it run against this state,
//! run it now, collect input first, run with that input, cancel. Commands
//! never keep positions between calls; they read the state they are handed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use manos_plate_core::{EditorRuntime, EditorState, EditorView, Selection, Transaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FigureConfig;
use crate::figure::{insert_image_figure, insert_table_figure_with};
use crate::placeholder::{PlaceholderRegistry, hide_cursor_placeholder, show_cursor_placeholder};

pub type Dispatch<'a> = &'a mut (dyn FnMut(Transaction) + Send);

/// What an image input popup reports when it closes with a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageProps {
    #[serde(default)]
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// What collecting input for a command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// The command runs without input.
    NotNeeded,
    /// An input popup for the command is already open.
    Busy,
    /// The popup closed, with a value unless it was dismissed.
    Closed(Option<ImageProps>),
}

#[async_trait]
pub trait UiCommand: Send + Sync {
    fn is_enabled(&self, state: &EditorState, view: Option<&dyn EditorView>) -> bool;

    /// Returns whether the document changed.
    fn execute(
        &self,
        state: &EditorState,
        dispatch: Option<Dispatch<'_>>,
        view: Option<&dyn EditorView>,
    ) -> bool;

    async fn wait_for_user_input(
        &self,
        _state: &EditorState,
        _dispatch: Option<Dispatch<'_>>,
        _view: Option<&dyn EditorView>,
    ) -> UserInput {
        UserInput::NotNeeded
    }

    fn execute_with_user_input(
        &self,
        _state: &EditorState,
        _dispatch: Option<Dispatch<'_>>,
        _view: Option<&dyn EditorView>,
        _inputs: Option<&ImageProps>,
    ) -> bool {
        false
    }

    fn cancel(&self) {}

    fn render_label(&self, _state: &EditorState) -> Option<String> {
        None
    }

    fn is_active(&self, _state: &EditorState) -> bool {
        true
    }
}

/// Collects input if the command wants any, then runs it against the state
/// it was enabled for. Every closed popup, dismissed or not, ends in
/// `execute_with_user_input`. Returns what the final call reported.
pub async fn run_command(command: &dyn UiCommand, view: &dyn EditorView) -> bool {
    let state = view.state();
    if !command.is_enabled(&state, Some(view)) {
        return false;
    }

    let mut dispatch = |tr: Transaction| view.dispatch(tr);
    let input = command
        .wait_for_user_input(&state, Some(&mut dispatch), Some(view))
        .await;
    match input {
        UserInput::NotNeeded => command.execute(&state, Some(&mut dispatch), Some(view)),
        UserInput::Busy => false,
        UserInput::Closed(inputs) => command.execute_with_user_input(
            &state,
            Some(&mut dispatch),
            Some(view),
            inputs.as_ref(),
        ),
    }
}

/// Commands that insert a block need a cursor. Node selections carry no
/// range and count as a cursor.
fn cursor_like(selection: &Selection) -> bool {
    !selection.has_range() || selection.is_empty()
}

type CommandFn =
    dyn Fn(&EditorState, Option<Dispatch<'_>>, Option<&dyn EditorView>) -> bool + Send + Sync;

/// Wraps a plain function as a command. The function reports whether it did
/// anything; see [`GenericCommand::is_enabled`] for how that is read.
pub struct GenericCommand {
    run: Box<CommandFn>,
}

pub fn create_command<F>(run: F) -> GenericCommand
where
    F: Fn(&EditorState, Option<Dispatch<'_>>, Option<&dyn EditorView>) -> bool
        + Send
        + Sync
        + 'static,
{
    GenericCommand { run: Box::new(run) }
}

impl fmt::Debug for GenericCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericCommand").finish_non_exhaustive()
    }
}

#[async_trait]
impl UiCommand for GenericCommand {
    /// Enabled when a dry run, with nothing to dispatch to, reports `false`.
    fn is_enabled(&self, state: &EditorState, _view: Option<&dyn EditorView>) -> bool {
        !(self.run)(state, None, None)
    }

    /// Dispatches what the function produced if it changed the document,
    /// then refocuses the view.
    fn execute(
        &self,
        state: &EditorState,
        dispatch: Option<Dispatch<'_>>,
        view: Option<&dyn EditorView>,
    ) -> bool {
        let mut produced: Option<Transaction> = None;
        let mut capture = |tr: Transaction| produced = Some(tr);
        (self.run)(state, Some(&mut capture), view);

        let changed = match produced {
            Some(tr) if tr.doc_changed() => {
                if let Some(dispatch) = dispatch {
                    dispatch(tr);
                }
                true
            }
            _ => false,
        };
        if let Some(view) = view {
            view.focus();
        }
        changed
    }
}

/// Inserts a table figure at the cursor.
#[derive(Debug, Clone, Default)]
pub struct TableFigureCommand {
    config: FigureConfig,
}

impl TableFigureCommand {
    pub fn new(config: FigureConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl UiCommand for TableFigureCommand {
    fn is_enabled(&self, state: &EditorState, _view: Option<&dyn EditorView>) -> bool {
        cursor_like(state.selection())
    }

    /// Without a dispatcher this only reports whether the command applies.
    fn execute(
        &self,
        state: &EditorState,
        dispatch: Option<Dispatch<'_>>,
        view: Option<&dyn EditorView>,
    ) -> bool {
        let Some(dispatch) = dispatch else {
            return self.is_enabled(state, view);
        };

        let tr = insert_table_figure_with(state.tr(), state.schema(), &self.config);
        let changed = tr.doc_changed();
        if changed {
            dispatch(tr);
        }
        if let Some(view) = view {
            view.focus();
        }
        changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSourceKind {
    Url,
    Upload,
}

/// The input widget a source command opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEditorKind {
    UrlInput,
    Upload,
}

pub struct PopupProps {
    pub editor: ImageEditorKind,
    pub runtime: Option<Arc<dyn EditorRuntime>>,
    pub modal: bool,
}

impl fmt::Debug for PopupProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupProps")
            .field("editor", &self.editor)
            .field("has_runtime", &self.runtime.is_some())
            .field("modal", &self.modal)
            .finish()
    }
}

/// Opens input popups. The returned future completes when the popup
/// closes, with whatever value it closed with.
#[async_trait]
pub trait PopupHost: Send + Sync {
    async fn open(&self, props: PopupProps) -> Option<ImageProps>;
}

/// Clears the popup flag when the wait ends, including when its future is
/// dropped before the popup closes.
struct PopupOpen<'a>(&'a AtomicBool);

impl Drop for PopupOpen<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Inserts an image figure from a source the user supplies in a popup.
pub struct ImageSourceCommand {
    kind: ImageSourceKind,
    popups: Arc<dyn PopupHost>,
    placeholders: Arc<PlaceholderRegistry>,
    popup_open: AtomicBool,
}

impl ImageSourceCommand {
    pub fn new(kind: ImageSourceKind, popups: Arc<dyn PopupHost>) -> Self {
        Self {
            kind,
            popups,
            placeholders: PlaceholderRegistry::global(),
            popup_open: AtomicBool::new(false),
        }
    }

    pub fn from_url(popups: Arc<dyn PopupHost>) -> Self {
        Self::new(ImageSourceKind::Url, popups)
    }

    pub fn upload(popups: Arc<dyn PopupHost>) -> Self {
        Self::new(ImageSourceKind::Upload, popups)
    }

    pub fn with_placeholders(mut self, placeholders: Arc<PlaceholderRegistry>) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn kind(&self) -> ImageSourceKind {
        self.kind
    }

    pub fn get_editor(&self) -> ImageEditorKind {
        match self.kind {
            ImageSourceKind::Url => ImageEditorKind::UrlInput,
            ImageSourceKind::Upload => ImageEditorKind::Upload,
        }
    }

    pub fn is_popup_open(&self) -> bool {
        self.popup_open.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ImageSourceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSourceCommand")
            .field("kind", &self.kind)
            .field("popup_open", &self.is_popup_open())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl UiCommand for ImageSourceCommand {
    fn is_enabled(&self, state: &EditorState, view: Option<&dyn EditorView>) -> bool {
        if !cursor_like(state.selection()) {
            return false;
        }
        match self.kind {
            ImageSourceKind::Url => true,
            ImageSourceKind::Upload => view
                .and_then(|view| view.runtime())
                .is_some_and(|runtime| runtime.can_upload_image()),
        }
    }

    /// Source commands only change the document once input arrives.
    fn execute(
        &self,
        _state: &EditorState,
        _dispatch: Option<Dispatch<'_>>,
        _view: Option<&dyn EditorView>,
    ) -> bool {
        false
    }

    async fn wait_for_user_input(
        &self,
        state: &EditorState,
        dispatch: Option<Dispatch<'_>>,
        view: Option<&dyn EditorView>,
    ) -> UserInput {
        if self.popup_open.swap(true, Ordering::SeqCst) {
            debug!(kind = ?self.kind, "image popup already open");
            return UserInput::Busy;
        }
        let _open = PopupOpen(&self.popup_open);

        if let Some(dispatch) = dispatch {
            dispatch(show_cursor_placeholder(&self.placeholders, state));
        }

        let props = PopupProps {
            editor: self.get_editor(),
            runtime: view.and_then(|view| view.runtime()),
            modal: true,
        };
        UserInput::Closed(self.popups.open(props).await)
    }

    /// Always `false`: the insertion is dispatched here, not reported.
    fn execute_with_user_input(
        &self,
        state: &EditorState,
        dispatch: Option<Dispatch<'_>>,
        view: Option<&dyn EditorView>,
        inputs: Option<&ImageProps>,
    ) -> bool {
        let Some(dispatch) = dispatch else {
            return false;
        };

        let mut tr = match view {
            Some(view) => hide_cursor_placeholder(&self.placeholders, &view.state()),
            None => state.tr(),
        };
        tr.set_selection(state.selection().clone());
        if let Some(inputs) = inputs {
            tr = insert_image_figure(tr, state.schema(), &inputs.src, None);
        }
        dispatch(tr);
        if let Some(view) = view {
            view.focus();
        }
        false
    }
}
