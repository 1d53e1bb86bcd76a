use serde::{Deserialize, Serialize};

fn default_rows() -> usize {
    3
}

fn default_cols() -> usize {
    3
}

fn default_highlighted_cells() -> usize {
    3
}

fn default_highlight() -> String {
    "#abdbe3".to_string()
}

fn default_width() -> u32 {
    600
}

fn default_height() -> u32 {
    300
}

fn default_portrait_width() -> u32 {
    624
}

fn default_landscape_width() -> u32 {
    864
}

fn default_maximized_max_width() -> u32 {
    1024
}

/// Knobs for inserted figures and their node views. Widths are CSS pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigureConfig {
    #[serde(default = "default_rows")]
    pub table_rows: usize,
    #[serde(default = "default_cols")]
    pub table_cols: usize,
    /// How many leading cells of the first row get the highlight.
    #[serde(default = "default_highlighted_cells")]
    pub highlighted_cells: usize,
    #[serde(default = "default_highlight")]
    pub highlight: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_portrait_width")]
    pub portrait_width: u32,
    #[serde(default = "default_landscape_width")]
    pub landscape_width: u32,
    #[serde(default = "default_maximized_max_width")]
    pub maximized_max_width: u32,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            table_rows: default_rows(),
            table_cols: default_cols(),
            highlighted_cells: default_highlighted_cells(),
            highlight: default_highlight(),
            width: default_width(),
            height: default_height(),
            portrait_width: default_portrait_width(),
            landscape_width: default_landscape_width(),
            maximized_max_width: default_maximized_max_width(),
        }
    }
}

impl FigureConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

fn default_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string(), "data".to_string()]
}

fn default_probe_offset() -> i64 {
    -10_000_000_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Schemes worth probing. Anything else resolves incomplete at once.
    #[serde(default = "default_schemes")]
    pub schemes: Vec<String>,
    /// Scheme of the hosting document, used for sources without one.
    #[serde(default)]
    pub document_scheme: Option<String>,
    /// Horizontal offset that keeps a rendered probe off screen.
    #[serde(default = "default_probe_offset")]
    pub probe_offset: i64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            schemes: default_schemes(),
            document_scheme: None,
            probe_offset: default_probe_offset(),
        }
    }
}

impl ResolverConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
