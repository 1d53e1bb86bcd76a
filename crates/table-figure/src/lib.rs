mod command;
mod config;
mod error;
mod figure;
mod figure_view;
mod node_spec;
mod placeholder;
mod plugin;
mod resolve;
mod upload;

pub use crate::command::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::figure::*;
pub use crate::figure_view::*;
pub use crate::node_spec::*;
pub use crate::placeholder::*;
pub use crate::plugin::*;
pub use crate::resolve::*;
pub use crate::upload::*;
