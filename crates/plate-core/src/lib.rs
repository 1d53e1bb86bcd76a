mod core;
mod decoration;
mod dom;
mod error;
mod ops;
mod schema;
mod selection;
mod state;
mod view;

pub use crate::core::*;
pub use crate::decoration::*;
pub use crate::dom::*;
pub use crate::error::*;
pub use crate::ops::*;
pub use crate::schema::*;
pub use crate::selection::*;
pub use crate::state::*;
pub use crate::view::*;
