#![allow(clippy::wrong_self_convention)]

pub mod arena;
pub mod bit_codec;
pub mod default_image;
pub mod error;
pub mod eval;
pub mod expr;
pub mod ffi;
pub mod function_table;
pub mod limits;
pub mod machine;
pub mod token_codec;

pub mod prelude {
    pub use crate::arena::{Arena, Arenas};
    pub use crate::error::FatalError;
    pub use crate::expr::{AtomKind, ExprRef, Node, Region};
    pub use crate::function_table::FunctionTable;
    pub use crate::limits::Limits;
    pub use crate::machine::Machine;
}
