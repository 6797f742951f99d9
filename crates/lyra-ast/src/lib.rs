#![cfg_attr(test, allow(clippy::redundant_clone, clippy::clone_on_copy))]

mod description;
pub use description::Description;
mod loc;
pub use loc::{Location, Position};

pub mod source;
mod source_tests;
