//! Widgets

pub mod text_block;

pub use text_block::{fit_width, wrap_styled, StyledLine, TextBlock, TextBlockState};
