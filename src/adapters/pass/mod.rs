//! Pass adapters - Implementations of the pass renderer port.
//!
//! - `TextPassRenderer` - Plain-text visitor pass carrying the scan token

mod text_renderer;

pub use text_renderer::TextPassRenderer;
