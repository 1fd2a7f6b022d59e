//! Incremental Markdown-to-HTML rendering for streamed text.
//!
//! Text arrives in arbitrarily sized chunks (typically straight from a token
//! generator) and leaves as ordered HTML fragments, emitted as soon as each
//! line is known. Supported blocks are ATX headers, ordered and unordered
//! lists nested by indentation, blank lines, and plain text, with `**bold**`
//! and `*italic*` inline emphasis.
//!
//! ```
//! use markstream_markdown::StreamRenderer;
//!
//! let mut renderer = StreamRenderer::new();
//! let mut html = String::new();
//! for chunk in ["- a\n- ", "b\n"] {
//!     html.extend(renderer.add_chunk(chunk));
//! }
//! html.extend(renderer.flush());
//! assert_eq!(html, "<ul><li>a</li><li>b</li></ul>");
//! ```

mod classify;
pub mod guard;
mod inline;
mod list;
mod renderer;

pub use classify::{Line, classify};
pub use guard::BoundedRenderer;
pub use renderer::{DEFAULT_LINE_FLUSH_THRESHOLD, StreamRenderer};

/// Render a complete Markdown document in one call.
pub fn render_document(text: &str) -> String {
    let mut renderer = StreamRenderer::new();
    let mut html: String = renderer.add_chunk(text).concat();
    html.push_str(&renderer.flush().concat());
    html
}
