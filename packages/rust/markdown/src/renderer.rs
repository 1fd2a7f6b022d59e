//! Streaming renderer state and the per-line handlers.

use tracing::{debug, instrument, trace};

use markstream_shared::RenderConfig;

use crate::classify::{Line, classify};
use crate::inline::format_inline;
use crate::list::{ListStack, Marker};

/// Characters an unterminated line may reach before it is rendered anyway.
pub const DEFAULT_LINE_FLUSH_THRESHOLD: usize = 80;

/// Whether the last emitted block left an `<li>` open for continuation text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ItemState {
    #[default]
    Closed,
    Open,
}

/// Incremental Markdown-to-HTML renderer.
///
/// Feed it arbitrary text increments with [`add_chunk`](Self::add_chunk) and
/// call [`flush`](Self::flush) once the stream ends. Concatenating every
/// returned fragment, in order, yields the HTML for the whole input.
///
/// One instance serves one stream. It holds no shared state.
#[derive(Debug)]
pub struct StreamRenderer {
    /// Unterminated line carried between calls.
    current_line: String,
    lists: ListStack,
    item: ItemState,
    line_flush_threshold: usize,
}

impl Default for StreamRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamRenderer {
    /// Create a renderer with the default force-dispatch threshold.
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_LINE_FLUSH_THRESHOLD)
    }

    /// Create a renderer from runtime configuration.
    pub fn with_config(config: &RenderConfig) -> Self {
        Self::with_threshold(config.line_flush_threshold)
    }

    fn with_threshold(line_flush_threshold: usize) -> Self {
        Self {
            current_line: String::new(),
            lists: ListStack::default(),
            item: ItemState::Closed,
            line_flush_threshold,
        }
    }

    /// Number of currently open list frames.
    pub fn list_depth(&self) -> usize {
        self.lists.depth()
    }

    /// Deepest list nesting reached during the most recent `add_chunk` or
    /// `flush` call, including frames that call opened and closed again.
    pub fn peak_list_depth(&self) -> usize {
        self.lists.peak()
    }

    /// The unterminated line waiting for more input.
    pub fn pending_line(&self) -> &str {
        &self.current_line
    }

    /// Consume one increment of input and return the fragments it completes.
    ///
    /// Complete lines are rendered immediately. The trailing partial line is
    /// held back unless it grows past the force-dispatch threshold.
    pub fn add_chunk(&mut self, chunk: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.lists.reset_peak();
        if chunk.is_empty() {
            return out;
        }

        let mut segments = chunk.split('\n');
        let tail = segments.next_back().unwrap_or_default();
        for segment in segments {
            self.current_line.push_str(segment);
            let line = std::mem::take(&mut self.current_line);
            self.dispatch(&line, &mut out);
        }
        self.current_line.push_str(tail);

        // Byte length bounds the char count from above; only count when it might matter.
        if self.current_line.len() > self.line_flush_threshold {
            let chars = self.current_line.chars().count();
            if chars > self.line_flush_threshold {
                trace!(
                    chars,
                    threshold = self.line_flush_threshold,
                    "force-dispatching unterminated line"
                );
                let line = std::mem::take(&mut self.current_line);
                self.dispatch(&line, &mut out);
            }
        }

        out
    }

    /// Render any residual partial line and close every open list.
    ///
    /// Leaves the renderer empty, so a second call returns nothing.
    #[instrument(skip(self))]
    pub fn flush(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        self.lists.reset_peak();

        let residual = !self.current_line.is_empty();
        if residual {
            let line = std::mem::take(&mut self.current_line);
            self.dispatch(&line, &mut out);
        }

        let closed_frames = self.lists.close_all(&mut out);
        self.item = ItemState::Closed;

        debug!(closed_frames, residual, "renderer flushed");
        out
    }

    fn dispatch(&mut self, line: &str, out: &mut Vec<String>) {
        match classify(line) {
            Line::Header { level, text } => {
                self.lists.close_all(out);
                self.item = ItemState::Closed;
                out.push(format!("<h{level}>{}</h{level}>", format_inline(text)));
            }
            Line::OrderedItem {
                number,
                text,
                indent,
            } => self.open_item(Marker::Ordered(number), text, indent, out),
            Line::UnorderedItem { text, indent } => {
                self.open_item(Marker::Unordered, text, indent, out)
            }
            Line::Blank => {
                self.item = ItemState::Closed;
                out.push("<br>".to_string());
            }
            Line::Plain { text, indent } => match self.item {
                // Wrapped continuation of the open item.
                ItemState::Open => out.push(format!(" {}", format_inline(text))),
                ItemState::Closed => {
                    self.lists.close_deeper_than(indent, out);
                    out.push(format_inline(text));
                }
            },
        }
    }

    fn open_item(&mut self, marker: Marker, text: &str, indent: usize, out: &mut Vec<String>) {
        self.lists.open_item(marker, indent, out);
        let content = format_inline(text);
        if !content.is_empty() {
            out.push(content);
        }
        self.item = ItemState::Open;
    }
}
