//! Host-side nesting ceiling for untrusted input.
//!
//! [`StreamRenderer`] never caps list depth. [`BoundedRenderer`] wraps one and
//! turns excessive nesting into an input-rejection error, measured at the
//! deepest point of each call. After a rejection the stream is dead: the
//! caller should discard the instance rather than forward anything else
//! from it.

use tracing::warn;

use markstream_shared::{MarkstreamError, RenderConfig, Result};

use crate::StreamRenderer;

/// A [`StreamRenderer`] that rejects input nesting deeper than a limit.
#[derive(Debug)]
pub struct BoundedRenderer {
    inner: StreamRenderer,
    max_list_depth: usize,
    rejected: bool,
}

impl BoundedRenderer {
    /// Build from runtime configuration (threshold and depth limit).
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            inner: StreamRenderer::with_config(config),
            max_list_depth: config.max_list_depth,
            rejected: false,
        }
    }

    /// Whether this stream has already been rejected.
    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    /// Number of currently open list frames.
    pub fn list_depth(&self) -> usize {
        self.inner.list_depth()
    }

    /// Feed one chunk. Fragments from a chunk that crosses the limit are dropped.
    ///
    /// The limit applies to the deepest nesting reached anywhere in the chunk,
    /// not just the depth left open at its end.
    pub fn add_chunk(&mut self, chunk: &str) -> Result<Vec<String>> {
        if self.rejected {
            return Err(MarkstreamError::Rejected);
        }
        let fragments = self.inner.add_chunk(chunk);
        self.check_depth()?;
        Ok(fragments)
    }

    /// Drain the renderer. A rejected stream yields nothing.
    pub fn flush(&mut self) -> Result<Vec<String>> {
        if self.rejected {
            return Ok(Vec::new());
        }
        let fragments = self.inner.flush();
        self.check_depth()?;
        Ok(fragments)
    }

    fn check_depth(&mut self) -> Result<()> {
        let depth = self.inner.peak_list_depth();
        if depth <= self.max_list_depth {
            return Ok(());
        }
        warn!(depth, limit = self.max_list_depth, "rejecting deeply nested input");
        self.rejected = true;
        Err(MarkstreamError::ListDepthExceeded {
            depth,
            limit: self.max_list_depth,
        })
    }
}
