//! Stream driver: a token source feeding the renderer over a channel.
//!
//! The producer side either splits a whole text into fixed-size chunks, or
//! forwards a reader (stdin) as its bytes arrive, with an optional delay
//! between sends. The consumer side pushes each chunk through a
//! [`BoundedRenderer`] and writes fragments as they appear.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use color_eyre::eyre::Result;
use markstream_markdown::BoundedRenderer;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

/// Split `text` into chunks of at most `size` characters.
///
/// Never splits inside a UTF-8 character. A `size` of zero is treated as one.
pub(crate) fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Bytes requested from the reader per read call.
const READ_BUFFER_SIZE: usize = 4096;

/// Send chunks down the channel, pausing `delay` between sends.
pub(crate) async fn produce(chunks: Vec<String>, delay: Duration, tx: mpsc::Sender<String>) {
    let total = chunks.len();
    if send_all(chunks, delay, &tx).await {
        debug!(total, "producer finished");
    }
}

/// Forward `reader` down the channel as it is read, in chunks of at most
/// `chunk_size` characters.
///
/// Nothing waits for EOF: each read is decoded and sent straight away. A
/// UTF-8 sequence split across reads is held until it completes, and invalid
/// bytes become U+FFFD.
pub(crate) async fn produce_reader<R>(
    mut reader: R,
    chunk_size: usize,
    delay: Duration,
    tx: mpsc::Sender<String>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut pending = Vec::new();
    let mut bytes = 0usize;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, bytes, "input read failed, ending stream");
                break;
            }
        };
        bytes += n;
        pending.extend_from_slice(&buf[..n]);

        let text = decode_complete(&mut pending);
        if !send_all(split_chunks(&text, chunk_size), delay, &tx).await {
            return;
        }
    }

    if !pending.is_empty() {
        let text = String::from_utf8_lossy(&pending).into_owned();
        if !send_all(split_chunks(&text, chunk_size), delay, &tx).await {
            return;
        }
    }
    debug!(bytes, "reader producer finished");
}

/// Send every chunk, pausing `delay` after each. Returns `false` once the
/// consumer has hung up.
async fn send_all(chunks: Vec<String>, delay: Duration, tx: &mpsc::Sender<String>) -> bool {
    let total = chunks.len();
    for (i, chunk) in chunks.into_iter().enumerate() {
        if tx.send(chunk).await.is_err() {
            debug!(sent = i, total, "consumer hung up, stopping producer");
            return false;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    true
}

/// Take the decodable prefix of `pending`, leaving an incomplete trailing
/// UTF-8 sequence behind for the next read.
fn decode_complete(pending: &mut Vec<u8>) -> String {
    let complete = match std::str::from_utf8(pending.as_slice()) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        // Invalid sequence somewhere: decode everything lossily.
        Err(_) => pending.len(),
    };
    let text = String::from_utf8_lossy(&pending[..complete]).into_owned();
    pending.drain(..complete);
    text
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// How rendered fragments are written out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Raw HTML, fragments written back to back.
    Html,
    /// One JSON record per fragment: `{"seq":N,"html":"..."}`.
    Jsonl,
}

#[derive(Serialize)]
struct FragmentRecord<'a> {
    seq: usize,
    html: &'a str,
}

/// Writes fragments in emission order, flushing after each batch.
pub(crate) struct FragmentSink<W: Write> {
    out: W,
    format: OutputFormat,
    seq: usize,
}

impl<W: Write> FragmentSink<W> {
    pub(crate) fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            seq: 0,
        }
    }

    /// Write a batch of fragments. Returns how many were written.
    pub(crate) fn write_batch(&mut self, fragments: &[String]) -> Result<usize> {
        for fragment in fragments {
            match self.format {
                OutputFormat::Html => self.out.write_all(fragment.as_bytes())?,
                OutputFormat::Jsonl => {
                    let record = FragmentRecord {
                        seq: self.seq,
                        html: fragment,
                    };
                    serde_json::to_writer(&mut self.out, &record)?;
                    self.out.write_all(b"\n")?;
                }
            }
            self.seq += 1;
        }
        self.out.flush()?;
        Ok(fragments.len())
    }

    /// Terminate the output. HTML output gets a trailing newline if anything was written.
    pub(crate) fn finish(&mut self) -> Result<()> {
        if self.format == OutputFormat::Html && self.seq > 0 {
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Counters for one driven stream.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct StreamSummary {
    pub chunks: usize,
    pub fragments: usize,
    pub cancelled: bool,
}

/// Receives progress updates while a stream is driven.
///
/// Exactly one of `done` or `aborted` is called at the end of every stream.
pub(crate) trait StreamReporter {
    fn chunk_rendered(&self, chunks: usize, fragments: usize);
    fn done(&self, summary: &StreamSummary);
    fn aborted(&self, summary: &StreamSummary);
}

/// Reporter that ignores everything.
pub(crate) struct NoProgress;

impl StreamReporter for NoProgress {
    fn chunk_rendered(&self, _chunks: usize, _fragments: usize) {}
    fn done(&self, _summary: &StreamSummary) {}
    fn aborted(&self, _summary: &StreamSummary) {}
}

/// Consume chunks until the channel closes or `cancel` resolves, then flush.
///
/// Cancellation still flushes, so the written document never ends with open
/// list tags. A depth rejection aborts without flushing. The reporter is told
/// how the stream ended either way.
pub(crate) async fn drive<W, F>(
    rx: mpsc::Receiver<String>,
    renderer: &mut BoundedRenderer,
    sink: &mut FragmentSink<W>,
    reporter: &dyn StreamReporter,
    cancel: F,
) -> Result<StreamSummary>
where
    W: Write,
    F: Future<Output = ()>,
{
    let mut summary = StreamSummary::default();
    match pump(rx, renderer, sink, reporter, cancel, &mut summary).await {
        Ok(()) => {
            reporter.done(&summary);
            Ok(summary)
        }
        Err(e) => {
            reporter.aborted(&summary);
            Err(e)
        }
    }
}

async fn pump<W, F>(
    mut rx: mpsc::Receiver<String>,
    renderer: &mut BoundedRenderer,
    sink: &mut FragmentSink<W>,
    reporter: &dyn StreamReporter,
    cancel: F,
    summary: &mut StreamSummary,
) -> Result<()>
where
    W: Write,
    F: Future<Output = ()>,
{
    tokio::pin!(cancel);

    loop {
        tokio::select! {
            chunk = rx.recv() => match chunk {
                Some(chunk) => {
                    summary.chunks += 1;
                    let fragments = renderer.add_chunk(&chunk)?;
                    summary.fragments += sink.write_batch(&fragments)?;
                    reporter.chunk_rendered(summary.chunks, summary.fragments);
                }
                None => break,
            },
            () = &mut cancel => {
                warn!(chunks = summary.chunks, "stream cancelled, flushing renderer");
                summary.cancelled = true;
                break;
            }
        }
    }

    let tail = renderer.flush()?;
    summary.fragments += sink.write_batch(&tail)?;
    sink.finish()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use markstream_shared::RenderConfig;

    /// Records how each stream ended.
    #[derive(Default)]
    struct RecordingReporter {
        endings: RefCell<Vec<&'static str>>,
    }

    impl StreamReporter for RecordingReporter {
        fn chunk_rendered(&self, _chunks: usize, _fragments: usize) {}

        fn done(&self, _summary: &StreamSummary) {
            self.endings.borrow_mut().push("done");
        }

        fn aborted(&self, _summary: &StreamSummary) {
            self.endings.borrow_mut().push("aborted");
        }
    }

    fn renderer(max_list_depth: usize) -> BoundedRenderer {
        BoundedRenderer::new(&RenderConfig {
            line_flush_threshold: 80,
            max_list_depth,
        })
    }

    async fn channel_with(chunks: &[&str]) -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            tx.send(chunk.to_string()).await.expect("channel open");
        }
        (tx, rx)
    }

    #[test]
    fn split_chunks_respects_char_boundaries() {
        assert_eq!(split_chunks("héllo", 2), vec!["hé", "ll", "o"]);
        assert_eq!(split_chunks("abc", 10), vec!["abc"]);
        assert!(split_chunks("", 4).is_empty());
        assert_eq!(split_chunks("ab", 0), vec!["a", "b"]);
    }

    #[test]
    fn jsonl_sink_numbers_fragments() {
        let mut sink = FragmentSink::new(Vec::new(), OutputFormat::Jsonl);
        let written = sink
            .write_batch(&["<h1>T</h1>".to_string(), "x".to_string()])
            .unwrap();
        sink.finish().unwrap();
        assert_eq!(written, 2);

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            out,
            "{\"seq\":0,\"html\":\"<h1>T</h1>\"}\n{\"seq\":1,\"html\":\"x\"}\n"
        );
    }

    #[test]
    fn html_sink_without_fragments_writes_nothing() {
        let mut sink = FragmentSink::new(Vec::new(), OutputFormat::Html);
        sink.finish().unwrap();
        assert!(sink.into_inner().is_empty());
    }

    #[tokio::test]
    async fn drive_renders_until_channel_closes() {
        let (tx, rx) = channel_with(&["- a\n", "- b", "\n# Done\n"]).await;
        drop(tx);

        let mut renderer = renderer(8);
        let mut sink = FragmentSink::new(Vec::new(), OutputFormat::Html);
        let reporter = RecordingReporter::default();
        let summary = drive(rx, &mut renderer, &mut sink, &reporter, std::future::pending())
            .await
            .unwrap();

        assert_eq!(*reporter.endings.borrow(), vec!["done"]);
        assert_eq!(summary.chunks, 3);
        assert!(!summary.cancelled);
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "<ul><li>a</li><li>b</li></ul><h1>Done</h1>\n");
    }

    #[tokio::test]
    async fn drive_flushes_on_cancel() {
        // Sender stays alive, so only cancellation ends the loop.
        let (_tx, rx) = channel_with(&["- a\n  - b"]).await;

        let mut renderer = renderer(8);
        let mut sink = FragmentSink::new(Vec::new(), OutputFormat::Html);
        let cancel = tokio::time::sleep(Duration::from_millis(20));
        let summary = drive(rx, &mut renderer, &mut sink, &NoProgress, cancel)
            .await
            .unwrap();

        assert!(summary.cancelled);
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "<ul><li>a<ul><li>b</li></ul></li></ul>\n");
    }

    #[tokio::test]
    async fn drive_stops_on_depth_rejection() {
        let (tx, rx) = channel_with(&["- a\n", "  - b\n", "- c\n"]).await;
        drop(tx);

        let mut renderer = renderer(1);
        let mut sink = FragmentSink::new(Vec::new(), OutputFormat::Html);
        let reporter = RecordingReporter::default();
        let err = drive(rx, &mut renderer, &mut sink, &reporter, std::future::pending())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("exceeds limit"));
        assert_eq!(*reporter.endings.borrow(), vec!["aborted"]);
        assert!(renderer.is_rejected());
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "<ul><li>a");
    }

    #[tokio::test]
    async fn producer_sends_every_chunk() {
        let (tx, mut rx) = mpsc::channel(4);
        let chunks = split_chunks("one two", 3);
        tokio::spawn(produce(chunks, Duration::ZERO, tx));

        let mut received = Vec::new();
        while let Some(chunk) = rx.recv().await {
            received.push(chunk);
        }
        assert_eq!(received, vec!["one", " tw", "o"]);
    }

    #[test]
    fn decode_complete_holds_split_character() {
        let bytes = "hé".as_bytes();
        let mut pending = bytes[..2].to_vec();
        assert_eq!(decode_complete(&mut pending), "h");
        assert_eq!(pending, vec![0xC3]);

        pending.push(bytes[2]);
        assert_eq!(decode_complete(&mut pending), "é");
        assert!(pending.is_empty());
    }

    #[test]
    fn decode_complete_replaces_invalid_bytes() {
        let mut pending = vec![b'a', 0xFF, b'b'];
        assert_eq!(decode_complete(&mut pending), "a\u{FFFD}b");
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn reader_producer_sends_before_eof() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::channel(8);
        tokio::spawn(produce_reader(reader, 4, Duration::ZERO, tx));

        // Writer is still open, so this chunk can only arrive incrementally.
        tokio::io::AsyncWriteExt::write_all(&mut writer, b"# Hi\n")
            .await
            .unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("# Hi"));
        assert_eq!(rx.recv().await.as_deref(), Some("\n"));

        drop(writer);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn reader_producer_feeds_renderer_end_to_end() {
        let (tx, rx) = mpsc::channel(8);
        let input: &[u8] = "- a\n- b\n".as_bytes();
        tokio::spawn(produce_reader(input, 3, Duration::ZERO, tx));

        let mut renderer = renderer(8);
        let mut sink = FragmentSink::new(Vec::new(), OutputFormat::Html);
        drive(rx, &mut renderer, &mut sink, &NoProgress, std::future::pending())
            .await
            .unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "<ul><li>a</li><li>b</li></ul>\n");
    }
}
