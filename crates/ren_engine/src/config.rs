//! Engine configuration and the redirectable output stream.
//!
//! The output sink decides where `print` goes:
//! - `Stdout`: process stdout (default)
//! - `Buffer`: captured for hosts and tests
//! - `Silent`: discarded

use std::sync::Arc;

use parking_lot::Mutex;

/// Output buffer shared between the engine and whoever reads the capture.
#[derive(Default)]
pub struct CaptureBuffer {
    buffer: Mutex<String>,
}

impl CaptureBuffer {
    pub fn new() -> Arc<Self> {
        Arc::new(CaptureBuffer::default())
    }

    fn push(&self, text: &str) {
        self.buffer.lock().push_str(text);
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Take the contents, leaving the buffer empty.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock())
    }
}

/// Destination of engine output.
#[derive(Clone, Default)]
pub enum OutputSink {
    #[default]
    Stdout,
    Buffer(Arc<CaptureBuffer>),
    Silent,
}

impl OutputSink {
    /// Write a line (with newline).
    pub fn println(&self, text: &str) {
        match self {
            OutputSink::Stdout => println!("{text}"),
            OutputSink::Buffer(buffer) => {
                buffer.push(text);
                buffer.push("\n");
            }
            OutputSink::Silent => {}
        }
    }

    /// Write without newline.
    pub fn print(&self, text: &str) {
        match self {
            OutputSink::Stdout => print!("{text}"),
            OutputSink::Buffer(buffer) => buffer.push(text),
            OutputSink::Silent => {}
        }
    }
}

/// Default maximum nesting of action calls before a stack-overflow error.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 2048;

/// Default number of allocations between automatic collections.
pub const DEFAULT_RECYCLE_THRESHOLD: usize = 16 * 1024;

/// Tunables for a new engine.
#[derive(Clone)]
pub struct EngineConfig {
    pub(crate) output: OutputSink,
    pub(crate) max_call_depth: usize,
    pub(crate) recycle_threshold: usize,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig {
            output: OutputSink::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            recycle_threshold: DEFAULT_RECYCLE_THRESHOLD,
        }
    }

    #[must_use]
    pub fn output(mut self, sink: OutputSink) -> Self {
        self.output = sink;
        self
    }

    /// Limit on nested action calls.
    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Allocations between automatic collections at quiescent points.
    /// Zero disables automatic collection.
    #[must_use]
    pub fn recycle_threshold(mut self, allocations: usize) -> Self {
        self.recycle_threshold = allocations;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
