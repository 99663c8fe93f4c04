pub mod access;
pub mod bench;
pub mod buffer;
pub mod config;
pub mod cpu;
pub mod error;
pub mod filter;
pub mod grid;
pub mod imageio;
pub mod kernel;
pub mod queue;
pub mod shape;
pub mod worker_budget;

pub use access::{AccessMode, Accessor, Binding, LocalScratch};
pub use buffer::BufferId;
pub use error::{ConfigError, EngineError, RuntimeError};
pub use grid::{ExecutionGrid, WorkItem};
pub use kernel::{Kernel, KernelCtx};
pub use queue::{Queue, SubmissionToken};
pub use shape::Shape;

use std::sync::atomic::{AtomicBool, Ordering};

static SILENT_MODE: AtomicBool = AtomicBool::new(false);

/// Suppresses engine trace and benchmark output. Used by the tests.
pub fn set_silent_mode(enabled: bool) {
    SILENT_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_silent() -> bool {
    SILENT_MODE.load(Ordering::Relaxed)
}

/// Verbose tracing, gated on the TESELA_DEBUG environment variable.
pub fn debug_enabled() -> bool {
    std::env::var("TESELA_DEBUG").map(|v| v == "1").unwrap_or(false)
}

pub(crate) fn trace(msg: &str) {
    if debug_enabled() && !is_silent() {
        println!("[TESELA] {}", msg);
    }
}
