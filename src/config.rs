use std::sync::{Mutex, MutexGuard, OnceLock};

/// Knobs for the submission executor. Defaults favour the parallel
/// paths; sequential group execution is kept for debugging.
#[derive(Debug, Clone)]
pub struct RuntimeFlags {
    /// Distribute the work-groups of one submission across worker
    /// threads. When false, groups run one after another on the
    /// submission's executor thread.
    pub parallel_groups: bool,
    /// Fixed worker count for group execution. `None` derives the
    /// budget from the last system load snapshot.
    pub worker_threads: Option<usize>,
}

impl Default for RuntimeFlags {
    fn default() -> Self {
        Self {
            parallel_groups: true,
            worker_threads: None,
        }
    }
}

static RUNTIME_FLAGS: OnceLock<Mutex<RuntimeFlags>> = OnceLock::new();

fn global_runtime_flags() -> &'static Mutex<RuntimeFlags> {
    RUNTIME_FLAGS.get_or_init(|| Mutex::new(RuntimeFlags::default()))
}

pub fn get_runtime_flags() -> MutexGuard<'static, RuntimeFlags> {
    global_runtime_flags().lock().unwrap()
}
