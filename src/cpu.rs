use std::sync::OnceLock;

use rayon::ThreadPoolBuilder;

#[derive(Debug, Clone, Copy)]
pub struct CpuInfo {
    pub threads: usize,
}

static INFO: OnceLock<CpuInfo> = OnceLock::new();

pub fn cpu_info() -> &'static CpuInfo {
    INFO.get_or_init(|| CpuInfo {
        threads: num_cpus::get().max(2),
    })
}

/// Builds the global rayon pool used by the unpartitioned fast path.
/// Safe to call more than once; later calls are no-ops.
pub fn init_parallel_runtime() {
    let threads = cpu_info().threads;
    let _ = ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
