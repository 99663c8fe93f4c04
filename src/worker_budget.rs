use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

/// Sizes the work-group worker pool from current system load: a loaded
/// machine gets fewer group runners so one submission does not saturate
/// it further. Sampled at submit time, per submission.
struct LoadProbe {
    sys: System,
    sampled_at: Instant,
    /// Cached busy fraction, 0.0..=1.0.
    busy: f32,
}

static PROBE: OnceLock<Mutex<LoadProbe>> = OnceLock::new();

fn probe() -> &'static Mutex<LoadProbe> {
    PROBE.get_or_init(|| {
        let mut sys = System::new();
        // First refresh only primes the counters; usage is a delta and
        // becomes meaningful from the second refresh on.
        sys.refresh_cpu();
        Mutex::new(LoadProbe {
            sys,
            sampled_at: Instant::now(),
            busy: 0.0,
        })
    })
}

/// Primes the probe so the first budget query after queue creation has
/// a baseline to diff against.
pub fn prime() {
    let _ = probe();
}

fn busy_fraction(p: &mut LoadProbe) -> f32 {
    // Two refreshes closer than the minimum interval read as idle, so
    // within the interval the cached fraction is served instead.
    if p.sampled_at.elapsed() >= MINIMUM_CPU_UPDATE_INTERVAL {
        p.sys.refresh_cpu();
        p.sampled_at = Instant::now();
        let cpus = p.sys.cpus();
        if !cpus.is_empty() {
            let total: f32 = cpus.iter().map(|c| c.cpu_usage()).sum();
            p.busy = (total / cpus.len() as f32 / 100.0).clamp(0.0, 1.0);
        }
    }
    p.busy
}

/// Worker count for executing `group_count` work-groups: the idle share
/// of the physical cores, at least 1, never more threads than there are
/// groups to run.
pub fn worker_budget(group_count: usize) -> usize {
    let cores = num_cpus::get_physical().max(1);
    let busy = busy_fraction(&mut probe().lock().unwrap());
    let idle_cores = ((1.0 - busy) * cores as f32).round() as usize;
    idle_cores.clamp(1, group_count.max(1))
}
