use std::time::Instant;

/// Runs `work` (one full submit + wait cycle) `iterations` times and
/// reports timing. Purely observational; never alters kernel results.
pub fn benchmark<F: FnMut()>(mut work: F, iterations: usize, label: &str) {
    let mut total_ms = 0.0f64;
    for it in 0..iterations {
        let t0 = Instant::now();
        work();
        let dt = t0.elapsed().as_secs_f64() * 1000.0;
        total_ms += dt;
        if crate::debug_enabled() && !crate::is_silent() {
            println!("[BENCH] {} iter {} took {:.3} ms", label, it, dt);
        }
    }
    if !crate::is_silent() {
        println!(
            "[BENCH] {}: {} iterations, mean {:.3} ms",
            label,
            iterations,
            total_ms / iterations.max(1) as f64
        );
    }
}
