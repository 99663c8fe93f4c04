use std::process::exit;

use tesela_engine::{Binding, EngineError, ExecutionGrid, Kernel, Queue, Shape};

const N: usize = 1024;

fn run() -> Result<bool, EngineError> {
    let queue = Queue::new();

    let host: Vec<f32> = (0..N).map(|i| i as f32).collect();
    let input = queue.create_buffer(&host, Shape::d1(N))?;
    let output = queue.create_uninit(Shape::d1(N))?;

    queue.submit(
        Kernel::VectorSqrt,
        ExecutionGrid::new(Shape::d1(N)),
        &[Binding::Read(input), Binding::Write(output)],
    )?;
    queue.wait_all()?;

    let result = queue.take(output)?;
    let mut ok = true;
    for (i, (&got, &src)) in result.iter().zip(host.iter()).enumerate() {
        let want = src.sqrt();
        if (got - want).abs() > 1e-3 {
            println!("mismatch at {}: got {} want {}", i, got, want);
            ok = false;
        }
    }
    Ok(ok)
}

fn main() {
    match run() {
        Ok(true) => println!("vector_sqrt: {} elements verified", N),
        Ok(false) => exit(1),
        Err(e) => {
            eprintln!("vector_sqrt failed: {}", e);
            exit(1);
        }
    }
}
