use std::process::exit;

use tesela_engine::bench::benchmark;
use tesela_engine::imageio::synthetic_image;
use tesela_engine::{Binding, ExecutionGrid, Kernel, Queue, Shape};

const SIZE: usize = 256;
const ITERATIONS: usize = 10;

fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let image = synthetic_image(SIZE, SIZE);

    let queue = Queue::new();
    let scalar_shape = Shape::d3(SIZE, SIZE, 4);
    let input = queue.create_buffer(&image.data, scalar_shape.clone())?;
    let output = queue.create_uninit(scalar_shape)?;

    // Transpose moves whole pixels, so both buffers are viewed as 2-D
    // grids of vector-of-4 elements.
    let input_v = queue.reinterpret_vec4(input, Shape::d2(SIZE, SIZE))?;
    let output_v = queue.reinterpret_vec4(output, Shape::d2(SIZE, SIZE))?;

    let grid = ExecutionGrid::new(Shape::d2(SIZE, SIZE));

    benchmark(
        || {
            let submitted = queue
                .submit(
                    Kernel::Transpose,
                    grid.clone(),
                    &[Binding::Read(input_v), Binding::Write(output_v)],
                )
                .is_ok();
            if submitted {
                if let Err(e) = queue.wait_all() {
                    eprintln!("iteration failed: {}", e);
                }
            }
        },
        ITERATIONS,
        "transpose",
    );

    let result = queue.take(output)?;
    let mut ok = true;
    'outer: for i in 0..SIZE {
        for j in 0..SIZE {
            for c in 0..4 {
                let got = result[(i * SIZE + j) * 4 + c];
                let want = image.data[(j * SIZE + i) * 4 + c];
                if got != want {
                    println!("mismatch at ({}, {}, {}): got {} want {}", i, j, c, got, want);
                    ok = false;
                    break 'outer;
                }
            }
        }
    }
    Ok(ok)
}

fn main() {
    match run() {
        Ok(true) => println!("transpose: {0}x{0} pixels verified", SIZE),
        Ok(false) => exit(1),
        Err(e) => {
            eprintln!("transpose failed: {}", e);
            exit(1);
        }
    }
}
