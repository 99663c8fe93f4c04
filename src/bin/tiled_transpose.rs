use std::process::exit;

use tesela_engine::bench::benchmark;
use tesela_engine::imageio::synthetic_image;
use tesela_engine::{Binding, ExecutionGrid, Kernel, Queue, Shape};

const SIZE: usize = 256;
const TILE: usize = 16;
const ITERATIONS: usize = 10;

fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let image = synthetic_image(SIZE, SIZE);

    let queue = Queue::new();
    let scalar_shape = Shape::d3(SIZE, SIZE, 4);
    let input = queue.create_buffer(&image.data, scalar_shape.clone())?;
    let output = queue.create_uninit(scalar_shape)?;

    let input_v = queue.reinterpret_vec4(input, Shape::d2(SIZE, SIZE))?;
    let output_v = queue.reinterpret_vec4(output, Shape::d2(SIZE, SIZE))?;

    let grid = ExecutionGrid::partitioned(Shape::d2(SIZE, SIZE), Shape::d2(TILE, TILE));
    let scratch = Shape::d3(TILE, TILE, 4);

    benchmark(
        || {
            let submitted = queue
                .submit(
                    Kernel::TiledTranspose,
                    grid.clone(),
                    &[
                        Binding::Read(input_v),
                        Binding::Write(output_v),
                        Binding::Local(scratch.clone()),
                    ],
                )
                .is_ok();
            if submitted {
                if let Err(e) = queue.wait_all() {
                    eprintln!("iteration failed: {}", e);
                }
            }
        },
        ITERATIONS,
        "tiled_transpose",
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
        Ok(true) => println!(
            "tiled_transpose: {0}x{0} pixels verified ({1}x{1} tiles)",
            SIZE, TILE
        ),
        Ok(false) => exit(1),
        Err(e) => {
            eprintln!("tiled_transpose failed: {}", e);
            exit(1);
        }
    }
}
