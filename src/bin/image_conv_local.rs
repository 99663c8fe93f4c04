use std::path::Path;
use std::process::exit;

use tesela_engine::bench::benchmark;
use tesela_engine::filter::{generate_filter, FilterKind};
use tesela_engine::imageio::{crop_to_multiple, read_image, synthetic_image, write_image, HostImage};
use tesela_engine::{Binding, ExecutionGrid, Kernel, Queue, Shape};

// The tile edge must be at least the filter width so the staging
// subset (one column of items, one filter row each) covers the filter.
const FILTER_WIDTH: usize = 11;
const TILE: usize = 16;
const SIZE: usize = 512;
const ITERATIONS: usize = 10;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    // The partitioned grid needs both extents to divide by the tile.
    let image = match std::env::args().nth(1) {
        Some(path) => crop_to_multiple(&read_image(Path::new(&path))?, TILE),
        None => synthetic_image(SIZE, SIZE),
    };
    let filter = generate_filter(FilterKind::Blur, FILTER_WIDTH);

    let queue = Queue::new();
    let image_shape = Shape::d3(image.height, image.width, 4);
    let input = queue.create_buffer(&image.data, image_shape.clone())?;
    let output = queue.create_uninit(image_shape)?;
    let weights = queue.create_buffer(
        &filter.data,
        Shape::d3(FILTER_WIDTH, FILTER_WIDTH, 4),
    )?;

    let grid = ExecutionGrid::partitioned(
        Shape::d2(image.height, image.width),
        Shape::d2(TILE, TILE),
    );
    let scratch = Shape::d3(FILTER_WIDTH, FILTER_WIDTH, 4);

    benchmark(
        || {
            let submitted = queue
                .submit(
                    Kernel::ImageConvolutionLocal {
                        filter_width: FILTER_WIDTH,
                    },
                    grid.clone(),
                    &[
                        Binding::Read(input),
                        Binding::Write(output),
                        Binding::Read(weights),
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
        "image_conv_local",
    );

    let mut blurred = vec![0.0f32; image.data.len()];
    queue.read_back(output, &mut blurred)?;
    write_image(
        Path::new("blurred_local.ppm"),
        &HostImage {
            data: blurred,
            width: image.width,
            height: image.height,
            channels: 4,
        },
    )?;
    println!(
        "wrote blurred_local.ppm ({}x{})",
        image.width, image.height
    );
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("image_conv_local failed: {}", e);
        exit(1);
    }
}
