use tesela_engine::{Binding, ExecutionGrid, Kernel, Queue, Shape};

fn pixel_image(n: usize) -> Vec<f32> {
    // Channel c of pixel (i, j) holds (i*n + j)*4 + c: all cells
    // distinct, so any index mix-up shows up as a wrong value.
    (0..n * n * 4).map(|v| v as f32).collect()
}

fn run_naive(image: &[f32], n: usize) -> Vec<f32> {
    let queue = Queue::new();
    let shape = Shape::d3(n, n, 4);
    let input = queue.create_buffer(image, shape.clone()).unwrap();
    let output = queue.create_uninit(shape).unwrap();
    let input_v = queue.reinterpret_vec4(input, Shape::d2(n, n)).unwrap();
    let output_v = queue.reinterpret_vec4(output, Shape::d2(n, n)).unwrap();

    queue
        .submit(
            Kernel::Transpose,
            ExecutionGrid::new(Shape::d2(n, n)),
            &[Binding::Read(input_v), Binding::Write(output_v)],
        )
        .unwrap();
    queue.wait_all().unwrap();
    queue.take(output).unwrap()
}

fn run_tiled(image: &[f32], n: usize, tile: usize) -> Vec<f32> {
    let queue = Queue::new();
    let shape = Shape::d3(n, n, 4);
    let input = queue.create_buffer(image, shape.clone()).unwrap();
    let output = queue.create_uninit(shape).unwrap();
    let input_v = queue.reinterpret_vec4(input, Shape::d2(n, n)).unwrap();
    let output_v = queue.reinterpret_vec4(output, Shape::d2(n, n)).unwrap();

    queue
        .submit(
            Kernel::TiledTranspose,
            ExecutionGrid::partitioned(Shape::d2(n, n), Shape::d2(tile, tile)),
            &[
                Binding::Read(input_v),
                Binding::Write(output_v),
                Binding::Local(Shape::d3(tile, tile, 4)),
            ],
        )
        .unwrap();
    queue.wait_all().unwrap();
    queue.take(output).unwrap()
}

fn check_transposed(result: &[f32], image: &[f32], n: usize) {
    for i in 0..n {
        for j in 0..n {
            for c in 0..4 {
                assert_eq!(
                    result[(i * n + j) * 4 + c],
                    image[(j * n + i) * 4 + c],
                    "pixel ({}, {}) channel {}",
                    i,
                    j,
                    c
                );
            }
        }
    }
}

#[test]
fn naive_transpose_swaps_pixels() {
    tesela_engine::set_silent_mode(true);
    let n = 8;
    let image = pixel_image(n);
    let result = run_naive(&image, n);
    check_transposed(&result, &image, n);
}

#[test]
fn tiled_transpose_small_grid() {
    tesela_engine::set_silent_mode(true);
    // 4x4 pixels in 2x2 tiles: crossing the tile boundary exercises
    // the group-coordinate swap, not just the in-tile swap.
    let n = 4;
    let image = pixel_image(n);
    let result = run_tiled(&image, n, 2);
    check_transposed(&result, &image, n);
}

#[test]
fn tiled_matches_naive() {
    tesela_engine::set_silent_mode(true);
    for (n, tile) in [(16usize, 4usize), (32, 8), (64, 16)] {
        let image = pixel_image(n);
        let naive = run_naive(&image, n);
        let tiled = run_tiled(&image, n, tile);
        assert_eq!(naive, tiled, "n={} tile={}", n, tile);
    }
}

#[test]
fn transpose_is_an_involution() {
    tesela_engine::set_silent_mode(true);
    let n = 16;
    let image = pixel_image(n);
    let once = run_tiled(&image, n, 4);
    let twice = run_tiled(&once, n, 4);
    assert_eq!(twice, image);
}

#[test]
fn whole_pixels_move_together() {
    tesela_engine::set_silent_mode(true);
    let n = 8;
    let image = pixel_image(n);
    let result = run_naive(&image, n);
    // Consecutive channels of one output pixel come from the same
    // source pixel in the original channel order.
    for p in 0..n * n {
        let base = result[p * 4] as usize;
        for c in 1..4 {
            assert_eq!(result[p * 4 + c], (base + c) as f32);
        }
    }
}
