use tesela_engine::error::ConfigError;
use tesela_engine::filter::{generate_filter, Filter, FilterKind};
use tesela_engine::{Binding, ExecutionGrid, Kernel, Queue, Shape};

fn gradient_image(height: usize, width: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(height * width * 4);
    for i in 0..height {
        for j in 0..width {
            for c in 0..4 {
                data.push(((i * 7 + j * 3 + c * 11) % 251) as f32);
            }
        }
    }
    data
}

/// Host-side reference with the same footprint, border policy and
/// summation order as the device kernels.
fn reference_convolution(
    image: &[f32],
    height: usize,
    width: usize,
    filter: &Filter,
) -> Vec<f32> {
    let fw = filter.width;
    let k = fw / 2;
    let mut out = vec![0.0f32; height * width * 4];
    for gi in 0..height {
        for gj in 0..width {
            let mut sum = [0.0f32; 4];
            if !(gi < k || gi + k >= height || gj < k || gj + k >= width) {
                for u in 0..fw {
                    for v in 0..fw {
                        let ii = gi + u - k;
                        let jj = gj + v - k;
                        for (c, slot) in sum.iter_mut().enumerate() {
                            *slot += image[(ii * width + jj) * 4 + c]
                                * filter.data[(u * fw + v) * 4 + c];
                        }
                    }
                }
            }
            for (c, &val) in sum.iter().enumerate() {
                out[(gi * width + gj) * 4 + c] = val;
            }
        }
    }
    out
}

fn run_direct(image: &[f32], height: usize, width: usize, filter: &Filter) -> Vec<f32> {
    let queue = Queue::new();
    let shape = Shape::d3(height, width, 4);
    let input = queue.create_buffer(image, shape.clone()).unwrap();
    let output = queue.create_uninit(shape).unwrap();
    let weights = queue
        .create_buffer(&filter.data, Shape::d3(filter.width, filter.width, 4))
        .unwrap();
    queue
        .submit(
            Kernel::ImageConvolution {
                filter_width: filter.width,
            },
            ExecutionGrid::new(Shape::d2(height, width)),
            &[
                Binding::Read(input),
                Binding::Write(output),
                Binding::Read(weights),
            ],
        )
        .unwrap();
    queue.wait_all().unwrap();
    queue.take(output).unwrap()
}

fn run_local(
    image: &[f32],
    height: usize,
    width: usize,
    filter: &Filter,
    tile: usize,
) -> Vec<f32> {
    let queue = Queue::new();
    let shape = Shape::d3(height, width, 4);
    let input = queue.create_buffer(image, shape.clone()).unwrap();
    let output = queue.create_uninit(shape).unwrap();
    let weights = queue
        .create_buffer(&filter.data, Shape::d3(filter.width, filter.width, 4))
        .unwrap();
    queue
        .submit(
            Kernel::ImageConvolutionLocal {
                filter_width: filter.width,
            },
            ExecutionGrid::partitioned(Shape::d2(height, width), Shape::d2(tile, tile)),
            &[
                Binding::Read(input),
                Binding::Write(output),
                Binding::Read(weights),
                Binding::Local(Shape::d3(filter.width, filter.width, 4)),
            ],
        )
        .unwrap();
    queue.wait_all().unwrap();
    queue.take(output).unwrap()
}

#[test]
fn direct_matches_host_reference() {
    tesela_engine::set_silent_mode(true);
    let (h, w) = (24, 32);
    let image = gradient_image(h, w);
    let filter = generate_filter(FilterKind::Blur, 5);

    let device = run_direct(&image, h, w, &filter);
    let host = reference_convolution(&image, h, w, &filter);
    assert_eq!(device, host);
}

#[test]
fn local_staging_matches_direct_bit_for_bit() {
    tesela_engine::set_silent_mode(true);
    let (h, w) = (32, 32);
    let image = gradient_image(h, w);

    for (fw, tile) in [(3usize, 4usize), (11, 16)] {
        let filter = generate_filter(FilterKind::Blur, fw);
        let direct = run_direct(&image, h, w, &filter);
        let local = run_local(&image, h, w, &filter, tile);
        assert_eq!(direct, local, "fw={} tile={}", fw, tile);
    }
}

#[test]
fn border_pixels_are_zeroed() {
    tesela_engine::set_silent_mode(true);
    let (h, w) = (16, 16);
    let image = gradient_image(h, w);
    let filter = generate_filter(FilterKind::Blur, 5);
    let out = run_direct(&image, h, w, &filter);

    let k = filter.width / 2;
    for i in 0..h {
        for j in 0..w {
            let border = i < k || i + k >= h || j < k || j + k >= w;
            if border {
                for c in 0..4 {
                    assert_eq!(out[(i * w + j) * 4 + c], 0.0, "border ({}, {})", i, j);
                }
            }
        }
    }
    // Interior of a blur of a non-zero image is non-zero.
    assert!(out[(8 * w + 8) * 4] > 0.0);
}

#[test]
fn identity_filter_copies_the_interior() {
    tesela_engine::set_silent_mode(true);
    let (h, w) = (16, 16);
    let image = gradient_image(h, w);
    let filter = generate_filter(FilterKind::Identity, 3);
    let out = run_direct(&image, h, w, &filter);

    for i in 1..h - 1 {
        for j in 1..w - 1 {
            for c in 0..4 {
                assert_eq!(out[(i * w + j) * 4 + c], image[(i * w + j) * 4 + c]);
            }
        }
    }
}

#[test]
fn tile_smaller_than_filter_is_rejected() {
    tesela_engine::set_silent_mode(true);
    let (h, w) = (32, 32);
    let image = gradient_image(h, w);
    let filter = generate_filter(FilterKind::Blur, 11);

    let queue = Queue::new();
    let shape = Shape::d3(h, w, 4);
    let input = queue.create_buffer(&image, shape.clone()).unwrap();
    let output = queue.create_uninit(shape).unwrap();
    let weights = queue
        .create_buffer(&filter.data, Shape::d3(11, 11, 4))
        .unwrap();

    // An 8x8 tile cannot stage an 11-wide filter: only local ids
    // below the tile edge ever run the staging branch.
    let err = queue
        .submit(
            Kernel::ImageConvolutionLocal { filter_width: 11 },
            ExecutionGrid::partitioned(Shape::d2(h, w), Shape::d2(8, 8)),
            &[
                Binding::Read(input),
                Binding::Write(output),
                Binding::Read(weights),
                Binding::Local(Shape::d3(11, 11, 4)),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, ConfigError::KernelShape { .. }), "{:?}", err);
}

#[test]
fn even_filter_width_is_rejected() {
    tesela_engine::set_silent_mode(true);
    let (h, w) = (16, 16);
    let image = gradient_image(h, w);

    let queue = Queue::new();
    let shape = Shape::d3(h, w, 4);
    let input = queue.create_buffer(&image, shape.clone()).unwrap();
    let output = queue.create_uninit(shape).unwrap();
    let weights = queue
        .create_buffer(&vec![0.25f32; 2 * 2 * 4], Shape::d3(2, 2, 4))
        .unwrap();

    let err = queue
        .submit(
            Kernel::ImageConvolution { filter_width: 2 },
            ExecutionGrid::new(Shape::d2(h, w)),
            &[
                Binding::Read(input),
                Binding::Write(output),
                Binding::Read(weights),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, ConfigError::KernelShape { .. }));
}
