/// Convolution filter generators for the image demos. Filters are
/// square, odd-width, RGBA weight stacks laid out (u, v, channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Center tap 1, everything else 0. Convolution becomes a copy
    /// away from the border, which makes it a good correctness probe.
    Identity,
    /// Box blur: every tap 1/(w*w).
    Blur,
    /// Discrete Laplacian-style edge filter.
    EdgeDetect,
}

pub struct Filter {
    pub data: Vec<f32>,
    pub width: usize,
    pub channels: usize,
}

impl Filter {
    pub fn len(&self) -> usize {
        self.width * self.width * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds a `width` x `width` x 4 filter. `width` must be odd.
/// Alpha weights follow identity regardless of kind, so output alpha
/// stays at the center pixel's alpha.
pub fn generate_filter(kind: FilterKind, width: usize) -> Filter {
    assert!(width % 2 == 1, "filter width must be odd");
    let channels = 4usize;
    let half = width / 2;
    let mut data = vec![0.0f32; width * width * channels];

    let mut set = |u: usize, v: usize, c: usize, w: f32| {
        data[(u * width + v) * channels + c] = w;
    };

    match kind {
        FilterKind::Identity => {
            for c in 0..channels {
                set(half, half, c, 1.0);
            }
        }
        FilterKind::Blur => {
            let w = 1.0 / (width * width) as f32;
            for u in 0..width {
                for v in 0..width {
                    for c in 0..3 {
                        set(u, v, c, w);
                    }
                }
            }
            set(half, half, 3, 1.0);
        }
        FilterKind::EdgeDetect => {
            for u in 0..width {
                for v in 0..width {
                    for c in 0..3 {
                        set(u, v, c, -1.0);
                    }
                }
            }
            let center = (width * width - 1) as f32;
            for c in 0..3 {
                set(half, half, c, center);
            }
            set(half, half, 3, 1.0);
        }
    }

    Filter {
        data,
        width,
        channels,
    }
}
