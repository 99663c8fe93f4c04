use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use rand::Rng;

/// RGBA f32 image in row-major (row, column, channel) layout, the host
/// side of the convolution and transpose demos.
#[derive(Debug)]
pub struct HostImage {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl HostImage {
    pub fn len(&self) -> usize {
        self.height * self.width * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Upper bound on accepted pixel counts (64M pixels, 1 GiB as RGBA f32).
const MAX_PIXELS: usize = 1 << 26;

#[derive(Debug)]
pub enum ImageError {
    Io(std::io::Error),
    Format(String),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Io(e) => write!(f, "image i/o error: {}", e),
            ImageError::Format(msg) => write!(f, "bad image format: {}", msg),
        }
    }
}

impl std::error::Error for ImageError {}

impl From<std::io::Error> for ImageError {
    fn from(e: std::io::Error) -> Self {
        ImageError::Io(e)
    }
}

fn next_token(bytes: &[u8], pos: &mut usize) -> Result<String, ImageError> {
    // PPM allows '#' comments anywhere between header tokens.
    loop {
        while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
            *pos += 1;
        }
        if *pos < bytes.len() && bytes[*pos] == b'#' {
            while *pos < bytes.len() && bytes[*pos] != b'\n' {
                *pos += 1;
            }
            continue;
        }
        break;
    }
    let start = *pos;
    while *pos < bytes.len() && !bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    if start == *pos {
        return Err(ImageError::Format("truncated header".to_string()));
    }
    Ok(String::from_utf8_lossy(&bytes[start..*pos]).into_owned())
}

/// Loads a binary PPM (P6) file as RGBA: the alpha channel is padded
/// with 255 so kernels always see 4 channels per pixel.
pub fn read_image(path: &Path) -> Result<HostImage, ImageError> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;

    let mut pos = 0usize;
    let magic = next_token(&bytes, &mut pos)?;
    if magic != "P6" {
        return Err(ImageError::Format(format!("expected P6, got {:?}", magic)));
    }
    let width: usize = next_token(&bytes, &mut pos)?
        .parse()
        .map_err(|_| ImageError::Format("bad width".to_string()))?;
    let height: usize = next_token(&bytes, &mut pos)?
        .parse()
        .map_err(|_| ImageError::Format("bad height".to_string()))?;
    let maxval: usize = next_token(&bytes, &mut pos)?
        .parse()
        .map_err(|_| ImageError::Format("bad maxval".to_string()))?;
    if maxval != 255 {
        return Err(ImageError::Format(format!(
            "only maxval 255 is supported, got {}",
            maxval
        )));
    }
    // Exactly one whitespace byte separates the header from the raster.
    pos += 1;

    // Header dimensions are untrusted; size math must not overflow and
    // absurd extents are rejected before any allocation.
    let pixels = width
        .checked_mul(height)
        .filter(|&p| p > 0 && p <= MAX_PIXELS)
        .ok_or_else(|| {
            ImageError::Format(format!("unsupported dimensions {}x{}", width, height))
        })?;
    let expected = pixels * 3;
    let end = pos
        .checked_add(expected)
        .ok_or_else(|| ImageError::Format("truncated pixel data".to_string()))?;
    let raster = bytes
        .get(pos..end)
        .ok_or_else(|| ImageError::Format("truncated pixel data".to_string()))?;

    let mut data = Vec::with_capacity(pixels * 4);
    for px in raster.chunks_exact(3) {
        data.push(px[0] as f32);
        data.push(px[1] as f32);
        data.push(px[2] as f32);
        data.push(255.0);
    }

    Ok(HostImage {
        data,
        width,
        height,
        channels: 4,
    })
}

/// Writes an RGBA image as binary PPM (P6), dropping alpha and
/// clamping channel values into 0..=255.
pub fn write_image(path: &Path, image: &HostImage) -> Result<(), ImageError> {
    if image.channels != 4 {
        return Err(ImageError::Format(format!(
            "expected 4 channels, got {}",
            image.channels
        )));
    }
    if image.data.len() != image.len() {
        return Err(ImageError::Format("pixel data length mismatch".to_string()));
    }

    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P6\n{} {}\n255\n", image.width, image.height)?;
    let mut raster = Vec::with_capacity(image.height * image.width * 3);
    for px in image.data.chunks_exact(4) {
        for &v in &px[..3] {
            raster.push(v.clamp(0.0, 255.0).round() as u8);
        }
    }
    out.write_all(&raster)?;
    out.flush()?;
    Ok(())
}

/// Deterministic-looking test image: a diagonal gradient with noise,
/// enough structure that convolution and transpose results are easy to
/// eyeball.
pub fn synthetic_image(width: usize, height: usize) -> HostImage {
    let mut rng = rand::thread_rng();
    let mut data = Vec::with_capacity(height * width * 4);
    for i in 0..height {
        for j in 0..width {
            let gradient = 255.0 * (i + j) as f32 / (height + width).max(1) as f32;
            for _ in 0..3 {
                let noise: f32 = rng.gen_range(-24.0..24.0);
                data.push((gradient + noise).clamp(0.0, 255.0));
            }
            data.push(255.0);
        }
    }
    HostImage {
        data,
        width,
        height,
        channels: 4,
    }
}

/// Crops an image so both extents divide the tile size. Needed before
/// launching a partitioned grid over the pixels.
pub fn crop_to_multiple(image: &HostImage, tile: usize) -> HostImage {
    let height = (image.height / tile) * tile;
    let width = (image.width / tile) * tile;
    let mut data = Vec::with_capacity(height * width * image.channels);
    for i in 0..height {
        let row = i * image.width * image.channels;
        data.extend_from_slice(&image.data[row..row + width * image.channels]);
    }
    HostImage {
        data,
        width,
        height,
        channels: image.channels,
    }
}
