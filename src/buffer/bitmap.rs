use crate::foundation::core::PixelFormat;
use crate::foundation::error::{ReelError, ReelResult};

/// Mutable pixel buffer a frame is rendered into.
///
/// Row-major, tightly packed (`stride == width * bytes_per_pixel`).
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// Allocate a zeroed (fully transparent) bitmap.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> ReelResult<Self> {
        if width == 0 || height == 0 {
            return Err(ReelError::validation(format!(
                "bitmap dimensions must be > 0, got {width}x{height}"
            )));
        }
        let len = format.byte_len(width, height);
        if len > isize::MAX as usize {
            return Err(ReelError::allocation(format!(
                "bitmap {width}x{height} overflows addressable memory"
            )));
        }
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|e| {
            ReelError::allocation(format!("bitmap {width}x{height} ({len} bytes): {e}"))
        })?;
        pixels.resize(len, 0);
        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    /// Wrap existing pixel bytes.
    pub fn from_pixels(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> ReelResult<Self> {
        let expected = format.byte_len(width, height);
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(ReelError::validation(format!(
                "bitmap {width}x{height} {format:?} needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes held by the pixel store.
    pub fn size_in_bytes(&self) -> usize {
        self.pixels.len()
    }

    /// Return `true` when the bitmap has exactly the given size.
    pub fn has_size(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Raw pixel bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable raw pixel bytes.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Reset every pixel to transparent.
    pub fn erase(&mut self) {
        self.pixels.fill(0);
    }

    /// Fill the bitmap with one premultiplied RGBA color (alpha only for [`PixelFormat::Alpha8`]).
    pub fn fill_rgba(&mut self, rgba: [u8; 4]) {
        match self.format {
            PixelFormat::Rgba8Premul | PixelFormat::Rgba8 => {
                for px in self.pixels.chunks_exact_mut(4) {
                    px.copy_from_slice(&rgba);
                }
            }
            PixelFormat::Alpha8 => self.pixels.fill(rgba[3]),
        }
    }

    /// Pixel at `(x, y)` expanded to RGBA in the bitmap's own alpha convention.
    pub fn pixel_rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let i = (y as usize * self.width as usize + x as usize) * bpp;
        match self.format {
            PixelFormat::Rgba8Premul | PixelFormat::Rgba8 => {
                let p = &self.pixels[i..i + 4];
                Some([p[0], p[1], p[2], p[3]])
            }
            PixelFormat::Alpha8 => Some([0, 0, 0, self.pixels[i]]),
        }
    }

    /// Convert into a straight-alpha [`image::RgbaImage`] (for PNG export and debugging).
    pub fn to_rgba_image(&self) -> ReelResult<image::RgbaImage> {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        match self.format {
            PixelFormat::Rgba8 => data.extend_from_slice(&self.pixels),
            PixelFormat::Rgba8Premul => {
                for px in self.pixels.chunks_exact(4) {
                    data.extend_from_slice(&unpremultiply([px[0], px[1], px[2], px[3]]));
                }
            }
            PixelFormat::Alpha8 => {
                for &a in &self.pixels {
                    data.extend_from_slice(&[0, 0, 0, a]);
                }
            }
        }
        image::RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| ReelError::validation("bitmap pixel store does not match its size"))
    }
}

fn unpremultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let a16 = u16::from(a);
    let un = |c: u8| -> u8 { ((u16::from(c) * 255 + a16 / 2) / a16).min(255) as u8 };
    [un(r), un(g), un(b), a]
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/buffer/bitmap.rs"]
mod tests;
