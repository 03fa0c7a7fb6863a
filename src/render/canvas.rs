use crate::buffer::bitmap::Bitmap;
use crate::foundation::core::Bounds;

/// Host drawing surface a frame is finally drawn onto.
pub trait Canvas {
    /// Draw `bitmap`, scaled into `dst` when given, at the origin otherwise.
    fn draw_bitmap(&mut self, bitmap: &Bitmap, dst: Option<Bounds>);
}

/// One recorded [`Canvas::draw_bitmap`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawRecord {
    /// Width of the drawn bitmap.
    pub width: u32,
    /// Height of the drawn bitmap.
    pub height: u32,
    /// Destination passed by the caller.
    pub dst: Option<Bounds>,
    /// First pixel of the bitmap, handy for telling frames apart.
    pub first_pixel: [u8; 4],
}

/// [`Canvas`] that records draw calls and optionally keeps a copy of the last bitmap drawn.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    draws: Vec<DrawRecord>,
    keep_last: bool,
    last: Option<Bitmap>,
}

impl RecordingCanvas {
    /// A canvas that only records draw calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// A canvas that also copies the pixels of the most recent draw.
    pub fn keeping_last_bitmap() -> Self {
        Self {
            keep_last: true,
            ..Self::default()
        }
    }

    /// Draw calls in order.
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Copy of the most recently drawn bitmap, if kept.
    pub fn last_bitmap(&self) -> Option<&Bitmap> {
        self.last.as_ref()
    }
}

impl Canvas for RecordingCanvas {
    fn draw_bitmap(&mut self, bitmap: &Bitmap, dst: Option<Bounds>) {
        self.draws.push(DrawRecord {
            width: bitmap.width(),
            height: bitmap.height(),
            dst,
            first_pixel: bitmap.pixel_rgba(0, 0).unwrap_or_default(),
        });
        if self.keep_last {
            self.last = Some(bitmap.clone());
        }
    }
}
