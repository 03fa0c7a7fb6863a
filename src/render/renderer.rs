use crate::buffer::bitmap::Bitmap;
use crate::foundation::core::{Bounds, Dimension};
use crate::foundation::error::ReelResult;

/// Rasterizes logical frames of one animation into caller-supplied buffers.
///
/// Shared between the draw path and the background preparer, so implementations must tolerate
/// concurrent `render_frame` calls on distinct target buffers.
pub trait FrameRenderer: Send + Sync {
    /// Render `frame` into `target`.
    ///
    /// `Ok(false)` reports a frame that could not be rendered (e.g. corrupt data); `Err(_)` reports
    /// an unexpected failure. Both leave `target` in an unspecified state.
    fn render_frame(&self, frame: usize, target: &mut Bitmap) -> ReelResult<bool>;

    /// Width the renderer wants its target buffers to have.
    fn intrinsic_width(&self) -> Dimension;

    /// Height the renderer wants its target buffers to have.
    fn intrinsic_height(&self) -> Dimension;

    /// Host bounds changed. Renderers that scale to the destination can react here.
    fn set_bounds(&self, _bounds: Option<Bounds>) {}
}
