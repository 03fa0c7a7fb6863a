pub(crate) mod allocator;
pub(crate) mod bitmap;
