pub(crate) mod owned;
pub(crate) mod shared;
