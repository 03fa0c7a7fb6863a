pub(crate) mod frame_cache;
pub(crate) mod keep_last;
pub(crate) mod lru;
pub(crate) mod no_op;
