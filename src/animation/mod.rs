pub(crate) mod information;
pub(crate) mod scheduler;
