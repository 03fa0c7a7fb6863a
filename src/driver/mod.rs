pub(crate) mod animation_driver;
pub(crate) mod listener;
