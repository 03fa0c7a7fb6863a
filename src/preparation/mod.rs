pub(crate) mod preparer;
pub(crate) mod strategy;
