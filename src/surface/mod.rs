pub(crate) mod backing;
pub(crate) mod factory;
pub(crate) mod image;
