pub(crate) mod context;
pub(crate) mod emulated;
pub(crate) mod registry;
