pub(crate) mod canvas;
pub(crate) mod config;
pub(crate) mod events;
pub(crate) mod hibernation;
pub(crate) mod mailbox;
