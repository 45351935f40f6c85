//! Gateway message handlers, split by area.

pub(crate) mod files;
pub(crate) mod terminal;
