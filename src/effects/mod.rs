//! Per-node effect chains.
//!
//! Effects are immutable descriptions. Materializing a chain wraps the node's shared source
//! streams in lazy adapters, so one loaded source can back any number of differently effected
//! nodes and frames can be pulled from any worker.

pub(crate) mod audio;
pub(crate) mod chain;
pub(crate) mod color;
pub(crate) mod geometry;
pub(crate) mod spec;
pub(crate) mod video;
