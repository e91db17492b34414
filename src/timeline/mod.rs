//! Declared elements, their relative time references, and the pass that turns them into absolute
//! spans.

pub(crate) mod graph;
pub(crate) mod node;
pub(crate) mod resolve;
pub(crate) mod tracks;
