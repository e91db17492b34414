//! JSON project files: media declarations, nodes and tracks, loaded into a timeline graph.

pub(crate) mod load;
pub(crate) mod model;
