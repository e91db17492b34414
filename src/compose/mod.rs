//! Layered video composition and additive audio mixing.

pub(crate) mod audio;
pub(crate) mod blend;
pub(crate) mod video;
