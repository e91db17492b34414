//! Aspect-ratio fitting and placement of visual nodes on the canvas.

pub(crate) mod fit;
