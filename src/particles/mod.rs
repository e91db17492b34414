//! Particle assembly: split a rendered clip's coverage into connected fragments and fly each
//! one back to its rest position along a damped spiral.

pub(crate) mod assemble;
pub(crate) mod motion;
pub(crate) mod segment;
