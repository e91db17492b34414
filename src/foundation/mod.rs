//! Value types, error taxonomy and fixed-point helpers shared by every stage.

pub(crate) mod core;
pub(crate) mod error;
pub(crate) mod math;
