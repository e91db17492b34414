//! Media boundary: frames, pull-by-time streams, and the sources behind them.
//!
//! Everything the timeline consumes is reached through [`stream::VideoStream`] and
//! [`stream::AudioStream`]. Decoding from disk lives in [`decode`] and is the only place that does
//! IO.

pub(crate) mod audio;
pub(crate) mod decode;
pub(crate) mod frame;
pub(crate) mod source;
pub(crate) mod stream;
pub(crate) mod text;
