//! Render sessions: the barrier between a resolved timeline and produced frames, plus the sinks
//! frames are streamed into.

pub(crate) mod ffmpeg;
pub(crate) mod nested;
pub(crate) mod session;
pub(crate) mod sink;
