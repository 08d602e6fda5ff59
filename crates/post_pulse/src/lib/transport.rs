//! # Event transport
//!
//! Frames, their Server-Sent Events wire format, and the sinks a pipeline run
//! emits into.

mod batch;
mod frame;
pub mod sink;
pub mod sse;

pub use batch::{BatchResponse, PlatformPosts};
pub use frame::Frame;
pub use sink::{BufferSink, CallbackSink, ChannelSink, FrameSink};
pub use sse::{encode_frame, FrameDecoder};
