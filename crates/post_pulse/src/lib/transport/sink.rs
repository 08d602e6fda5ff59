use std::future::Future;

use tokio::sync::mpsc;

use crate::{
    error::{Error, Result},
    transport::Frame,
};

/// Destination for frames produced by a pipeline run.
///
/// The pipeline does not know whether it is being streamed or batched; it only
/// emits into a sink.
pub trait FrameSink {
    /// Delivers one frame. An error means the consumer is gone.
    fn emit(&mut self, frame: Frame) -> impl Future<Output = Result<()>> + Send;
}

impl<S: FrameSink + Send> FrameSink for &mut S {
    async fn emit(&mut self, frame: Frame) -> Result<()> {
        (**self).emit(frame).await
    }
}

/// Forwards frames to a streaming response as they are produced
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Frame>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Frame>) -> Self {
        ChannelSink { tx }
    }
}

impl FrameSink for ChannelSink {
    async fn emit(&mut self, frame: Frame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| Error::Transport("client disconnected".into()))
    }
}

/// Collects every frame for the batch response
#[derive(Debug, Default)]
pub struct BufferSink {
    frames: Vec<Frame>,
}

impl BufferSink {
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

impl FrameSink for BufferSink {
    async fn emit(&mut self, frame: Frame) -> Result<()> {
        self.frames.push(frame);
        Ok(())
    }
}

/// Hands each frame to a callback; the callback's error stops the run
pub struct CallbackSink<F> {
    callback: F,
}

impl<F> CallbackSink<F>
where
    F: FnMut(&Frame) -> Result<()> + Send,
{
    pub fn new(callback: F) -> Self {
        CallbackSink { callback }
    }
}

impl<F> FrameSink for CallbackSink<F>
where
    F: FnMut(&Frame) -> Result<()> + Send,
{
    async fn emit(&mut self, frame: Frame) -> Result<()> {
        (self.callback)(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RunStatus;

    #[tokio::test]
    async fn test_channel_sink_fails_after_receiver_drop() {
        let (tx, rx) = mpsc::channel(4);
        let mut sink = ChannelSink::new(tx);
        sink.emit(Frame::status(RunStatus::Extracting, 0, "hi"))
            .await
            .unwrap();
        drop(rx);
        let result = sink.emit(Frame::status(RunStatus::Extracting, 5, "again")).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_buffer_sink_through_mut_ref() {
        let mut sink = BufferSink::default();
        {
            let mut by_ref = &mut sink;
            by_ref
                .emit(Frame::status(RunStatus::Extracting, 0, "one"))
                .await
                .unwrap();
        }
        assert_eq!(sink.frames().len(), 1);
    }

    #[tokio::test]
    async fn test_callback_sink_propagates_error() {
        let mut seen = 0;
        let mut sink = CallbackSink::new(|_frame: &Frame| {
            seen += 1;
            Err(Error::Transport("stdout closed".into()))
        });
        let result = sink.emit(Frame::status(RunStatus::Extracting, 0, "x")).await;
        assert!(result.is_err());
        drop(sink);
        assert_eq!(seen, 1);
    }
}
