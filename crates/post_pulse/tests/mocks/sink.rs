use std::sync::{Arc, Mutex};

use post_pulse::{transport::FrameSink, Error, Frame, Result};

/// Sink that accepts frames until a predicate says the client is gone
#[derive(Clone)]
pub struct FailingSink {
    pub frames: Arc<Mutex<Vec<Frame>>>,
    pub attempts: Arc<Mutex<usize>>,
    disconnect_after: fn(&Frame) -> bool,
    disconnected: bool,
}

impl FailingSink {
    /// Disconnects once the first frame has been delivered
    pub fn after_first_frame() -> Self {
        Self::new(|_| true)
    }

    /// Disconnects once the first post frame has been delivered
    pub fn after_first_post() -> Self {
        Self::new(|frame| matches!(frame, Frame::Post { .. }))
    }

    fn new(disconnect_after: fn(&Frame) -> bool) -> Self {
        Self {
            frames: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(Mutex::new(0)),
            disconnect_after,
            disconnected: false,
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl FrameSink for FailingSink {
    async fn emit(&mut self, frame: Frame) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if self.disconnected {
            return Err(Error::Transport("client disconnected".into()));
        }
        self.disconnected = (self.disconnect_after)(&frame);
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }
}
