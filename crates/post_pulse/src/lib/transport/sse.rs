//! Server-Sent Events framing: `event: <type>\ndata: <json>\n\n` per frame.

use crate::{error::Error, transport::Frame};

/// Encodes `frame` as one SSE event
pub fn encode_frame(frame: &Frame) -> Result<String, serde_json::Error> {
    // serde_json escapes newlines, so data always fits on one line
    let data = serde_json::to_string(frame)?;
    Ok(format!("event: {}\ndata: {}\n\n", frame.event_name(), data))
}

/// Incremental SSE decoder.
///
/// Accepts arbitrary byte chunks (split anywhere, including inside a UTF-8
/// sequence) and yields frames as soon as their terminating blank line arrives.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `chunk`, returning every frame it completed
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, Error> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.drain(..=pos).collect::<Vec<_>>();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if line.is_empty() {
                if let Some(frame) = self.dispatch()? {
                    frames.push(frame);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                // id, retry and unknown fields carry nothing we use
                _ => {}
            }
        }

        Ok(frames)
    }

    /// Flushes an event left unterminated at end of stream
    pub fn finish(mut self) -> Result<Option<Frame>, Error> {
        if !self.buf.is_empty() {
            self.push(b"\n")?;
        }
        self.dispatch()
    }

    fn dispatch(&mut self) -> Result<Option<Frame>, Error> {
        let event = self.event.take();
        let data = std::mem::take(&mut self.data);
        if data.is_empty() {
            return Ok(None);
        }

        if let Some(name) = event.as_deref() {
            if name != "message" && !Frame::EVENT_NAMES.contains(&name) {
                tracing::debug!(event = name, "Skipping unknown event");
                return Ok(None);
            }
        }

        serde_json::from_str::<Frame>(&data.join("\n"))
            .map(Some)
            .inspect_err(|e| tracing::error!(error = %e, "Malformed frame payload"))
            .map_err(|_| Error::ParseError("Malformed frame payload in event stream"))
    }
}
