use crate::server::stomp::error::FrameError;

/// Collects WebSocket fragments until the final one arrives.
///
/// The buffer never grows past its capacity: a message that would not fit is
/// rejected and the partial data discarded.
#[derive(Debug)]
pub struct FrameAccumulator {
    buffer: Vec<u8>,
    capacity: usize,
}

impl FrameAccumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::new(),
            capacity,
        }
    }

    /// Append a non-final fragment.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), FrameError> {
        if self.buffer.len() + chunk.len() > self.capacity {
            self.buffer.clear();
            return Err(FrameError::FrameTooLarge { limit: self.capacity });
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// Append the final fragment and hand back the whole message, leaving the accumulator empty.
    pub fn finish(&mut self, chunk: &[u8]) -> Result<Vec<u8>, FrameError> {
        self.push(chunk)?;
        Ok(std::mem::take(&mut self.buffer))
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
