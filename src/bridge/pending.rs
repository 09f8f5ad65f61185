use std::collections::VecDeque;

/// Queued bytes would exceed the per-connection cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("pending writes would exceed {limit} bytes")]
pub struct WriteOverflow {
    pub limit: usize,
}

/// Frames waiting for the outbound socket, bounded by total size.
#[derive(Debug)]
pub struct PendingWrites {
    queue: VecDeque<Vec<u8>>,
    offset: usize,
    queued: usize,
    limit: usize,
}

impl PendingWrites {
    pub fn new(limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            offset: 0,
            queued: 0,
            limit,
        }
    }

    /// Queue a whole frame, or refuse it if the cap would be crossed.
    pub fn push(&mut self, frame: Vec<u8>) -> Result<(), WriteOverflow> {
        if self.queued + frame.len() > self.limit {
            return Err(WriteOverflow { limit: self.limit });
        }
        self.queued += frame.len();
        self.queue.push_back(frame);
        Ok(())
    }

    /// Unwritten bytes of the oldest frame.
    pub fn front(&self) -> &[u8] {
        self.queue
            .front()
            .map(|frame| &frame[self.offset..])
            .unwrap_or(&[])
    }

    /// Record that `n` bytes of the front frame reached the socket.
    pub fn advance(&mut self, n: usize) {
        self.offset += n;
        self.queued -= n;
        if let Some(front) = self.queue.front() {
            if self.offset >= front.len() {
                self.queue.pop_front();
                self.offset = 0;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queued_bytes(&self) -> usize {
        self.queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_writes_advance_through_frames() {
        let mut pending = PendingWrites::new(16);
        pending.push(b"abc\n".to_vec()).unwrap();
        pending.push(b"de\n".to_vec()).unwrap();
        assert_eq!(pending.queued_bytes(), 7);

        pending.advance(2);
        assert_eq!(pending.front(), b"c\n");
        pending.advance(2);
        assert_eq!(pending.front(), b"de\n");
        pending.advance(3);
        assert!(pending.is_empty());
        assert_eq!(pending.queued_bytes(), 0);
    }

    #[test]
    fn refuses_frames_past_the_cap() {
        let mut pending = PendingWrites::new(4);
        pending.push(b"abc".to_vec()).unwrap();
        assert_eq!(pending.push(b"de".to_vec()), Err(WriteOverflow { limit: 4 }));
        assert_eq!(pending.queued_bytes(), 3);
    }
}
