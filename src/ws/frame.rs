use super::error::SocketError;

/// Reassembles the text frames of one logical message.
///
/// Frames are appended in arrival order until the final fragment, at which
/// point the completed payload is handed out and the buffer resets. The
/// accumulated size is bounded; exceeding the bound is treated as an abnormal
/// closure by the receive loop.
#[derive(Debug)]
pub(crate) struct FrameAccumulator {
    buffer: String,
    max_bytes: usize,
}

impl FrameAccumulator {
    pub(crate) fn new(max_bytes: usize) -> Self {
        Self {
            buffer: String::new(),
            max_bytes,
        }
    }

    /// Append one frame. Returns the completed payload when `fin` marks the
    /// final fragment, or `None` while the message is still being assembled.
    pub(crate) fn push(
        &mut self,
        chunk: &str,
        fin: bool,
    ) -> Result<Option<String>, SocketError> {
        self.buffer.push_str(chunk);
        if self.buffer.len() > self.max_bytes {
            let size = self.buffer.len();
            self.buffer = String::new();
            return Err(SocketError::MessageTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        if fin {
            return Ok(Some(std::mem::take(&mut self.buffer)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_message() {
        let mut acc = FrameAccumulator::new(1024);
        let payload = acc.push("hello", true).expect("within bounds");
        assert_eq!(payload.as_deref(), Some("hello"));
    }

    #[test]
    fn fragments_concatenate_in_arrival_order() {
        let mut acc = FrameAccumulator::new(1024);
        assert!(acc.push("{\"type\":", false).expect("ok").is_none());
        assert!(acc.push("\"hello\"", false).expect("ok").is_none());
        let payload = acc.push("}", true).expect("ok");
        assert_eq!(payload.as_deref(), Some("{\"type\":\"hello\"}"));
    }

    #[test]
    fn buffer_resets_between_messages() {
        let mut acc = FrameAccumulator::new(1024);
        assert_eq!(acc.push("one", true).expect("ok").as_deref(), Some("one"));
        assert_eq!(acc.push("two", true).expect("ok").as_deref(), Some("two"));
    }

    #[test]
    fn exceeding_limit_before_final_fragment_fails() {
        let mut acc = FrameAccumulator::new(8);
        assert!(acc.push("12345", false).expect("ok").is_none());
        let error = acc.push("67890", false).expect_err("over the limit");
        assert!(matches!(
            error,
            SocketError::MessageTooLarge { size: 10, limit: 8 }
        ));
    }

    #[test]
    fn exceeding_limit_on_final_fragment_emits_nothing() {
        let mut acc = FrameAccumulator::new(4);
        let error = acc.push("12345", true).expect_err("over the limit");
        assert!(matches!(error, SocketError::MessageTooLarge { .. }));
    }

    #[test]
    fn accumulator_is_usable_after_overflow() {
        let mut acc = FrameAccumulator::new(4);
        let _ = acc.push("12345", true).expect_err("over the limit");
        assert_eq!(acc.push("ok", true).expect("ok").as_deref(), Some("ok"));
    }
}
