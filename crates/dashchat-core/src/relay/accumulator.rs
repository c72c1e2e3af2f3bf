//! Assistant text accumulation.

use dashchat_types::upstream::CompletionChunk;

/// Collects the text deltas of one exchange.
///
/// Interpreting a payload is independent of forwarding it: a payload that
/// fails to parse is simply not absorbed.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    text: String,
    frames_absorbed: usize,
    frames_skipped: usize,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to read text fragments out of one `data:` payload.
    ///
    /// Returns `false` when the payload is not a structured delta.
    pub fn absorb(&mut self, payload: &[u8]) -> bool {
        match serde_json::from_slice::<CompletionChunk>(payload) {
            Ok(chunk) => {
                for fragment in chunk.text_fragments() {
                    self.text.push_str(fragment);
                }
                self.frames_absorbed += 1;
                true
            }
            Err(_) => {
                self.frames_skipped += 1;
                false
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn frames_skipped(&self) -> usize {
        self.frames_skipped
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenates_fragments_in_order() {
        let mut acc = ResponseAccumulator::new();
        assert!(acc.absorb(br#"{"choices":[{"delta":{"content":"Hel"}}]}"#));
        assert!(acc.absorb(br#"{"choices":[{"delta":{"role":"assistant"}}]}"#));
        assert!(acc.absorb(br#"{"choices":[{"delta":{"content":"lo"}}]}"#));
        assert_eq!(acc.text(), "Hello");
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        let mut acc = ResponseAccumulator::new();
        assert!(!acc.absorb(b"{not json"));
        assert!(acc.absorb(br#"{"choices":[{"delta":{"content":"ok"}}]}"#));
        assert_eq!(acc.text(), "ok");
        assert_eq!(acc.frames_skipped(), 1);
    }

    #[test]
    fn test_empty_until_text_arrives() {
        let mut acc = ResponseAccumulator::new();
        acc.absorb(br#"{"choices":[]}"#);
        assert!(acc.is_empty());
        assert_eq!(acc.into_text(), "");
    }
}
