//! Line framing for the `data: ...` stream protocol.
//!
//! Upstream bodies arrive as arbitrary byte chunks. [`LineDecoder`] turns
//! them into complete lines without ever re-encoding the bytes, so whatever
//! the upstream sent is exactly what gets forwarded.

use bytes::Bytes;

/// Prefix marking a payload-carrying line.
pub const DATA_PREFIX: &[u8] = b"data:";

/// Payload that terminates a stream.
pub const DONE_SENTINEL: &[u8] = b"[DONE]";

/// What one upstream line means to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Structural separator between frames.
    Blank,
    /// `data: [DONE]`.
    Done,
    /// `data: <payload>`; the payload may or may not be valid JSON.
    Data(&'a [u8]),
    /// Comments, `event:`/`id:` fields, and anything else.
    Other,
}

/// Classify a line with its terminator already removed.
pub fn classify(line: &[u8]) -> LineKind<'_> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return LineKind::Blank;
    }
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return LineKind::Other;
    };
    let payload = rest.strip_prefix(b" ").unwrap_or(rest);
    if payload.trim_ascii() == DONE_SENTINEL {
        LineKind::Done
    } else {
        LineKind::Data(payload)
    }
}

/// Splits a byte stream into `\n`-terminated lines.
///
/// A trailing `\r` is stripped so `\r\n` bodies decode the same as `\n`
/// bodies. Bytes after the last newline are held until more data arrives
/// or [`LineDecoder::finish`] is called.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            lines.push(strip_cr(std::mem::take(&mut self.pending)));
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
        lines
    }

    /// Flush a final unterminated line, if any.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(strip_cr(std::mem::take(&mut self.pending)))
        }
    }
}

fn strip_cr(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}

/// A line forwarded to the client verbatim, terminated as one frame.
pub fn forward_frame(line: &[u8]) -> Bytes {
    let mut frame = Vec::with_capacity(line.len() + 2);
    frame.extend_from_slice(line);
    frame.extend_from_slice(b"\n\n");
    Bytes::from(frame)
}

/// The termination frame; always the last frame a client sees.
pub fn done_frame() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}

/// A synthetic in-band error frame.
pub fn error_frame(message: &str) -> Bytes {
    let payload = serde_json::json!({ "error": message });
    Bytes::from(format!("data: {payload}\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(b""), LineKind::Blank);
        assert_eq!(classify(b"  "), LineKind::Blank);
        assert_eq!(classify(b"data: [DONE]"), LineKind::Done);
        assert_eq!(classify(b"data:[DONE]"), LineKind::Done);
        assert_eq!(classify(b"data: {\"a\":1}"), LineKind::Data(b"{\"a\":1}"));
        assert_eq!(classify(b"data: not json"), LineKind::Data(b"not json"));
        assert_eq!(classify(b": keep-alive"), LineKind::Other);
        assert_eq!(classify(b"event: message"), LineKind::Other);
    }

    #[test]
    fn test_decoder_reassembles_split_lines() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"data: {\"choi").is_empty());
        let lines = decoder.push(b"ces\":[]}\n\ndata: [DO");
        assert_eq!(lines, vec![b"data: {\"choices\":[]}".to_vec(), Vec::new()]);
        let lines = decoder.push(b"NE]\n");
        assert_eq!(lines, vec![b"data: [DONE]".to_vec()]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_decoder_handles_crlf() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"data: a\r\n\r\ndata: b\r\n");
        assert_eq!(lines, vec![b"data: a".to_vec(), Vec::new(), b"data: b".to_vec()]);
    }

    #[test]
    fn test_decoder_keeps_multibyte_characters_intact() {
        let text = "data: {\"choices\":[{\"delta\":{\"content\":\"héllo\"}}]}\n";
        let bytes = text.as_bytes();
        // Split in the middle of the two-byte 'é'.
        let split = text.find('é').unwrap() + 1;
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&bytes[..split]).is_empty());
        let lines = decoder.push(&bytes[split..]);
        assert_eq!(lines[0], text.trim_end().as_bytes());
    }

    #[test]
    fn test_decoder_finish_flushes_tail() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), Some(b"data: [DONE]".to_vec()));
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_frames() {
        assert_eq!(&forward_frame(b"data: x")[..], b"data: x\n\n");
        assert_eq!(&done_frame()[..], b"data: [DONE]\n\n");
        assert_eq!(
            &error_frame("Upstream error: 502")[..],
            b"data: {\"error\":\"Upstream error: 502\"}\n\n"
        );
    }
}
