//! STOMP frame parsing and serialization.
//!
//! A frame is a verb line, up to `MAX_HEADERS` `name:value` lines, a blank
//! line, then the payload. Lines end in `\n`, `\r\n` or a bare `\r`. Encoded
//! frames end with a NUL octet; one trailing NUL is stripped on decode.

use std::fmt;
use std::str::FromStr;

use crate::config::protocol::{MAX_COMMAND_LENGTH, MAX_HEADERS, MAX_LINE_LENGTH};
use crate::server::stomp::error::FrameError;

pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_PAYLOAD_TYPE: &str = "pay";
pub const HEADER_RECEIPT: &str = "receipt";
pub const HEADER_RECEIPT_ID: &str = "receipt-id";
pub const HEADER_CONTENT_LENGTH: &str = "content-length";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Send,
    Subscribe,
    Unsubscribe,
    Begin,
    Commit,
    Abort,
    Ack,
    Nack,
    Disconnect,
    Connect,
    Stomp,
    Connected,
    Message,
    Receipt,
    Error,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Send => "SEND",
            Verb::Subscribe => "SUBSCRIBE",
            Verb::Unsubscribe => "UNSUBSCRIBE",
            Verb::Begin => "BEGIN",
            Verb::Commit => "COMMIT",
            Verb::Abort => "ABORT",
            Verb::Ack => "ACK",
            Verb::Nack => "NACK",
            Verb::Disconnect => "DISCONNECT",
            Verb::Connect => "CONNECT",
            Verb::Stomp => "STOMP",
            Verb::Connected => "CONNECTED",
            Verb::Message => "MESSAGE",
            Verb::Receipt => "RECEIPT",
            Verb::Error => "ERROR",
        }
    }
}

impl FromStr for Verb {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let verb = match s {
            "SEND" => Verb::Send,
            "SUBSCRIBE" => Verb::Subscribe,
            "UNSUBSCRIBE" => Verb::Unsubscribe,
            "BEGIN" => Verb::Begin,
            "COMMIT" => Verb::Commit,
            "ABORT" => Verb::Abort,
            "ACK" => Verb::Ack,
            "NACK" => Verb::Nack,
            "DISCONNECT" => Verb::Disconnect,
            "CONNECT" => Verb::Connect,
            "STOMP" => Verb::Stomp,
            "CONNECTED" => Verb::Connected,
            "MESSAGE" => Verb::Message,
            "RECEIPT" => Verb::Receipt,
            "ERROR" => Verb::Error,
            other => return Err(FrameError::UnknownVerb(other.to_string())),
        };
        Ok(verb)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headers the server understands. Anything else is dropped while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameHeaders {
    pub content_type: Option<String>,
    pub payload_type: Option<String>,
    pub receipt: Option<String>,
    pub receipt_id: Option<i32>,
    pub content_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub verb: Verb,
    pub headers: FrameHeaders,
    pub payload: Vec<u8>,
}

impl StompFrame {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            headers: FrameHeaders::default(),
            payload: Vec::new(),
        }
    }

    /// Parse one complete frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);

        let (verb_line, mut cursor) = read_line(bytes, 0, MAX_COMMAND_LENGTH)?;
        let verb = verb_line.parse::<Verb>()?;

        let mut headers = FrameHeaders::default();
        let mut header_count = 0;
        loop {
            let (line, next) = read_line(bytes, cursor, MAX_LINE_LENGTH)?;
            cursor = next;
            if line.is_empty() {
                break;
            }
            if header_count == MAX_HEADERS {
                return Err(FrameError::TooManyHeaders(MAX_HEADERS));
            }
            header_count += 1;
            apply_header(&mut headers, line)?;
        }

        let rest = &bytes[cursor.min(bytes.len())..];
        let payload = match headers.content_length {
            Some(declared) if declared > rest.len() => {
                return Err(FrameError::ContentLengthMismatch {
                    declared,
                    available: rest.len(),
                });
            }
            Some(declared) => rest[..declared].to_vec(),
            None => rest.to_vec(),
        };

        Ok(Self { verb, headers, payload })
    }

    /// Serialize the frame. `content-length` is always derived from the payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + 128);
        push_line(&mut out, self.verb.as_str());
        if let Some(content_type) = &self.headers.content_type {
            push_header(&mut out, HEADER_CONTENT_TYPE, content_type);
        }
        if let Some(payload_type) = &self.headers.payload_type {
            push_header(&mut out, HEADER_PAYLOAD_TYPE, payload_type);
        }
        if let Some(receipt) = &self.headers.receipt {
            push_header(&mut out, HEADER_RECEIPT, receipt);
        }
        if let Some(receipt_id) = self.headers.receipt_id {
            push_header(&mut out, HEADER_RECEIPT_ID, &receipt_id.to_string());
        }
        if !self.payload.is_empty() {
            push_header(&mut out, HEADER_CONTENT_LENGTH, &self.payload.len().to_string());
        }
        out.push(b'\n');
        out.extend_from_slice(&self.payload);
        out.push(0);
        out
    }
}

fn apply_header(headers: &mut FrameHeaders, line: &str) -> Result<(), FrameError> {
    let (name, value) = match line.find(':') {
        None | Some(0) => return Err(FrameError::InvalidHeader(line.to_string())),
        Some(idx) => (&line[..idx], &line[idx + 1..]),
    };

    match name {
        HEADER_CONTENT_TYPE => headers.content_type = Some(value.to_string()),
        HEADER_PAYLOAD_TYPE => headers.payload_type = Some(value.to_string()),
        HEADER_RECEIPT => headers.receipt = Some(value.to_string()),
        HEADER_RECEIPT_ID => {
            let id = value
                .trim()
                .parse::<i32>()
                .map_err(|_| FrameError::InvalidHeader(line.to_string()))?;
            headers.receipt_id = Some(id);
        }
        HEADER_CONTENT_LENGTH => {
            let length = value
                .trim()
                .parse::<usize>()
                .map_err(|_| FrameError::InvalidHeader(line.to_string()))?;
            headers.content_length = Some(length);
        }
        _ => {}
    }
    Ok(())
}

/// Read one line starting at `start`; returns the line and the offset just past its terminator.
///
/// Running off the end of the buffer ends the line; an exhausted buffer yields an empty line.
fn read_line(bytes: &[u8], start: usize, limit: usize) -> Result<(&str, usize), FrameError> {
    let rest = bytes.get(start..).unwrap_or_default();

    for (idx, byte) in rest.iter().enumerate() {
        if idx > limit {
            return Err(FrameError::LineTooLong { limit });
        }
        let consumed = match byte {
            b'\n' => 1,
            b'\r' if rest.get(idx + 1) == Some(&b'\n') => 2,
            b'\r' => 1,
            _ => continue,
        };
        return Ok((line_str(&rest[..idx], limit)?, start + idx + consumed));
    }

    Ok((line_str(rest, limit)?, bytes.len()))
}

fn line_str(line: &[u8], limit: usize) -> Result<&str, FrameError> {
    if line.len() > limit {
        return Err(FrameError::LineTooLong { limit });
    }
    std::str::from_utf8(line).map_err(|_| FrameError::InvalidEncoding)
}

fn push_line(out: &mut Vec<u8>, line: &str) {
    out.extend_from_slice(line.as_bytes());
    out.push(b'\n');
}

fn push_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.push(b':');
    push_line(out, value);
}
