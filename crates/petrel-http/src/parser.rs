//! Incremental HTTP/1.1 response parser.
//!
//! A character-at-a-time state machine: status line, header block, then a
//! body sub-parser chosen at the header/body boundary. Input may arrive in
//! arbitrary slices; each character is processed exactly once, in order.

use std::collections::HashMap;

use tracing::trace;

use crate::{HttpError, Response};

/// Response parsing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StatusLine,
    StatusLineEnd,
    HeaderName,
    HeaderSpace,
    HeaderValue,
    HeaderLineEnd,
    HeaderBlockEnd,
    Body,
}

/// Incremental response parser. One value per response.
///
/// Feed it with [`receive`](Self::receive) or
/// [`receive_char`](Self::receive_char); once [`is_finished`](Self::is_finished)
/// reports `true`, read the result with [`response`](Self::response).
/// Reading earlier yields a partially populated response — checking
/// `is_finished` first is the caller's contract, not enforced here.
pub struct ResponseParser {
    state: State,
    status_line: String,
    headers: HashMap<String, String>,
    header_name: String,
    header_value: String,
    body: Option<BodyParser>,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: State::StatusLine,
            status_line: String::new(),
            headers: HashMap::new(),
            header_name: String::new(),
            header_value: String::new(),
            body: None,
        }
    }

    /// Feed a slice of response text, character by character, in order.
    pub fn receive(&mut self, text: &str) -> Result<(), HttpError> {
        for ch in text.chars() {
            self.receive_char(ch)?;
        }
        Ok(())
    }

    /// Feed one character.
    pub fn receive_char(&mut self, ch: char) -> Result<(), HttpError> {
        match self.state {
            State::StatusLine => {
                if ch == '\r' {
                    self.state = State::StatusLineEnd;
                } else {
                    self.status_line.push(ch);
                }
            }
            State::StatusLineEnd => {
                if ch == '\n' {
                    self.state = State::HeaderName;
                }
            }
            State::HeaderName => {
                if ch == ':' {
                    self.state = State::HeaderSpace;
                } else if ch == '\r' {
                    // Empty pending name: the header block just ended.
                    // This is the one point where the body sub-parser is
                    // selected, before any body character arrives.
                    self.state = State::HeaderBlockEnd;
                    self.body = Some(self.select_body_parser());
                } else {
                    self.header_name.push(ch);
                }
            }
            State::HeaderSpace => {
                if ch == ' ' {
                    self.state = State::HeaderValue;
                }
            }
            State::HeaderValue => {
                if ch == '\r' {
                    self.state = State::HeaderLineEnd;
                    trace!(name = %self.header_name, value = %self.header_value, "header received");
                    self.headers.insert(
                        std::mem::take(&mut self.header_name),
                        std::mem::take(&mut self.header_value),
                    );
                } else {
                    self.header_value.push(ch);
                }
            }
            State::HeaderLineEnd => {
                if ch == '\n' {
                    self.state = State::HeaderName;
                }
            }
            State::HeaderBlockEnd => {
                if ch == '\n' {
                    self.state = State::Body;
                }
            }
            State::Body => {
                if let Some(body) = &mut self.body {
                    body.receive_char(ch)?;
                }
            }
        }
        Ok(())
    }

    fn select_body_parser(&self) -> BodyParser {
        if self.headers.get("Transfer-Encoding").map(String::as_str) == Some("chunked") {
            BodyParser::Chunked(ChunkedBodyParser::new())
        } else {
            let expected = self
                .headers
                .get("Content-Length")
                .and_then(|v| v.trim().parse::<usize>().ok());
            BodyParser::Identity(IdentityBodyParser::new(expected))
        }
    }

    /// Signal that the transport reached end of stream. Completes a
    /// connection-close-delimited identity body; a body that still needs
    /// data stays unfinished.
    pub fn end_of_input(&mut self) {
        if let Some(body) = &mut self.body {
            body.end_of_input();
        }
    }

    /// True once a body sub-parser exists and reports finished.
    pub fn is_finished(&self) -> bool {
        self.body.as_ref().is_some_and(BodyParser::is_finished)
    }

    /// Assemble the parsed response. Only meaningful once
    /// [`is_finished`](Self::is_finished) is `true`.
    ///
    /// The status line is matched against `HTTP/1.1 <code> <text>`; on a
    /// mismatch the status fields stay at their defaults rather than
    /// erroring. A known weak point, kept deliberately.
    pub fn response(&self) -> Response {
        let (status_code, status_text) = parse_status_line(&self.status_line).unwrap_or_default();
        Response {
            status_code,
            status_text,
            headers: self.headers.clone(),
            body: self
                .body
                .as_ref()
                .map(|b| b.content().to_string())
                .unwrap_or_default(),
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_status_line(line: &str) -> Option<(u16, String)> {
    let rest = line.strip_prefix("HTTP/1.1 ")?;
    let (code, text) = rest.split_once(' ')?;
    let code = code.parse::<u16>().ok()?;
    if text.is_empty() {
        return None;
    }
    Some((code, text.to_string()))
}

/// Body sub-parser selected at the header/body boundary.
#[derive(Debug)]
enum BodyParser {
    Chunked(ChunkedBodyParser),
    Identity(IdentityBodyParser),
}

impl BodyParser {
    fn receive_char(&mut self, ch: char) -> Result<(), HttpError> {
        match self {
            BodyParser::Chunked(p) => p.receive_char(ch),
            BodyParser::Identity(p) => {
                p.receive_char(ch);
                Ok(())
            }
        }
    }

    fn end_of_input(&mut self) {
        if let BodyParser::Identity(p) = self {
            p.end_of_input();
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            BodyParser::Chunked(p) => p.is_finished(),
            BodyParser::Identity(p) => p.is_finished(),
        }
    }

    fn content(&self) -> &str {
        match self {
            BodyParser::Chunked(p) => p.content(),
            BodyParser::Identity(p) => p.content(),
        }
    }
}

/// Chunked transfer decoding state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Length,
    LengthLineEnd,
    ReadingChunk,
    NewLine,
    NewLineEnd,
}

/// Decoder for `Transfer-Encoding: chunked` bodies.
///
/// `content` accumulates chunk payload characters only; size lines and
/// framing CRLFs never reach it. The terminating zero-length chunk sets
/// `finished`, but its trailing CRLF is still consumed.
#[derive(Debug)]
pub struct ChunkedBodyParser {
    state: ChunkState,
    length: usize,
    content: String,
    finished: bool,
}

impl ChunkedBodyParser {
    pub fn new() -> Self {
        Self {
            state: ChunkState::Length,
            length: 0,
            content: String::new(),
            finished: false,
        }
    }

    pub fn receive_char(&mut self, ch: char) -> Result<(), HttpError> {
        match self.state {
            ChunkState::Length => {
                if ch == '\r' {
                    if self.length == 0 {
                        self.finished = true;
                    }
                    self.state = ChunkState::LengthLineEnd;
                } else {
                    let digit = ch
                        .to_digit(16)
                        .ok_or_else(|| HttpError::MalformedChunkSize(format!("{ch:?}")))?;
                    self.length = self
                        .length
                        .checked_mul(16)
                        .and_then(|n| n.checked_add(digit as usize))
                        .ok_or_else(|| {
                            HttpError::MalformedChunkSize("chunk size overflows".to_string())
                        })?;
                }
            }
            ChunkState::LengthLineEnd => {
                if ch == '\n' {
                    // A zero-length chunk has no payload: go straight to
                    // consuming its trailing CRLF.
                    self.state = if self.length == 0 {
                        ChunkState::NewLine
                    } else {
                        ChunkState::ReadingChunk
                    };
                }
            }
            ChunkState::ReadingChunk => {
                self.content.push(ch);
                self.length -= 1;
                if self.length == 0 {
                    self.state = ChunkState::NewLine;
                }
            }
            ChunkState::NewLine => {
                if ch == '\r' {
                    self.state = ChunkState::NewLineEnd;
                }
            }
            ChunkState::NewLineEnd => {
                if ch == '\n' {
                    self.state = ChunkState::Length;
                }
            }
        }
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl Default for ChunkedBodyParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulator for non-chunked bodies.
///
/// With a known `Content-Length` it finishes once that many bytes arrived;
/// without one the body is delimited by connection close, signalled via
/// [`end_of_input`](Self::end_of_input).
#[derive(Debug)]
pub struct IdentityBodyParser {
    content: String,
    expected: Option<usize>,
    finished: bool,
}

impl IdentityBodyParser {
    pub fn new(expected: Option<usize>) -> Self {
        Self {
            content: String::new(),
            expected,
            finished: expected == Some(0),
        }
    }

    pub fn receive_char(&mut self, ch: char) {
        self.content.push(ch);
        if let Some(expected) = self.expected {
            if self.content.len() >= expected {
                self.finished = true;
            }
        }
    }

    pub fn end_of_input(&mut self) {
        if self.expected.is_none() {
            self.finished = true;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}
