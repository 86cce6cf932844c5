//! Minimal RFC 2045/2046 reader for message summaries.
//!
//! Only what the email summary needs: header lookup, multipart splitting,
//! and decoding of the first `text/plain` or `text/html` part (base64,
//! quoted-printable, or identity transfer encodings; UTF-8 and Latin-1
//! charsets).  Parts are walked depth-first in document order, so the first
//! text part found is the one a mail client would show first.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Nesting limit for multipart containers.
const MAX_DEPTH: usize = 16;

/// Mailers routinely omit padding and wrap lines; accept both.
const MIME_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

// ---------------------------------------------------------------------------
// Parts
// ---------------------------------------------------------------------------

/// A message or body part: unfolded headers plus the undecoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct Part<'a> {
    headers: Vec<(String, String)>,
    body: &'a str,
}

impl<'a> Part<'a> {
    /// Split `raw` at the first empty line into headers and body.
    pub fn parse(raw: &'a str) -> Self {
        let (head, body) = split_head(raw);
        Self {
            headers: parse_headers(head),
            body,
        }
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &'a str {
        self.body
    }

    /// The declared content type, `text/plain` when absent.
    pub fn content_type(&self) -> ContentType {
        self.header("content-type")
            .map(ContentType::parse)
            .unwrap_or_default()
    }

    /// The decoded body of the first `text/plain` or `text/html` part.
    pub fn first_text_body(&self) -> Option<String> {
        self.find_text(0)
    }

    fn find_text(&self, depth: usize) -> Option<String> {
        let content_type = self.content_type();
        if content_type.is_multipart() {
            if depth >= MAX_DEPTH {
                return None;
            }
            let boundary = content_type.param("boundary")?;
            return split_multipart(self.body, boundary)
                .into_iter()
                .find_map(|child| Part::parse(child).find_text(depth + 1));
        }
        if content_type.mime == "text/plain" || content_type.mime == "text/html" {
            return Some(self.decoded_text(&content_type));
        }
        None
    }

    fn decoded_text(&self, content_type: &ContentType) -> String {
        let encoding = self
            .header("content-transfer-encoding")
            .map(|e| e.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let bytes = match encoding.as_str() {
            "base64" => decode_base64(self.body),
            "quoted-printable" => decode_quoted_printable(self.body),
            _ => self.body.as_bytes().to_vec(),
        };
        decode_charset(&bytes, content_type.param("charset"))
    }
}

/// A parsed `Content-Type` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Lower-cased `type/subtype`.
    pub mime: String,
    params: Vec<(String, String)>,
}

impl Default for ContentType {
    fn default() -> Self {
        Self {
            mime: "text/plain".to_string(),
            params: Vec::new(),
        }
    }
}

impl ContentType {
    pub fn parse(value: &str) -> Self {
        let mut fields = value.split(';');
        let mime = fields
            .next()
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "text/plain".to_string());
        let params = fields
            .filter_map(|field| {
                let (name, value) = field.split_once('=')?;
                Some((
                    name.trim().to_ascii_lowercase(),
                    value.trim().trim_matches('"').to_string(),
                ))
            })
            .collect();
        Self { mime, params }
    }

    pub fn is_multipart(&self) -> bool {
        self.mime.starts_with("multipart/")
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn line_content(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Split at the first empty line.  No empty line means no body.
fn split_head(raw: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in raw.split_inclusive('\n') {
        if line_content(line).is_empty() {
            return (&raw[..offset], &raw[offset + line.len()..]);
        }
        offset += line.len();
    }
    (raw, "")
}

/// Parse a header block, joining folded continuation lines with one space.
pub fn parse_headers(block: &str) -> Vec<(String, String)> {
    let mut unfolded: Vec<String> = Vec::new();
    for line in block.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with([' ', '\t'])
            && let Some(last) = unfolded.last_mut()
        {
            last.push(' ');
            last.push_str(line.trim());
        } else if !line.is_empty() {
            unfolded.push(line.to_string());
        }
    }

    unfolded
        .into_iter()
        .filter_map(|header| {
            let (name, value) = header.split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Bodies of the parts of a multipart body.  The line break before each
/// delimiter belongs to the delimiter.  A missing close delimiter ends the
/// last part at the end of input.
fn split_multipart<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{boundary}");
    let close = format!("{delimiter}--");
    let mut parts = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;

    for line in body.split_inclusive('\n') {
        let content = line_content(line).trim_end();
        let is_close = content == close;
        if is_close || content == delimiter {
            if let Some(begin) = start {
                parts.push(strip_line_break(&body[begin..offset]));
            }
            if is_close {
                return parts;
            }
            start = Some(offset + line.len());
        }
        offset += line.len();
    }

    if let Some(begin) = start {
        parts.push(&body[begin..]);
    }
    parts
}

fn strip_line_break(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

/// Undecodable input is returned as-is.
fn decode_base64(body: &str) -> Vec<u8> {
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    MIME_BASE64
        .decode(compact.as_bytes())
        .unwrap_or_else(|_| body.as_bytes().to_vec())
}

fn decode_quoted_printable(body: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    for line in body.split_inclusive('\n') {
        let content = line_content(line);
        let line_break = &line[content.len()..];
        let content = content.trim_end_matches([' ', '\t']);
        let (content, soft_break) = match content.strip_suffix('=') {
            Some(rest) => (rest, true),
            None => (content, false),
        };

        let bytes = content.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'='
                && let (Some(hi), Some(lo)) = (
                    bytes.get(i + 1).and_then(|b| hex_value(*b)),
                    bytes.get(i + 2).and_then(|b| hex_value(*b)),
                )
            {
                out.push(hi << 4 | lo);
                i += 3;
            } else {
                out.push(bytes[i]);
                i += 1;
            }
        }

        if !soft_break {
            out.extend_from_slice(line_break.as_bytes());
        }
    }
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    char::from(byte).to_digit(16).and_then(|d| u8::try_from(d).ok())
}

fn decode_charset(bytes: &[u8], charset: Option<&str>) -> String {
    match charset.map(str::to_ascii_lowercase).as_deref() {
        Some("iso-8859-1" | "latin1" | "latin-1" | "windows-1252") => {
            bytes.iter().map(|&b| char::from(b)).collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
