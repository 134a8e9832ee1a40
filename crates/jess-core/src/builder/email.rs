//! Plain-text email messages.
//!
//! Messages are single-part `text/plain` with CRLF line endings. The mail
//! API takes the raw RFC 5322 bytes encoded as URL-safe base64 in a `raw`
//! field, on one line.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use serde::{Deserialize, Serialize};

use crate::request::EmailRequest;

/// Maximum encoded line length for base64 bodies.
const BODY_LINE_LENGTH: usize = 76;

/// Longest line allowed in a `7bit` body.
const MAX_7BIT_LINE: usize = 998;

/// Raw bytes per RFC 2047 encoded word, keeping each word under 75 chars.
const ENCODED_WORD_CHUNK: usize = 45;

/// The body of a send-message call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPayload {
    /// URL-safe base64 of the full message.
    pub raw: String,
}

impl EmailPayload {
    /// Decodes the raw field back into message bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        URL_SAFE.decode(&self.raw)
    }
}

/// Builds the send-message payload for an email request.
pub fn build_email_payload(req: &EmailRequest) -> EmailPayload {
    EmailPayload {
        raw: URL_SAFE.encode(render_message(req)),
    }
}

/// Renders the RFC 5322 message bytes.
///
/// Headers are written in a fixed order: `To`, `From`, `Subject`,
/// `MIME-Version`, `Content-Type`, `Content-Transfer-Encoding`.
pub fn render_message(req: &EmailRequest) -> Vec<u8> {
    let body = normalize_newlines(&req.body);
    let seven_bit = body.is_ascii() && body.split("\r\n").all(|l| l.len() <= MAX_7BIT_LINE);

    let mut message = String::new();
    push_header(&mut message, "To", &encode_address(&req.to));
    push_header(&mut message, "From", &encode_address(&req.from));
    push_header(&mut message, "Subject", &encode_header_value(&req.subject));
    push_header(&mut message, "MIME-Version", "1.0");
    push_header(&mut message, "Content-Type", "text/plain; charset=\"utf-8\"");

    if seven_bit {
        push_header(&mut message, "Content-Transfer-Encoding", "7bit");
        message.push_str("\r\n");
        message.push_str(&body);
    } else {
        push_header(&mut message, "Content-Transfer-Encoding", "base64");
        message.push_str("\r\n");
        let encoded = STANDARD.encode(body.as_bytes());
        let lines: Vec<&str> = encoded
            .as_bytes()
            .chunks(BODY_LINE_LENGTH)
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
            .collect();
        message.push_str(&lines.join("\r\n"));
    }

    message.into_bytes()
}

fn push_header(message: &mut String, name: &str, value: &str) {
    message.push_str(name);
    message.push_str(": ");
    message.push_str(value);
    message.push_str("\r\n");
}

/// Encodes the display name of `Name <local@domain>` as RFC 2047 words.
///
/// The angle-bracketed part is left alone; validation keeps it ASCII.
fn encode_address(value: &str) -> String {
    let value = value.trim();
    if value.is_ascii() {
        return value.to_string();
    }
    match value.rsplit_once('<') {
        Some((name, addr)) => {
            let name = name.trim().trim_matches('"').trim();
            if name.is_empty() {
                format!("<{addr}")
            } else {
                format!("{} <{addr}", encode_header_value(name))
            }
        }
        None => value.to_string(),
    }
}

/// Encodes a header value as RFC 2047 words when it is not plain ASCII.
fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in value.chars() {
        if chunk.len() + ch.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(format!("=?utf-8?b?{}?=", STANDARD.encode(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(format!("=?utf-8?b?{}?=", STANDARD.encode(chunk.as_bytes())));
    }
    words.join("\r\n ")
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").replace('\n', "\r\n")
}
