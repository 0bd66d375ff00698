//! Turns raw RFC 5322 bytes into a normalized [`RawMessage`].
//!
//! Decoding is deliberately forgiving. Headers are read straight from the
//! header block so that a mislabeled or unsupported charset falls through a
//! list of common encodings and, as a last resort, a lossy UTF-8 read. Only a
//! message without a usable `Date` is rejected, since the date feeds both the
//! dedup key and the record dates.

use std::borrow::Cow;
use std::sync::LazyLock;

use base64::Engine;
use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use log::debug;
use mail_parser::{MessageParser, PartType};
use regex::bytes::Regex;
use thiserror::Error;

/// Charsets tried, in order, when a header or body does not decode as the
/// charset it declares (or declares none).
const FALLBACK_CHARSETS: &[&str] = &["shift_jis", "euc-kr", "gb18030", "iso-8859-2"];

static RE_ENCODED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\?([^?\s]+)\?([bBqQ])\?([^?\s]*)\?=").unwrap());

/// A decoded message, ready for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub subject: String,
    pub sender: String,
    pub date: DateTime<Utc>,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("message has no header block")]
    Empty,

    #[error("message has no Date header")]
    MissingDate,

    #[error("unparseable Date header: {0}")]
    InvalidDate(String),
}

/// Decodes one message. Never fails on charset problems; only a missing or
/// unparseable `Date` is an error.
pub fn decode_message(raw: &[u8]) -> Result<RawMessage, DecodeError> {
    if raw.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(DecodeError::Empty);
    }

    let (header_block, body_bytes) = split_header_block(raw);
    let headers = unfold_headers(header_block);
    let parsed = MessageParser::default().parse(raw);

    let subject = header_value(&headers, "subject")
        .map(decode_header_value)
        .unwrap_or_default();

    let sender = parsed
        .as_ref()
        .and_then(|m| m.from())
        .and_then(|addr| addr.first())
        .and_then(|addr| addr.address().map(|a| a.to_ascii_lowercase()))
        .or_else(|| header_value(&headers, "from").map(decode_header_value))
        .unwrap_or_default();

    let date = match parsed.as_ref().and_then(|m| m.date()) {
        Some(date) => DateTime::<Utc>::from_timestamp(date.to_timestamp(), 0),
        None => None,
    };
    let date = match date {
        Some(date) => date,
        None => {
            let raw_date = header_value(&headers, "date")
                .map(decode_header_value)
                .ok_or(DecodeError::MissingDate)?;
            DateTime::parse_from_rfc2822(raw_date.trim())
                .map(|d| d.with_timezone(&Utc))
                .map_err(|_| DecodeError::InvalidDate(raw_date.trim().to_string()))?
        }
    };

    let body = parsed
        .as_ref()
        .and_then(extract_body)
        .unwrap_or_else(|| decode_with_fallback(body_bytes, None).into_owned());

    debug!("Decoded message subject={:?} sender={:?}", subject, sender);

    Ok(RawMessage {
        subject: subject.trim().to_string(),
        sender: sender.trim().to_string(),
        date,
        body: normalize_line_breaks(&body),
    })
}

fn extract_body(message: &mail_parser::Message<'_>) -> Option<String> {
    if let Some(text) = message.body_text(0) {
        return Some(text.into_owned());
    }

    message.parts.iter().find_map(|part| match &part.body {
        PartType::Text(text) | PartType::Html(text) if !text.is_empty() => {
            Some(text.to_string())
        }
        PartType::Binary(data) | PartType::InlineBinary(data) if !data.is_empty() => {
            Some(decode_with_fallback(data, None).into_owned())
        }
        _ => None,
    })
}

/// Splits at the first blank line. A message with no blank line is all header.
fn split_header_block(raw: &[u8]) -> (&[u8], &[u8]) {
    for (i, window) in raw.windows(2).enumerate() {
        if window == b"\n\n" {
            return (&raw[..i], &raw[i + 2..]);
        }
        if window == b"\r\n" && raw[i + 2..].starts_with(b"\r\n") {
            return (&raw[..i], &raw[i + 4..]);
        }
    }
    (raw, &[])
}

/// Joins continuation lines and returns `(lowercased name, raw value)` pairs.
fn unfold_headers(block: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut headers: Vec<(String, Vec<u8>)> = Vec::new();

    for line in block.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        if line[0] == b' ' || line[0] == b'\t' {
            if let Some((_, value)) = headers.last_mut() {
                value.push(b' ');
                value.extend_from_slice(line.trim_ascii_start());
            }
            continue;
        }
        if let Some(colon) = line.iter().position(|&b| b == b':') {
            let name = String::from_utf8_lossy(&line[..colon])
                .trim()
                .to_ascii_lowercase();
            let value = line[colon + 1..].trim_ascii_start().to_vec();
            headers.push((name, value));
        }
    }

    headers
}

fn header_value<'a>(headers: &'a [(String, Vec<u8>)], name: &str) -> Option<&'a [u8]> {
    headers
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_slice())
}

/// Decodes a raw header value: RFC 2047 encoded words are expanded, any
/// other 8-bit bytes go through the charset fallback chain.
pub fn decode_header_value(raw: &[u8]) -> String {
    let mut out = String::new();
    let mut last = 0;
    let mut previous_was_word = false;

    for caps in RE_ENCODED_WORD.captures_iter(raw) {
        let (Some(whole), Some(charset), Some(scheme), Some(payload)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };

        let gap = &raw[last..whole.start()];
        // Whitespace between two adjacent encoded words is not part of the text.
        if !(previous_was_word && gap.iter().all(|b| b.is_ascii_whitespace())) {
            out.push_str(&decode_with_fallback(gap, None));
        }

        match decode_encoded_word(charset.as_bytes(), scheme.as_bytes(), payload.as_bytes()) {
            Some(text) => out.push_str(&text),
            None => out.push_str(&decode_with_fallback(whole.as_bytes(), None)),
        }

        last = whole.end();
        previous_was_word = true;
    }

    out.push_str(&decode_with_fallback(&raw[last..], None));
    out
}

fn decode_encoded_word(charset: &[u8], scheme: &[u8], payload: &[u8]) -> Option<String> {
    let bytes = match scheme {
        b"B" | b"b" => base64::engine::general_purpose::STANDARD
            .decode(payload)
            .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(payload))
            .ok()?,
        _ => decode_q(payload),
    };

    let charset = String::from_utf8_lossy(charset);
    // RFC 2231 language suffix: `utf-8*en`.
    let label = charset.split('*').next().unwrap_or_default();
    Some(decode_with_fallback(&bytes, Some(label)).into_owned())
}

fn decode_q(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len());
    let mut i = 0;
    while i < payload.len() {
        match payload[i] {
            b'_' => out.push(b' '),
            b'=' if i + 2 < payload.len() => {
                match (hex_val(payload[i + 1]), hex_val(payload[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 2;
                    }
                    _ => out.push(b'='),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    out
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decodes bytes as the declared charset, then UTF-8, then each fallback
/// charset, then windows-1252, and finally lossy UTF-8. Never fails.
pub fn decode_with_fallback<'a>(bytes: &'a [u8], declared: Option<&str>) -> Cow<'a, str> {
    if let Some(encoding) = declared.and_then(|label| Encoding::for_label(label.trim().as_bytes()))
    {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return text;
        }
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }

    for label in FALLBACK_CHARSETS {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes)
            {
                return text;
            }
        }
    }

    if let Some(text) =
        encoding_rs::WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
    {
        return text;
    }

    String::from_utf8_lossy(bytes)
}

fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}
