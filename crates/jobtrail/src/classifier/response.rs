//! Strict validation of the classification service's reply.
//!
//! The reply is untrusted. It must be a single JSON object with exactly the
//! keys `company_name`, `job_position`, `application_status` and
//! `email_content`, each either `null` or a string. Anything else is a typed
//! error, never a partially filled result.

use serde_json::{Map, Value};

use super::heuristic::{UNKNOWN_COMPANY, UNKNOWN_POSITION};
use super::{ClassificationError, ClassificationResult, JobExtraction, JobStatus};

pub const FIELD_COMPANY: &str = "company_name";
pub const FIELD_POSITION: &str = "job_position";
pub const FIELD_STATUS: &str = "application_status";
pub const FIELD_CONTENT: &str = "email_content";

const FIELDS: [&str; 4] = [FIELD_COMPANY, FIELD_POSITION, FIELD_STATUS, FIELD_CONTENT];

/// The four fields after shape validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionReply {
    pub company_name: Option<String>,
    pub job_position: Option<String>,
    pub application_status: Option<String>,
    pub email_content: Option<String>,
}

impl ExtractionReply {
    fn is_all_null(&self) -> bool {
        self.company_name.is_none()
            && self.job_position.is_none()
            && self.application_status.is_none()
            && self.email_content.is_none()
    }
}

/// Removes one surrounding Markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Slices out the first balanced JSON object, tracking string literals and
/// escapes so braces inside values do not count.
fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn take_field(map: &mut Map<String, Value>, key: &str) -> Result<Option<String>, ClassificationError> {
    match map.remove(key) {
        Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty() && !s.eq_ignore_ascii_case("null")).then(|| s.to_string()))
        }
        Some(other) => Err(ClassificationError::SchemaViolation(format!(
            "field '{}' must be a string or null, got {}",
            key, other
        ))),
        None => Err(ClassificationError::SchemaViolation(format!(
            "missing field '{}'",
            key
        ))),
    }
}

/// Validates the raw reply text into an [`ExtractionReply`].
pub fn parse_reply(text: &str) -> Result<ExtractionReply, ClassificationError> {
    let body = strip_code_fence(text);
    let json = extract_object(body).ok_or_else(|| {
        ClassificationError::MalformedResponse(format!("no JSON object in reply: {}", preview(text)))
    })?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))?;
    let Value::Object(mut map) = value else {
        return Err(ClassificationError::SchemaViolation(
            "reply is not a JSON object".to_string(),
        ));
    };

    if let Some(extra) = map.keys().find(|k| !FIELDS.contains(&k.as_str())) {
        return Err(ClassificationError::SchemaViolation(format!(
            "unexpected field '{}'",
            extra
        )));
    }

    Ok(ExtractionReply {
        company_name: take_field(&mut map, FIELD_COMPANY)?,
        job_position: take_field(&mut map, FIELD_POSITION)?,
        application_status: take_field(&mut map, FIELD_STATUS)?,
        email_content: take_field(&mut map, FIELD_CONTENT)?,
    })
}

/// Turns a validated reply into a result. All-null means not job related;
/// otherwise a recognised status is required. `fallback_content` is used when
/// the reply carries no content.
pub fn into_result(
    reply: ExtractionReply,
    fallback_content: impl FnOnce() -> String,
) -> Result<ClassificationResult, ClassificationError> {
    if reply.is_all_null() {
        return Ok(ClassificationResult::NotJobRelated);
    }

    let status_text = reply.application_status.ok_or_else(|| {
        ClassificationError::SchemaViolation("job-related reply without a status".to_string())
    })?;
    let status: JobStatus = status_text
        .parse()
        .map_err(|e| ClassificationError::SchemaViolation(format!("{}", e)))?;

    Ok(ClassificationResult::JobRelated(JobExtraction {
        company: reply
            .company_name
            .unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
        position: reply
            .job_position
            .unwrap_or_else(|| UNKNOWN_POSITION.to_string()),
        status,
        normalized_content: reply
            .email_content
            .map(|c| normalize_line_breaks(&c))
            .unwrap_or_else(fallback_content),
    }))
}

fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

fn preview(text: &str) -> String {
    let mut p: String = text.chars().take(120).collect();
    if text.chars().count() > 120 {
        p.push_str("...");
    }
    p
}
