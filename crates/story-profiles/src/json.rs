//! Recovering a JSON object from chatty model output.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ProfileError;

/// Strip a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            return text[start + 7..start + 7 + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        if let Some(end) = text[start + 3..].find("```") {
            return text[start + 3..start + 3 + end].trim();
        }
    }

    text.trim()
}

/// First balanced `{...}` in `text`, honouring braces inside strings.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Parse the JSON object in a model reply.
///
/// Tries, in order: the whole reply, the reply without a code fence, the first
/// balanced object, and finally everything between the first `{` and the last
/// `}`.
pub fn parse_json_object(reply: &str) -> Result<Map<String, Value>, ProfileError> {
    if let Some(map) = parse_object(reply.trim()) {
        return Ok(map);
    }

    let unfenced = strip_code_fence(reply);
    if let Some(map) = parse_object(unfenced) {
        return Ok(map);
    }

    let recovered = first_balanced_object(unfenced).and_then(parse_object).or_else(|| {
        let start = unfenced.find('{')?;
        let end = unfenced.rfind('}')?;
        (start < end)
            .then(|| &unfenced[start..=end])
            .and_then(parse_object)
    });

    match recovered {
        Some(map) => {
            warn!(reply_len = reply.len(), "Recovered JSON object from noisy reply");
            Ok(map)
        }
        None => Err(ProfileError::MalformedResponse(format!(
            "no JSON object in reply: {}",
            preview(reply)
        ))),
    }
}

fn preview(text: &str) -> String {
    const MAX_PREVIEW: usize = 120;
    if text.chars().count() > MAX_PREVIEW {
        format!("{}...", text.chars().take(MAX_PREVIEW).collect::<String>())
    } else {
        text.to_string()
    }
}
