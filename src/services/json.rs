//! Tolerant JSON extraction from model output
//!
//! Models wrap JSON in code fences or surround it with prose. This pulls the
//! first balanced JSON object or array out of such text.

use serde_json::Value;

/// Removes a surrounding Markdown code fence, if any
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Skip the info string ("json") on the opening fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parses the first JSON value found in `content`
///
/// Returns None when no balanced object or array parses.
pub fn extract_json(content: &str) -> Option<Value> {
    let cleaned = strip_code_fences(content);

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }

    for (start, ch) in cleaned.char_indices() {
        if ch != '{' && ch != '[' {
            continue;
        }
        if let Some(end) = balanced_end(&cleaned[start..]) {
            if let Ok(value) = serde_json::from_str::<Value>(&cleaned[start..start + end]) {
                return Some(value);
            }
        }
    }

    tracing::debug!("No JSON value found in model output ({} chars)", content.len());
    None
}

/// Byte length of the balanced bracket expression at the start of `s`
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in s.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}
