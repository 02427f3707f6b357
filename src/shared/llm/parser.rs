use lazy_static::lazy_static;
use regex::Regex;

use super::LlmResponse;

lazy_static! {
    /// `,` directly before a closing brace or bracket
    static ref TRAILING_COMMA_RE: Regex = Regex::new(r",(\s*[}\]])").unwrap();

    /// `"a" + "b"` style concatenation inside a JSON document
    static ref STRING_CONCAT_RE: Regex = Regex::new(r#""\s*\+\s*""#).unwrap();

    /// Opening line of a fenced code block, optionally tagged with a language
    static ref FENCE_RE: Regex = Regex::new(r"(?s)```[a-zA-Z]*\s*\n?(.*?)```").unwrap();
}

/// Locate the JSON object inside a model reply.
///
/// Accepts a fenced code block, a bare object, or an object embedded in prose.
fn extract_json_object(text: &str) -> Result<&str, String> {
    if let Some(captures) = FENCE_RE.captures(text) {
        if let Some(body) = captures.get(1) {
            return Ok(body.as_str().trim());
        }
    }

    let start = text
        .find('{')
        .ok_or_else(|| "No JSON object found in response".to_string())?;
    let end = text
        .rfind('}')
        .ok_or_else(|| "Incomplete JSON object in response".to_string())?;

    if start < end {
        Ok(&text[start..=end])
    } else {
        Err("Invalid JSON boundaries in response".to_string())
    }
}

/// Cheap textual repairs for the two most common model mistakes
fn quick_fix(json: &str) -> String {
    let merged = STRING_CONCAT_RE.replace_all(json, "");
    TRAILING_COMMA_RE.replace_all(&merged, "$1").into_owned()
}

fn try_parse<T: LlmResponse>(text: &str) -> Result<T, String> {
    let json = extract_json_object(text)?;

    if let Ok(parsed) = serde_json::from_str::<T>(json) {
        return Ok(parsed);
    }

    let fixed = quick_fix(json);
    if let Ok(parsed) = serde_json::from_str::<T>(&fixed) {
        tracing::debug!("Model JSON parsed after quick fixes");
        return Ok(parsed);
    }

    let options = llm_json::RepairOptions::default();
    match llm_json::repair_json(json, &options) {
        Ok(repaired) => serde_json::from_str::<T>(&repaired).map_err(|e| {
            format!(
                "Repaired JSON does not match the expected shape: {} (input: {})",
                e,
                json.chars().take(200).collect::<String>()
            )
        }),
        Err(e) => Err(format!(
            "Failed to repair JSON: {:?} (input: {})",
            e,
            json.chars().take(200).collect::<String>()
        )),
    }
}

/// Parse a model reply into `T`; on failure return `T::default()` marked as
/// a fallback carrying the error message.
pub fn parse_with_fallback<T: LlmResponse>(text: &str) -> T {
    match try_parse::<T>(text) {
        Ok(parsed) => parsed,
        Err(error_msg) => {
            tracing::warn!("Model response parsing failed, using fallback: {}", error_msg);
            let mut fallback = T::default();
            fallback.mark_as_fallback(error_msg);
            fallback
        }
    }
}
