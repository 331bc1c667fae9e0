use platelens_core::{AnalysisError, AnalysisMode, IdentifiedItem};
use serde::Deserialize;
use tracing::debug;

use crate::config::PipelineConfig;

pub const DEFAULT_UNIT: &str = "item";

/// One decoded element before normalization. Field names follow the prompt
/// contract; "name" is accepted as a model-side variation.
#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(alias = "name")]
    food: Option<String>,
    quantity: Option<f64>,
    unit: Option<String>,
    confidence: Option<f64>,
}

/// Validated output of one parse: normalized items, the empty-success marker,
/// and any reasoning text split off ahead of the terminal array.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItems {
    pub items: Vec<IdentifiedItem>,
    pub is_empty_result: bool,
    pub reasoning: Option<String>,
}

/// Convert a raw model response into identified items. Pure function of its
/// inputs: the same text, mode and config always yield the same outcome.
///
/// Recovery strategies run in fixed priority order, first success wins:
/// code-fence strip, direct decode, embedded-array scan, bare-object wrap.
pub fn parse_response(
    raw: &str,
    mode: AnalysisMode,
    config: &PipelineConfig,
) -> Result<ParsedItems, AnalysisError> {
    let (reasoning, body) = if mode.extracts_reasoning() {
        split_reasoning(raw)
    } else {
        (None, raw)
    };

    let cleaned = strip_code_fences(body);
    let mut last_err: Option<serde_json::Error> = None;

    if cleaned.starts_with('[') {
        match decode_array(&cleaned) {
            Ok(items) => return finalize(items, mode, config, reasoning),
            Err(e) => last_err = Some(e),
        }
    }

    for candidate in balanced_arrays(&cleaned) {
        match decode_array(candidate) {
            Ok(items) => {
                debug!("PARSER: recovered embedded array from prose-wrapped response");
                return finalize(items, mode, config, reasoning);
            }
            Err(e) => last_err = Some(e),
        }
    }

    if cleaned.starts_with('{') && cleaned.ends_with('}') {
        if let Ok(item) = serde_json::from_str::<RawItem>(&cleaned) {
            debug!("PARSER: wrapped bare object into a one-element array");
            return finalize(vec![item], mode, config, reasoning);
        }
    }

    Err(classify_failure(&cleaned, last_err))
}

/// In chain-of-thought responses the terminal array follows free-form
/// description; split on the last opening bracket and keep the prose.
fn split_reasoning(raw: &str) -> (Option<String>, &str) {
    match raw.rfind('[') {
        Some(idx) => {
            let reasoning = raw[..idx].trim();
            let reasoning = (!reasoning.is_empty()).then(|| reasoning.to_string());
            (reasoning, &raw[idx..])
        }
        None => (None, raw),
    }
}

fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.contains("```") {
        return trimmed.to_string();
    }
    trimmed
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn decode_array(text: &str) -> Result<Vec<RawItem>, serde_json::Error> {
    serde_json::from_str::<Vec<RawItem>>(text)
}

/// Every balanced top-level `[...]` span, string-aware. Nested arrays stay
/// inside their enclosing span.
fn balanced_arrays(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut arrays = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            match matching_bracket(bytes, i) {
                Some(end) => {
                    arrays.push(&text[i..=end]);
                    i = end + 1;
                    continue;
                }
                None => break,
            }
        }
        i += 1;
    }
    arrays
}

fn matching_bracket(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn has_unclosed_array(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            match matching_bracket(bytes, i) {
                Some(end) => {
                    i = end + 1;
                    continue;
                }
                None => return true,
            }
        }
        i += 1;
    }
    false
}

/// Best-effort diagnostic sub-classification once every recovery strategy has
/// failed.
fn classify_failure(text: &str, last_err: Option<serde_json::Error>) -> AnalysisError {
    if balanced_arrays(text).len() >= 2 {
        return AnalysisError::MultipleArrays;
    }

    let tail = text.trim_end();
    if has_unclosed_array(text) || tail.ends_with("...") || tail.ends_with('…') {
        return AnalysisError::Truncated;
    }

    AnalysisError::InvalidJson(
        last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no JSON array found in response".to_string()),
    )
}

fn finalize(
    raw_items: Vec<RawItem>,
    mode: AnalysisMode,
    config: &PipelineConfig,
    reasoning: Option<String>,
) -> Result<ParsedItems, AnalysisError> {
    let explicit_empty = raw_items.is_empty();
    let mut items = Vec::new();

    for raw in raw_items {
        let confidence = raw.confidence.unwrap_or(1.0);
        if confidence < config.confidence_threshold {
            debug!(
                "PARSER: dropping '{}' (confidence {:.2} below {:.2})",
                raw.food.as_deref().unwrap_or("?"),
                confidence,
                config.confidence_threshold
            );
            continue;
        }

        let name = raw.food.unwrap_or_default().trim().to_string();
        if name.is_empty() {
            continue;
        }

        let quantity = raw.quantity.unwrap_or(1.0).max(config.min_quantity);
        let unit = raw
            .unit
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_UNIT.to_string());

        items.push(IdentifiedItem {
            name,
            quantity,
            unit,
        });
    }

    if items.is_empty() {
        if explicit_empty && mode.empty_array_is_success() {
            return Ok(ParsedItems {
                items,
                is_empty_result: true,
                reasoning,
            });
        }
        return Err(AnalysisError::NoItemsIdentified);
    }

    Ok(ParsedItems {
        items,
        is_empty_result: false,
        reasoning,
    })
}
