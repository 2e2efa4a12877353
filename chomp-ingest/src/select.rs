//! Dotted-path JSON field extraction, grounded on `select_nested` in
//! `src/utils/runtime.py` of `examples/original_source`: an optional
//! leading dot, `.`/`root` meaning "the whole document", and
//! `key[index]` segments for array access.

use serde_json::Value;

pub fn select_nested(selector: &str, data: &Value) -> Option<Value> {
    let trimmed = selector.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed.eq_ignore_ascii_case("root") {
        return Some(data.clone());
    }
    let path = trimmed.strip_prefix('.').unwrap_or(trimmed);

    let mut current = data.clone();
    for segment in split_segments(path) {
        let (key, index) = parse_segment(&segment);
        if let Some(key) = key {
            current = current.get(&key)?.clone();
        }
        if let Some(index) = index {
            current = current.get(index)?.clone();
        }
    }
    Some(current)
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('.').map(|s| s.to_string()).filter(|s| !s.is_empty()).collect()
}

/// Splits `key[index]` or `key` or `[index]` into its parts.
fn parse_segment(segment: &str) -> (Option<String>, Option<usize>) {
    if let Some(bracket) = segment.find('[') {
        let key = &segment[..bracket];
        let index_str = segment[bracket + 1..].trim_end_matches(']');
        let index = index_str.parse::<usize>().ok();
        let key = if key.is_empty() { None } else { Some(key.to_string()) };
        (key, index)
    } else if segment.chars().all(|c| c.is_ascii_digit()) {
        (None, segment.parse::<usize>().ok())
    } else {
        (Some(segment.to_string()), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_selector_returns_whole_document() {
        let data = json!({"a": 1});
        assert_eq!(select_nested(".", &data), Some(data.clone()));
        assert_eq!(select_nested("root", &data), Some(data));
    }

    #[test]
    fn selects_a_nested_key() {
        let data = json!({"data": {"usd": 64000.5}});
        assert_eq!(select_nested(".data.usd", &data), Some(json!(64000.5)));
    }

    #[test]
    fn selects_an_array_index() {
        let data = json!({"prices": [1, 2, 3]});
        assert_eq!(select_nested(".prices[1]", &data), Some(json!(2)));
    }

    #[test]
    fn missing_key_returns_none() {
        let data = json!({"a": 1});
        assert_eq!(select_nested(".b", &data), None);
    }
}
