/// Returns the first balanced `{ ... }` span in free-form model output.
///
/// Scanning starts at the first `{` and tracks brace depth, skipping braces
/// that appear inside JSON string literals (escape sequences included). The
/// span is returned as-is; callers still run a strict parse over it.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_object_surrounded_by_prose() {
        let text = "Sure! Here is the analysis:\n```json\n{\"a\": {\"b\": 1}}\n```\nHope it helps {not json}";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_ignores_braces_inside_strings() {
        let text = r#"{"foodName": "Curly } fries {", "note": "say \"}\""} trailing"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"foodName": "Curly } fries {", "note": "say \"}\""}"#)
        );
    }

    #[test]
    fn test_stops_at_first_complete_object() {
        let text = "{\"first\": 1} and then {\"second\": 2}";
        assert_eq!(extract_json_object(text), Some("{\"first\": 1}"));
    }

    #[test]
    fn test_missing_or_unbalanced_object() {
        assert_eq!(extract_json_object("I could not identify this food."), None);
        assert_eq!(extract_json_object("{\"foodName\": \"Banana\", \"nutrition\": {"), None);
        assert_eq!(extract_json_object("} {"), None);
    }

    #[test]
    fn test_handles_multibyte_text() {
        let text = "Voilà: {\"foodName\": \"Crème brûlée 🍮\"} 👍";
        assert_eq!(
            extract_json_object(text),
            Some("{\"foodName\": \"Crème brûlée 🍮\"}")
        );
    }
}
