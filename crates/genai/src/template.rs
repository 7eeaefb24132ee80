//! Minimal placeholder rendering for the fixed prompt templates.
//!
//! `{{path.to.field}}` is replaced by the field's value from the serialized
//! input; missing fields render empty. `{{media url=field}}` splits the
//! prompt and inserts the field as a media part.

use serde_json::Value;

use crate::model::Part;

const MEDIA_TAG: &str = "media url=";

pub fn render(template: &str, vars: &Value) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        text.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };

        let tag = after[..end].trim();
        match tag.strip_prefix(MEDIA_TAG) {
            Some(path) => {
                if !text.is_empty() {
                    parts.push(Part::Text(std::mem::take(&mut text)));
                }
                parts.push(Part::Media(lookup(vars, path.trim())));
            }
            None => text.push_str(&lookup(vars, tag)),
        }
        rest = &after[end + 2..];
    }

    text.push_str(rest);
    if !text.is_empty() {
        parts.push(Part::Text(text));
    }
    parts
}

fn lookup(vars: &Value, path: &str) -> String {
    let value = path.split('.').try_fold(vars, |v, key| v.get(key));
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_substitution() {
        let vars = json!({ "name": "Campinas", "stats": { "area": 795.7 } });
        let parts = render("City {{name}}, area {{ stats.area }} km², {{missing}}.", &vars);
        assert_eq!(parts, vec![Part::Text("City Campinas, area 795.7 km², .".into())]);
    }

    #[test]
    fn test_media_splits_parts() {
        let vars = json!({ "a": "data:image/png;base64,AAAA", "b": "data:image/png;base64,BBBB" });
        let parts = render("First: {{media url=a}}\nSecond: {{media url=b}}", &vars);
        assert_eq!(
            parts,
            vec![
                Part::Text("First: ".into()),
                Part::Media("data:image/png;base64,AAAA".into()),
                Part::Text("\nSecond: ".into()),
                Part::Media("data:image/png;base64,BBBB".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_placeholder_kept_verbatim() {
        let parts = render("broken {{name", &json!({ "name": "x" }));
        assert_eq!(parts, vec![Part::Text("broken {{name".into())]);
    }
}
