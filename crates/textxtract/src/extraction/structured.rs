//! JSON and CSV to plain text.
use crate::{Result, TextxtractError};
use serde_json::Value;

/// Flatten a JSON document into `path: value` lines in document order.
///
/// Object keys are joined with `.`, array indices use `[i]`. Empty objects and
/// arrays produce no line.
///
/// # Example
///
/// ```rust
/// use textxtract::extraction::structured::json_to_text;
///
/// let text = json_to_text(r#"{"name": "Ada", "tags": ["math", "code"]}"#).unwrap();
/// assert_eq!(text, "name: Ada\ntags[0]: math\ntags[1]: code");
/// ```
pub fn json_to_text(json: &str) -> Result<String> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| TextxtractError::invalid_file_with_source(format!("Invalid JSON: {}", e), e))?;

    let mut lines = Vec::new();
    flatten_json(&value, String::new(), &mut lines);
    Ok(lines.join("\n"))
}

fn flatten_json(value: &Value, path: String, lines: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                flatten_json(child, child_path, lines);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_json(child, format!("{}[{}]", path, index), lines);
            }
        }
        scalar => {
            let rendered = match scalar {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if path.is_empty() {
                lines.push(rendered);
            } else {
                lines.push(format!("{}: {}", path, rendered));
            }
        }
    }
}

/// Parse RFC 4180 CSV into rows of cells.
///
/// Quoted fields may contain the delimiter, doubled quotes and line breaks.
///
/// # Errors
///
/// `InvalidFile` on an unterminated quoted field or stray characters after a
/// closing quote.
pub fn parse_csv(input: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut after_quote = false;
    let mut line = 1usize;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => {
                    in_quotes = false;
                    after_quote = true;
                }
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                other => field.push(other),
            }
            continue;
        }

        match ch {
            c if c == delimiter => {
                row.push(std::mem::take(&mut field));
                after_quote = false;
            }
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                after_quote = false;
                line += 1;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '"' if field.is_empty() && !after_quote => in_quotes = true,
            other if after_quote => {
                return Err(TextxtractError::invalid_file(format!(
                    "Malformed CSV on line {}: unexpected '{}' after closing quote",
                    line, other
                )));
            }
            other => field.push(other),
        }
    }

    if in_quotes {
        return Err(TextxtractError::invalid_file(format!(
            "Malformed CSV: unterminated quoted field starting before line {}",
            line
        )));
    }

    if !field.is_empty() || !row.is_empty() || after_quote {
        row.push(field);
        rows.push(row);
    }

    Ok(rows)
}

/// Render CSV as text: cells joined with `", "`, one row per line, blank rows dropped.
///
/// # Example
///
/// ```rust
/// use textxtract::extraction::structured::csv_to_text;
///
/// let text = csv_to_text("name,city\n\"Lovelace, Ada\",London\n", ',').unwrap();
/// assert_eq!(text, "name, city\nLovelace, Ada, London");
/// ```
pub fn csv_to_text(input: &str, delimiter: char) -> Result<String> {
    let rows = parse_csv(input, delimiter)?;
    let lines: Vec<String> = rows
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| {
            row.iter()
                .map(|cell| cell.trim())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect();
    Ok(lines.join("\n"))
}
