use serde_json::Value;

use super::PropertyMap;
use super::PropertySourceReader;
use crate::DecodeError;

/// Reader for `.properties` documents
///
/// Supports `=`, `:` and whitespace separators, `#`/`!` comments, backslash
/// line continuations and the usual escapes including `\uXXXX`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertiesPropertySourceReader;

impl PropertySourceReader for PropertiesPropertySourceReader {
    fn read(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> std::result::Result<PropertyMap, DecodeError> {
        let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::Properties {
            name: name.to_string(),
            line: 0,
            reason: e.to_string(),
        })?;

        let mut properties = PropertyMap::new();
        for (line_no, logical) in logical_lines(text) {
            let (key, value) = split_entry(&logical);
            let key = unescape(key).map_err(|reason| DecodeError::Properties {
                name: name.to_string(),
                line: line_no,
                reason,
            })?;
            let value = unescape(value).map_err(|reason| DecodeError::Properties {
                name: name.to_string(),
                line: line_no,
                reason,
            })?;
            properties.insert(key, Value::String(value));
        }
        Ok(properties)
    }
}

/// Joins continued lines; yields the 1-based number of the first physical line.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut result = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_start();
        match current.as_mut() {
            Some((_, buf)) => buf.push_str(line),
            None => {
                if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                    continue;
                }
                current = Some((idx + 1, line.to_string()));
            }
        }

        let continued = current.as_ref().map(|(_, buf)| ends_with_continuation(buf)).unwrap_or(false);
        if continued {
            if let Some((_, buf)) = current.as_mut() {
                buf.pop();
            }
        } else if let Some(done) = current.take() {
            result.push(done);
        }
    }

    if let Some(done) = current.take() {
        result.push(done);
    }
    result
}

/// An odd number of trailing backslashes continues the line
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '=' | ':' => return (line[..idx].trim_end(), line[idx + 1..].trim_start()),
            c if c.is_whitespace() => {
                let key = &line[..idx];
                let rest = line[idx..].trim_start();
                let rest = rest.strip_prefix(['=', ':']).map(str::trim_start).unwrap_or(rest);
                return (key, rest);
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(raw: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .ok_or_else(|| format!("malformed \\u escape: \\u{hex}"))?;
                let decoded = char::from_u32(code).ok_or_else(|| format!("invalid code point \\u{hex}"))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}
