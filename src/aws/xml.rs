//! Minimal XML element extraction for AWS Query API responses
//!
//! Query responses are shallow, attribute-free documents with unique
//! element names per level, so locating elements by name is enough.
//! Same-name nesting is not supported.

use crate::error::{Error, Result};

/// Raw inner content of every `<tag>` element, in document order
///
/// Self-closing elements (`<tag/>`) yield an empty string.
pub fn elements<'a>(doc: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut found = Vec::new();
    let mut rest = doc;

    while let Some(start) = rest.find(&open) {
        let after_name = &rest[start + open.len()..];
        // `<Marker` must not match `<MarkerFoo>`
        match after_name.chars().next() {
            Some('>' | '/' | ' ' | '\t' | '\r' | '\n') => {}
            _ => {
                rest = after_name;
                continue;
            }
        }

        let Some(gt) = after_name.find('>') else {
            break;
        };
        if after_name[..gt].ends_with('/') {
            found.push("");
            rest = &after_name[gt + 1..];
            continue;
        }

        let content = &after_name[gt + 1..];
        let Some(end) = content.find(&close) else {
            break;
        };
        found.push(&content[..end]);
        rest = &content[end + close.len()..];
    }

    found
}

/// Raw inner content of the first `<tag>` element
pub fn element<'a>(doc: &'a str, tag: &str) -> Option<&'a str> {
    elements(doc, tag).into_iter().next()
}

/// Unescaped text of the first `<tag>` element
pub fn element_text(doc: &str, tag: &str) -> Option<String> {
    element(doc, tag).map(unescape)
}

/// Unescaped text of a required element
pub fn required_text(doc: &str, tag: &str) -> Result<String> {
    element_text(doc, tag).ok_or_else(|| Error::xml(format!("missing <{tag}> element")))
}

/// Replace XML entity and character references
pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];

        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                // Not an entity we know; keep the ampersand literally
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
