// Placeholder scanning for message template bodies
//
// A placeholder is a `{identifier}` token where identifier starts with a
// letter or underscore and continues with letters, digits, or underscores.
// Unicode letters are accepted (template keys are often Spanish). Anything
// else between braces is plain text.

/// Sentinel stored in the cached variables field when a body has no placeholders
pub const NONE_SENTINEL: &str = "none";

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Byte length of a `{identifier}` token at the start of `s`, if one is there
fn placeholder_len(s: &str) -> Option<usize> {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, '{')) => {}
        _ => return None,
    }
    let mut seen_ident = false;
    for (idx, c) in chars {
        if c == '}' {
            return if seen_ident { Some(idx + 1) } else { None };
        }
        let valid = if seen_ident {
            is_ident_continue(c)
        } else {
            is_ident_start(c)
        };
        if !valid {
            return None;
        }
        seen_ident = true;
    }
    None
}

/// Find the next placeholder token at or after byte offset `from`.
/// Returns the token's byte range (start, end).
pub(crate) fn next_placeholder(body: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = body.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        // '{' is ASCII, so byte scanning is UTF-8 safe
        if bytes[i] == b'{' {
            if let Some(len) = placeholder_len(&body[i..]) {
                return Some((i, i + len));
            }
        }
        i += 1;
    }
    None
}

/// Extract all placeholder names from a message body, deduplicated in
/// first-appearance order.
pub fn extract(body: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut pos = 0;
    while let Some((start, end)) = next_placeholder(body, pos) {
        let name = &body[start + 1..end - 1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        pos = end;
    }
    names
}

/// Compute the cached variables field for a message body:
/// comma-joined placeholder names, or the 'none' sentinel.
pub fn variables_field(body: &str) -> String {
    let names = extract(body);
    if names.is_empty() {
        NONE_SENTINEL.to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_basic() {
        assert_eq!(
            extract("Hola {nombre}, bienvenido a {empresa}"),
            vec!["nombre", "empresa"]
        );
    }

    #[test]
    fn test_extract_dedup_keeps_first_order() {
        assert_eq!(
            extract("{b} then {a} then {b} again"),
            vec!["b", "a"]
        );
    }

    #[test]
    fn test_extract_ignores_non_identifiers() {
        assert!(extract("set {} or { } or {1x} or {a b}").is_empty());
        assert_eq!(extract("{_ok} and {x1}"), vec!["_ok", "x1"]);
    }

    #[test]
    fn test_extract_unicode_identifiers() {
        assert_eq!(extract("Feliz {año} nuevo"), vec!["año"]);
    }

    #[test]
    fn test_extract_unclosed_brace() {
        assert!(extract("broken {nombre").is_empty());
    }

    #[test]
    fn test_extract_adjacent_braces() {
        // The outer '{' is plain text; the inner token still counts
        assert_eq!(extract("{{nombre}}"), vec!["nombre"]);
    }

    #[test]
    fn test_variables_field() {
        assert_eq!(variables_field("sin variables"), "none");
        assert_eq!(
            variables_field("Hola {nombre}, {nombre}, {email}"),
            "nombre, email"
        );
    }
}
