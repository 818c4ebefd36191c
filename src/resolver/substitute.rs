// Variable substitution for resolved message templates

use std::collections::HashMap;
use crate::resolver::placeholder::next_placeholder;

/// Contact keys that default to the empty string when the caller does not
/// supply them. Everything else stays literal when missing.
pub const DEFAULT_KEYS: &[&str] = &["name", "email", "phone", "company"];

/// Fill `{placeholder}` tokens in a message body.
///
/// For each token: use the supplied value if the key is present; otherwise
/// the empty string for the defaulted contact keys; otherwise leave the token
/// untouched. Substitution never fails.
pub fn fill(body: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(body.len());
    let mut pos = 0;
    while let Some((start, end)) = next_placeholder(body, pos) {
        out.push_str(&body[pos..start]);
        let key = &body[start + 1..end - 1];
        if let Some(value) = vars.get(key) {
            out.push_str(value);
        } else if DEFAULT_KEYS.contains(&key) {
            // defaulted contact key with no value: empty string
        } else {
            // unknown key: keep the token literal
            out.push_str(&body[start..end]);
        }
        pos = end;
    }
    out.push_str(&body[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fill_supplied_value() {
        let result = fill(
            "Hola {nombre}, bienvenido a {empresa}",
            &vars(&[("nombre", "Ana")]),
        );
        assert_eq!(result, "Hola Ana, bienvenido a {empresa}");
    }

    #[test]
    fn test_fill_default_keys_empty() {
        let result = fill("Hi {name} from {company}!", &vars(&[]));
        assert_eq!(result, "Hi  from !");
    }

    #[test]
    fn test_fill_supplied_beats_default() {
        let result = fill("Hi {name}", &vars(&[("name", "Ana")]));
        assert_eq!(result, "Hi Ana");
    }

    #[test]
    fn test_fill_unknown_key_stays_literal() {
        let result = fill("Tu plan {plan} sigue activo", &vars(&[]));
        assert_eq!(result, "Tu plan {plan} sigue activo");
    }

    #[test]
    fn test_fill_idempotent_without_placeholders() {
        let body = "Gracias por escribirnos.";
        assert_eq!(fill(body, &vars(&[("nombre", "Ana")])), body);
        assert_eq!(fill(body, &vars(&[])), body);
    }

    #[test]
    fn test_fill_malformed_tokens_untouched() {
        let body = "{} { } {1x} {a b} {sin_cierre";
        assert_eq!(fill(body, &vars(&[("a", "x")])), body);
    }

    #[test]
    fn test_fill_repeated_token() {
        let result = fill("{nombre} y {nombre}", &vars(&[("nombre", "Ana")]));
        assert_eq!(result, "Ana y Ana");
    }
}
