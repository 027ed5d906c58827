//! SQL identifier checks and quoting.
//!
//! Schema column names, table names and parameter names are all plain
//! identifiers: `[A-Za-z_][A-Za-z0-9_]*`. Anything else is rejected when the
//! schema is built or when a name is resolved, so rendered SQL never has to
//! escape user-supplied text.

/// Check whether `s` is a plain identifier.
pub fn is_plain_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Quote an identifier for Postgres-protocol dialects.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(is_plain_ident("users"));
        assert!(is_plain_ident("_private"));
        assert!(is_plain_ident("q0_min_age"));
    }

    #[test]
    fn rejects_everything_else() {
        assert!(!is_plain_ident(""));
        assert!(!is_plain_ident("1users"));
        assert!(!is_plain_ident("users.name"));
        assert!(!is_plain_ident("users; drop table users"));
        assert!(!is_plain_ident("na me"));
    }

    #[test]
    fn quotes_and_escapes() {
        assert_eq!(quote_ident("age"), "\"age\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
