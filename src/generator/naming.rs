//! Casing helpers shared by every template.
//!
//! All conversions are pure so two runs over the same metadata render the same bytes.

use convert_case::{Case, Casing};

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "gen",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// `user_account` / `userAccount` -> `UserAccount`
pub fn to_pascal(s: &str) -> String {
    s.to_case(Case::Pascal)
}

/// `SayHello` / `sayHello` -> `say_hello`
pub fn to_snake(s: &str) -> String {
    s.to_case(Case::Snake)
}

/// True for strict and reserved Rust keywords
pub fn is_keyword(s: &str) -> bool {
    RUST_KEYWORDS.contains(&s)
}

/// Snake-case identifier for a column or module, raw-escaped when it is a keyword
pub fn field_ident(column: &str) -> String {
    let snake = to_snake(column);
    let snake = if snake.is_empty() || snake.starts_with(|c: char| c.is_ascii_digit()) {
        format!("f_{snake}")
    } else {
        snake
    };
    match snake.as_str() {
        // `r#self` and friends are not valid raw identifiers
        "self" | "super" | "crate" => format!("{snake}_"),
        _ if is_keyword(&snake) => format!("r#{snake}"),
        _ => snake,
    }
}

/// Naive plural used for batch and list method names (`user` -> `users`)
pub fn plural(s: &str) -> String {
    format!("{s}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casing() {
        assert_eq!(to_pascal("user_account"), "UserAccount");
        assert_eq!(to_snake("SayHello"), "say_hello");
    }

    #[test]
    fn field_idents_are_valid_rust() {
        assert_eq!(field_ident("CreatedAt"), "created_at");
        assert_eq!(field_ident("type"), "r#type");
        assert_eq!(field_ident("self"), "self_");
    }
}
