// dummy_value.rs

/// Placeholder expression of type `ty` used in generated stub bodies
pub fn dummy_value(ty: &str) -> String {
    let ty = ty.trim();

    if ty.starts_with("Vec<") {
        return "vec![]".to_string();
    }
    if ty.starts_with("Option<") {
        return "None".to_string();
    }
    if ty.starts_with('(') && ty.ends_with(')') && ty.len() > 2 {
        return "Default::default()".to_string();
    }

    let value = match ty {
        "()" => "()",
        "String" => "\"example\".to_string()",
        "&str" | "&'static str" => "\"example\"",
        "bool" => "true",
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64" | "u128"
        | "usize" => "42",
        "f32" | "f64" => "3.14",
        "char" => "'x'",
        _ => "Default::default()",
    };
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::dummy_value;

    #[test]
    fn test_string() {
        assert_eq!(dummy_value("String"), "\"example\".to_string()");
    }

    #[test]
    fn test_integers() {
        assert_eq!(dummy_value("i32"), "42");
        assert_eq!(dummy_value("u64"), "42");
    }

    #[test]
    fn test_f64() {
        assert_eq!(dummy_value("f64"), "3.14");
    }

    #[test]
    fn test_bool() {
        assert_eq!(dummy_value("bool"), "true");
    }

    #[test]
    fn test_containers() {
        assert_eq!(dummy_value("Vec<dto::User>"), "vec![]");
        assert_eq!(dummy_value("Option<String>"), "None");
    }

    #[test]
    fn test_unknown_type_defaults() {
        assert_eq!(dummy_value("dto::Profile"), "Default::default()");
        assert_eq!(dummy_value("(String, u32)"), "Default::default()");
    }
}
