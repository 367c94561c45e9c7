pub(crate) fn is_valid_ident(s: &str) -> bool {
    !s.is_empty()
        && (s.as_bytes()[0].is_ascii_alphabetic() || s.as_bytes()[0] == b'_')
        && s.as_bytes()[1..]
            .iter()
            .all(|&ch| ch.is_ascii_alphanumeric() || ch == b'_')
}

/// Checks a dotted name such as `foo.Bar`, or `.foo.Bar` if `allow_absolute` is set.
pub(crate) fn is_valid_type_name(s: &str, allow_absolute: bool) -> bool {
    let s = match s.strip_prefix('.') {
        Some(rest) if allow_absolute => rest,
        Some(_) => return false,
        None => s,
    };

    s.split('.').all(is_valid_ident)
}

const SCALAR_TYPES: &[&str] = &[
    "double", "float", "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32",
    "fixed64", "sfixed32", "sfixed64", "bool", "string", "bytes",
];

pub(crate) fn is_scalar_type(s: &str) -> bool {
    SCALAR_TYPES.contains(&s)
}

/// Parses a decimal, hexadecimal (`0x`) or octal (leading `0`) integer literal.
pub(crate) fn parse_int(s: &str) -> Option<i64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if s.len() > 1 && s.starts_with('0') {
        i64::from_str_radix(&s[1..], 8).ok()
    } else if !s.is_empty() && s.bytes().all(|ch| ch.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

#[test]
fn type_names() {
    assert!(is_valid_type_name("foo", false));
    assert!(is_valid_type_name("foo.Bar_2", false));
    assert!(is_valid_type_name(".foo.Bar", true));
    assert!(!is_valid_type_name(".foo.Bar", false));
    assert!(!is_valid_type_name("foo..Bar", true));
    assert!(!is_valid_type_name("foo.", true));
    assert!(!is_valid_type_name("1foo", true));
    assert!(!is_valid_type_name("", true));
}

#[test]
fn int_literals() {
    assert_eq!(parse_int("42"), Some(42));
    assert_eq!(parse_int("0x2A"), Some(42));
    assert_eq!(parse_int("052"), Some(42));
    assert_eq!(parse_int("0"), Some(0));
    assert_eq!(parse_int("09"), None);
    assert_eq!(parse_int("4a"), None);
    assert_eq!(parse_int("+4"), None);
}
