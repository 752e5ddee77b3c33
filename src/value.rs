//! Value canonicalisation against an entry's `value_type` (spec §4.7
//! step 3, §8 boundary behaviors).

use crate::registry::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalizeError;

impl std::fmt::Display for CanonicalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "value does not canonicalise against its declared type")
    }
}
impl std::error::Error for CanonicalizeError {}

pub fn canonicalize(value_type: ValueType, raw: &str) -> Result<String, CanonicalizeError> {
    match value_type {
        ValueType::String => Ok(raw.to_string()),
        ValueType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok("true".to_string()),
            "false" => Ok("false".to_string()),
            _ => Err(CanonicalizeError),
        },
        ValueType::Uint => {
            if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Err(CanonicalizeError);
            }
            raw.parse::<u64>().map(|v| v.to_string()).map_err(|_| CanonicalizeError)
        }
        ValueType::Int => raw.parse::<i64>().map(|v| v.to_string()).map_err(|_| CanonicalizeError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_canonicalises_case_insensitively() {
        assert_eq!(canonicalize(ValueType::Boolean, "TRUE").unwrap(), "true");
        assert_eq!(canonicalize(ValueType::Boolean, "False").unwrap(), "false");
        assert!(canonicalize(ValueType::Boolean, "yes").is_err());
    }

    #[test]
    fn uint_rejects_sign_and_space_and_hex_and_overflow() {
        assert!(canonicalize(ValueType::Uint, "-1").is_err());
        assert!(canonicalize(ValueType::Uint, "").is_err());
        assert!(canonicalize(ValueType::Uint, "1 ").is_err());
        assert!(canonicalize(ValueType::Uint, "0x1").is_err());
        assert!(canonicalize(ValueType::Uint, "99999999999999999999999").is_err());
        assert_eq!(canonicalize(ValueType::Uint, "42").unwrap(), "42");
    }

    #[test]
    fn int_accepts_negative() {
        assert_eq!(canonicalize(ValueType::Int, "-42").unwrap(), "-42");
        assert!(canonicalize(ValueType::Int, "abc").is_err());
    }

    #[test]
    fn string_passes_through() {
        assert_eq!(canonicalize(ValueType::String, "hello world").unwrap(), "hello world");
    }
}
