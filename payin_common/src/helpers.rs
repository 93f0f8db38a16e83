use std::{fmt::Display, str::FromStr};

/// Parse a boolean flag from an environment value, falling back to `default` when the value is absent or not
/// recognisable.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse a numeric environment value. A missing value yields `Ok(default)`; a malformed one yields the parse error
/// message so that the caller can log it and decide what to do.
pub fn parse_number<T>(value: Option<String>, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        None => Ok(default),
        Some(s) => s.trim().parse::<T>().map_err(|e| format!("'{s}' is not a valid number. {e}")),
    }
}
