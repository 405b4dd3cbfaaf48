use std::time::Duration;

/// Parse a duration, given in whole seconds, from a string value, or return the given default otherwise.
pub fn parse_duration_secs(value: Option<String>, default: Duration) -> Duration {
    value.and_then(|v| v.trim().parse::<u64>().ok()).map(Duration::from_secs).unwrap_or(default)
}

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
