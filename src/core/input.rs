/// Reads a user-entered amount such as `"R 1 250 000"` or `"12.5%"`.
///
/// Everything except digits, `.` and `-` is dropped before parsing; anything
/// that still does not parse to a finite number reads as zero.
pub fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}
