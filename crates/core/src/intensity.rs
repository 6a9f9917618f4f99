//! Intensity (PWM duty cycle) input handling.
//!
//! The text field holds at most three digits. Range checking only happens when
//! a command is built, so `"999"` is a valid field value that clamps to 255.

pub const DEFAULT_INTENSITY: &str = "255";
pub const MAX_DIGITS: usize = 3;
pub const PWM_MIN: u8 = 0;
pub const PWM_MAX: u8 = 255;

/// Keep only ASCII digits, then cut to `MAX_DIGITS`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .take(MAX_DIGITS)
        .collect()
}

/// Parse the field as a base-10 integer and clamp it into `0..=255`.
///
/// Returns `None` when there is no number at all, which means "leave the
/// intensity alone" and must not be confused with zero. Leading whitespace and a
/// sign are accepted; anything after the leading digit run is ignored.
pub fn clamp(input: &str) -> Option<u8> {
    let s = input.trim();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut seen = false;
    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        seen = true;
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if !seen {
        return None;
    }

    let value = if negative { -value } else { value };
    Some(value.clamp(i64::from(PWM_MIN), i64::from(PWM_MAX)) as u8)
}
