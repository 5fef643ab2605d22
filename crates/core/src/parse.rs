//! Permissive decimal parsing for the numeric settings.
//!
//! Mirrors the classic `strtoul(…, 10)` contract used by proc-style write
//! handlers: the longest run of ASCII digits at the start of the input is
//! the value, anything after it is ignored.

use crate::error::CoreError;

/// Upper bound on the number of input bytes inspected by a numeric write.
///
/// Writers may hand over arbitrarily large buffers; only this prefix is
/// looked at and nothing is copied.
pub const NUMERIC_INPUT_CAPACITY: usize = 64;

/// Parse the leading decimal digits of `input`.
///
/// Values beyond `u32::MAX` saturate. Returns [`CoreError::NoDigits`] when
/// the input does not start with a digit.
pub fn parse_leading_decimal(input: &[u8]) -> Result<u32, CoreError> {
    let window = &input[..input.len().min(NUMERIC_INPUT_CAPACITY)];

    let digits = window
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .map(|b| u32::from(b - b'0'));

    let mut value: u32 = 0;
    let mut seen = 0usize;
    for digit in digits {
        value = value.saturating_mul(10).saturating_add(digit);
        seen += 1;
    }

    if seen == 0 {
        return Err(CoreError::NoDigits(
            String::from_utf8_lossy(window).into_owned(),
        ));
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
