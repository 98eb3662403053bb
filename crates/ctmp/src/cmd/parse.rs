use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};

/// `5s`, `500ms`, or a bare number of seconds. Zero is rejected.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

/// Hex digits to bytes. Whitespace and an optional `0x` prefix are ignored.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let digits: Vec<u8> = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("hex input has an odd number of digits: {input}"),
        ));
    }

    digits
        .chunks_exact(2)
        .map(|pair| match (nibble(pair[0]), nibble(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(CliError::new(USAGE, format!("invalid hex input: {input}"))),
        })
        .collect()
}

/// Exactly one byte of hex.
pub fn parse_byte(input: &str) -> CliResult<u8> {
    match parse_hex(input)?.as_slice() {
        [byte] => Ok(*byte),
        _ => Err(CliError::new(
            USAGE,
            format!("expected a single hex byte, got: {input}"),
        )),
    }
}

fn nibble(digit: u8) -> Option<u8> {
    char::from(digit).to_digit(16).map(|value| value as u8)
}
