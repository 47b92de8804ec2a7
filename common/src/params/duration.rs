use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("duration is empty")]
    Empty,

    #[error("missing unit after `{0}`")]
    MissingUnit(String),

    #[error("missing number before unit `{0}`")]
    MissingNumber(String),

    #[error("unknown duration unit `{0}`")]
    UnknownUnit(String),

    #[error("duration overflows")]
    Overflow,
}

/// Parse a compact duration such as `90s`, `30m`, `1h30m` or `7d`.
///
/// Each component is an unsigned integer followed by one of `ms`, `s`, `m`,
/// `h` or `d`. Components are summed, so `1h30m` is ninety minutes.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let mut total = Duration::ZERO;
    let mut rest = input;

    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(digits);

        let unit_len = tail.find(|c: char| c.is_ascii_digit()).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        if number.is_empty() {
            return Err(DurationParseError::MissingNumber(unit.to_string()));
        }
        if unit.is_empty() {
            return Err(DurationParseError::MissingUnit(number.to_string()));
        }

        let value: u64 = number.parse().map_err(|_| DurationParseError::Overflow)?;
        let component = match unit {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(60 * 60).map(Duration::from_secs),
            "d" => value.checked_mul(24 * 60 * 60).map(Duration::from_secs),
            other => return Err(DurationParseError::UnknownUnit(other.to_string())),
        }
        .ok_or(DurationParseError::Overflow)?;

        total = total
            .checked_add(component)
            .ok_or(DurationParseError::Overflow)?;
        rest = tail;
    }

    Ok(total)
}
