//! Decimal price string -> integer micros, without floats.

use std::fmt;

use oms_schemas::MICROS_SCALE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// A price string was empty.
    Empty { field: &'static str },
    /// Not a plain decimal number (or out of range).
    Invalid { field: &'static str, raw: String },
    /// More than 6 decimal places would need rounding.
    TooManyDecimalPlaces { field: &'static str, raw: String },
}

impl fmt::Display for PriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceError::Empty { field } => write!(f, "price field '{field}' is empty"),
            PriceError::Invalid { field, raw } => {
                write!(f, "price field '{field}' could not be parsed: '{raw}'")
            }
            PriceError::TooManyDecimalPlaces { field, raw } => write!(
                f,
                "price field '{field}' has more than 6 decimal places: '{raw}'"
            ),
        }
    }
}

impl std::error::Error for PriceError {}

/// Parse `"29900"`, `"12.5"`, `"-1000"`, `"1,000"` into micros.
///
/// Thousands separators (`,`) are accepted and ignored; exponents are not.
pub fn price_to_micros(s: &str, field: &'static str) -> Result<i64, PriceError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(PriceError::Empty { field });
    }
    let invalid = || PriceError::Invalid {
        field,
        raw: s.to_string(),
    };

    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    let (negative, digits) = if let Some(rest) = cleaned.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = cleaned.strip_prefix('+') {
        (false, rest)
    } else {
        (false, cleaned.as_str())
    };

    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(invalid());
    }
    if frac_part.len() > 6 {
        return Err(PriceError::TooManyDecimalPlaces {
            field,
            raw: s.to_string(),
        });
    }

    let int_val: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse::<i64>().map_err(|_| invalid())?
    };
    let frac_val: i64 = format!("{frac_part:0<6}").parse::<i64>().map_err(|_| invalid())?;

    let micros = int_val
        .checked_mul(MICROS_SCALE)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(invalid)?;

    Ok(if negative { -micros } else { micros })
}

/// Optional amount, defaulting when absent or blank.
pub fn optional_price_to_micros(
    s: Option<&str>,
    field: &'static str,
) -> Result<Option<i64>, PriceError> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => price_to_micros(v, field).map(Some),
    }
}
