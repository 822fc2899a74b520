//! Korean phone-number canonicalization.

/// Canonicalize a phone number.
///
/// Non-digits are stripped, then:
/// - 11 digits starting `010` -> `010-XXXX-XXXX`
/// - 9 digits starting `02` -> `02-XXX-XXXX` (Seoul)
/// - 10 digits starting `02` -> `02-XXXX-XXXX` (Seoul)
/// - any other 10 digits -> `XXX-XXX-XXXX`
///
/// Anything else is returned unchanged with a warning. `None` or an empty
/// string yields `None`.
pub fn normalize_phone(phone: Option<&str>) -> Option<String> {
    let phone = phone?;
    if phone.is_empty() {
        return None;
    }

    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let n = digits.len();

    let formatted = if n == 11 && digits.starts_with("010") {
        Some(format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]))
    } else if n == 9 && digits.starts_with("02") {
        Some(format!("{}-{}-{}", &digits[..2], &digits[2..5], &digits[5..]))
    } else if n == 10 && digits.starts_with("02") {
        Some(format!("{}-{}-{}", &digits[..2], &digits[2..6], &digits[6..]))
    } else if n == 10 {
        Some(format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]))
    } else {
        None
    };

    match formatted {
        Some(f) => Some(f),
        None => {
            tracing::warn!(phone, "unrecognized phone format, keeping original");
            Some(phone.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Option<String> {
        normalize_phone(Some(s))
    }

    #[test]
    fn mobile_numbers() {
        assert_eq!(p("01012345678").as_deref(), Some("010-1234-5678"));
        assert_eq!(p("010-1234-5678").as_deref(), Some("010-1234-5678"));
        assert_eq!(p("010 1234 5678").as_deref(), Some("010-1234-5678"));
    }

    #[test]
    fn seoul_numbers() {
        assert_eq!(p("021234567").as_deref(), Some("02-123-4567"));
        assert_eq!(p("0212345678").as_deref(), Some("02-1234-5678"));
        assert_eq!(p("(02) 1234-5678").as_deref(), Some("02-1234-5678"));
    }

    #[test]
    fn other_area_codes() {
        assert_eq!(p("0311234567").as_deref(), Some("031-123-4567"));
    }

    #[test]
    fn unrecognized_is_returned_unchanged() {
        assert_eq!(p("abc").as_deref(), Some("abc"));
        assert_eq!(p("010-XXXX-XXXX").as_deref(), Some("010-XXXX-XXXX"));
        // 11 digits starting 02 is not a valid Seoul number
        assert_eq!(p("02123456789").as_deref(), Some("02123456789"));
    }

    #[test]
    fn empty_and_missing_are_none() {
        assert_eq!(normalize_phone(None), None);
        assert_eq!(p(""), None);
    }
}
