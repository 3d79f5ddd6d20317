//! Display/raw amount conversion (§3.1). HTTP carries decimal strings in
//! display units; everything else in this server is raw base-unit `u128`.

use crate::constants::RAW_EXPONENT;
use crate::error::PaymentError;
use crate::types::Amount;

pub fn raw_to_display(raw: Amount) -> String {
    let exp = RAW_EXPONENT as usize;
    let digits = raw.to_string();
    let padded = if digits.len() <= exp {
        format!("{:0>width$}", digits, width = exp + 1)
    } else {
        digits
    };
    let split_at = padded.len() - exp;
    let (int_part, frac_part) = padded.split_at(split_at);
    let frac_trimmed = frac_part.trim_end_matches('0');
    if frac_trimmed.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_trimmed}")
    }
}

pub fn display_to_raw(s: &str) -> Result<Amount, PaymentError> {
    let exp = RAW_EXPONENT as usize;
    let s = s.trim();
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PaymentError::validation("invalid amount"));
    }
    if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PaymentError::validation("invalid amount"));
    }
    if frac_part.len() > exp {
        return Err(PaymentError::validation("amount has too many decimal places"));
    }

    let mut digits = String::with_capacity(int_part.len() + exp);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    digits.push_str(&"0".repeat(exp - frac_part.len()));

    digits
        .parse::<Amount>()
        .map_err(|_| PaymentError::validation("amount out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_whole_number() {
        let raw = display_to_raw("1000").unwrap();
        assert_eq!(raw_to_display(raw), "1000");
    }

    #[test]
    fn round_trips_a_fraction() {
        let raw = display_to_raw("0.5").unwrap();
        assert_eq!(raw_to_display(raw), "0.5");
    }

    #[test]
    fn rejects_too_many_decimal_places() {
        let exp = RAW_EXPONENT as usize;
        let over = format!("1.{}", "1".repeat(exp + 1));
        assert!(display_to_raw(&over).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(display_to_raw("abc").is_err());
        assert!(display_to_raw("").is_err());
    }
}
