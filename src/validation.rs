//! Reusable validation rules.
//!
//! Each helper inspects one field of an attribute mapping and appends a
//! message to `errors` when the rule is violated. Absent (null) values pass
//! every rule except [`presence`]; combine with it where a field is required.

use crate::framework::{Attributes, Errors, Value};
use once_cell::sync::Lazy;
use regex::Regex;

pub static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid digits regex"));
pub static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid identifier regex"));
pub static POSTAL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9 -]+$").expect("valid postal code regex"));
pub static EXPIRATION_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])/(\d{2}|\d{4})$").expect("valid expiration regex"));

fn field<'a>(attrs: &'a Attributes, name: &str) -> Option<&'a Value> {
    attrs.get(name).filter(|v| !v.is_null())
}

/// Textual view; numbers are rendered the way they were given.
fn text(value: &Value) -> String {
    value.to_string()
}

pub fn presence(attrs: &Attributes, errors: &mut Errors, name: &str) -> bool {
    let present = attrs.get(name).is_some_and(|v| !v.is_blank());
    if !present {
        errors.add(name, "can't be blank");
    }
    present
}

pub fn length_at_most(attrs: &Attributes, errors: &mut Errors, name: &str, max: usize) {
    if let Some(value) = field(attrs, name) {
        if text(value).chars().count() > max {
            errors.add(name, format!("is too long (maximum is {max} characters)"));
        }
    }
}

pub fn length_within(attrs: &Attributes, errors: &mut Errors, name: &str, min: usize, max: usize) {
    if let Some(value) = field(attrs, name) {
        let len = text(value).chars().count();
        if len < min {
            errors.add(name, format!("is too short (minimum is {min} characters)"));
        } else if len > max {
            errors.add(name, format!("is too long (maximum is {max} characters)"));
        }
    }
}

pub fn format_matches(attrs: &Attributes, errors: &mut Errors, name: &str, pattern: &Regex) {
    if let Some(value) = field(attrs, name) {
        if !pattern.is_match(&text(value)) {
            errors.add(name, "is invalid");
        }
    }
}

pub fn exclusion(attrs: &Attributes, errors: &mut Errors, name: &str, reserved: &[&str]) {
    if let Some(value) = field(attrs, name) {
        if reserved.contains(&text(value).as_str()) {
            errors.add(name, "is reserved");
        }
    }
}

pub fn inclusion(attrs: &Attributes, errors: &mut Errors, name: &str, allowed: &[&str]) {
    if let Some(value) = field(attrs, name) {
        if !allowed.contains(&text(value).as_str()) {
            errors.add(name, "is not included in the list");
        }
    }
}

pub fn numericality_positive(attrs: &Attributes, errors: &mut Errors, name: &str) {
    if let Some(value) = field(attrs, name) {
        match value.as_f64().filter(|n| n.is_finite()) {
            None => errors.add(name, "is not a number"),
            Some(n) if n <= 0.0 => errors.add(name, "must be greater than 0"),
            Some(_) => {}
        }
    }
}

pub fn luhn_10(attrs: &Attributes, errors: &mut Errors, name: &str) {
    if let Some(value) = field(attrs, name) {
        if !luhn_valid(&text(value)) {
            errors.add(name, "failed Luhn 10 validation");
        }
    }
}

/// Luhn mod-10 checksum over a string of digits.
pub fn luhn_valid(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = number
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum();
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    #[test]
    fn luhn_accepts_known_good_numbers() {
        let mut errors = Errors::new();
        luhn_10(&attrs! { "number" => "5454545454545454" }, &mut errors, "number");
        luhn_10(&attrs! { "number" => 4111111111111111i64 }, &mut errors, "number");
        assert!(errors.is_empty());
    }

    #[test]
    fn luhn_rejects_bad_checksum() {
        let mut errors = Errors::new();
        luhn_10(&attrs! { "number" => "1234567890123456" }, &mut errors, "number");
        assert_eq!(errors.on("number"), vec!["failed Luhn 10 validation"]);
    }

    #[test]
    fn absent_values_pass_format_rules() {
        let mut errors = Errors::new();
        let empty = Attributes::new();
        length_at_most(&empty, &mut errors, "company", 3);
        format_matches(&empty, &mut errors, "postal_code", &POSTAL_CODE);
        numericality_positive(&empty, &mut errors, "amount");
        assert!(errors.is_empty());
        assert!(!presence(&empty, &mut errors, "amount"));
        assert_eq!(errors.on("amount"), vec!["can't be blank"]);
    }

    #[test]
    fn lengths_count_characters() {
        let mut errors = Errors::new();
        length_at_most(&attrs! { "name" => "ab" }, &mut errors, "name", 2);
        assert!(errors.is_empty());
        length_at_most(&attrs! { "name" => "abc" }, &mut errors, "name", 2);
        assert_eq!(errors.on("name"), vec!["is too long (maximum is 2 characters)"]);
    }

    #[test]
    fn positive_numbers_accept_decimal_strings() {
        let mut errors = Errors::new();
        numericality_positive(&attrs! { "amount" => "10.00" }, &mut errors, "amount");
        assert!(errors.is_empty());
        numericality_positive(&attrs! { "amount" => "0" }, &mut errors, "amount");
        numericality_positive(&attrs! { "amount" => "ten" }, &mut errors, "amount");
        assert_eq!(errors.on("amount"), vec!["must be greater than 0", "is not a number"]);
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for amount in ["inf", "-inf", "1e400", "NaN"] {
            let mut errors = Errors::new();
            numericality_positive(&attrs! { "amount" => amount }, &mut errors, "amount");
            assert_eq!(errors.on("amount"), vec!["is not a number"], "{amount}");
        }
        let mut errors = Errors::new();
        numericality_positive(&attrs! { "amount" => f64::INFINITY }, &mut errors, "amount");
        assert!(errors.has("amount"));
    }

    #[test]
    fn expiration_dates() {
        for good in ["01/2030", "12/30"] {
            assert!(EXPIRATION_DATE.is_match(good), "{good}");
        }
        for bad in ["13/2030", "1/2030", "2030-01"] {
            assert!(!EXPIRATION_DATE.is_match(bad), "{bad}");
        }
    }
}
