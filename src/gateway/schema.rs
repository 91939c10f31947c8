//! Per-kind rules of the in-memory vault: identifier assignment, remote
//! validation (with the vault's opaque error codes) and card vaulting.

use crate::framework::{ApiError, ApiErrorKind, Attributes, FieldError, Value};
use crate::validation::{luhn_valid, EXPIRATION_DATE, IDENTIFIER, POSTAL_CODE};

pub const CUSTOMER: &str = "customer";
pub const ADDRESS: &str = "address";
pub const CREDIT_CARD: &str = "credit_card";
pub const TRANSACTION: &str = "transaction";

/// Remote validation codes.
pub mod codes {
    pub const CUSTOMER_ID_TAKEN: &str = "91609";
    pub const CUSTOMER_ID_INVALID: &str = "91610";
    pub const CUSTOMER_ID_REQUIRED: &str = "91704";
    pub const POSTAL_CODE_INVALID: &str = "81813";
    pub const CARD_NUMBER_INVALID: &str = "81715";
    pub const CVV_INVALID: &str = "81707";
    pub const EXPIRATION_INVALID: &str = "81712";
    pub const AMOUNT_INVALID: &str = "81503";
    pub const TRANSACTION_TYPE_INVALID: &str = "91523";
    pub const PAYMENT_METHOD_INVALID: &str = "91518";
}

/// Static facts about one stored kind.
#[derive(Debug)]
pub struct KindSchema {
    pub kind: &'static str,
    pub id_attribute: &'static str,
    /// Prefix of generated identifiers; `None` means plain numbers.
    pub id_prefix: Option<&'static str>,
}

pub const SCHEMAS: &[KindSchema] = &[
    KindSchema {
        kind: CUSTOMER,
        id_attribute: "id",
        id_prefix: None,
    },
    KindSchema {
        kind: ADDRESS,
        id_attribute: "id",
        id_prefix: Some("addr_"),
    },
    KindSchema {
        kind: CREDIT_CARD,
        id_attribute: "token",
        id_prefix: Some("card_"),
    },
    KindSchema {
        kind: TRANSACTION,
        id_attribute: "id",
        id_prefix: Some("txn_"),
    },
];

pub fn schema(kind: &str) -> Result<&'static KindSchema, ApiError> {
    SCHEMAS.iter().find(|s| s.kind == kind).ok_or_else(|| {
        ApiError::with_kind(ApiErrorKind::Unexpected, format!("unknown resource kind: {kind}"))
    })
}

fn text(attrs: &Attributes, name: &str) -> Option<String> {
    attrs.get(name).filter(|v| !v.is_null()).map(Value::to_string)
}

pub fn check_customer(attrs: &Attributes) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if let Some(id) = text(attrs, "id") {
        if !IDENTIFIER.is_match(&id) || id.len() > 36 || id == "all" || id == "new" {
            errors.push(FieldError::with_code("id", "is invalid", codes::CUSTOMER_ID_INVALID));
        }
    }
    errors
}

pub fn check_address(attrs: &Attributes) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if text(attrs, "customer_id").is_none() {
        errors.push(FieldError::with_code("customer_id", "is required", codes::CUSTOMER_ID_REQUIRED));
    }
    if let Some(code) = text(attrs, "postal_code") {
        if !POSTAL_CODE.is_match(&code) || code.len() > 9 {
            errors.push(FieldError::with_code("postal_code", "is invalid", codes::POSTAL_CODE_INVALID));
        }
    }
    errors
}

/// Card data rules. `number` is only mandatory for new cards.
pub fn check_card(attrs: &Attributes, new: bool) -> Vec<FieldError> {
    let mut errors = Vec::new();
    match text(attrs, "number") {
        Some(number) => {
            if !(12..=19).contains(&number.len()) || !luhn_valid(&number) {
                errors.push(FieldError::with_code("number", "is invalid", codes::CARD_NUMBER_INVALID));
            }
        }
        None if new => {
            errors.push(FieldError::with_code("number", "is required", codes::CARD_NUMBER_INVALID));
        }
        None => {}
    }
    if let Some(cvv) = text(attrs, "cvv") {
        if !(3..=4).contains(&cvv.len()) || !cvv.bytes().all(|b| b.is_ascii_digit()) {
            errors.push(FieldError::with_code("cvv", "is invalid", codes::CVV_INVALID));
        }
    }
    if new && expiration(attrs).is_none() {
        errors.push(FieldError::with_code(
            "expiration_date",
            "is invalid",
            codes::EXPIRATION_INVALID,
        ));
    }
    errors
}

pub fn check_transaction(attrs: &Attributes) -> Vec<FieldError> {
    let mut errors = Vec::new();
    match attrs.get("amount").and_then(Value::as_f64) {
        Some(amount) if amount.is_finite() && amount > 0.0 => {}
        _ => errors.push(FieldError::with_code("amount", "is invalid", codes::AMOUNT_INVALID)),
    }
    match text(attrs, "type").as_deref() {
        Some("sale") | Some("credit") => {}
        _ => errors.push(FieldError::with_code(
            "type",
            "is invalid",
            codes::TRANSACTION_TYPE_INVALID,
        )),
    }
    errors
}

/// `(month, four-digit year)` from `expiration_date` or the month/year pair.
pub fn expiration(attrs: &Attributes) -> Option<(u32, u32)> {
    if let Some(date) = text(attrs, "expiration_date") {
        let captures = EXPIRATION_DATE.captures(&date)?;
        let month = captures[1].parse().ok()?;
        let year: u32 = captures[2].parse().ok()?;
        return Some((month, if year < 100 { 2000 + year } else { year }));
    }
    let month = attrs.get("expiration_month")?.as_i64()?;
    let year = attrs.get("expiration_year")?.as_i64()?;
    if !(1..=12).contains(&month) || year < 0 {
        return None;
    }
    let year = if year < 100 { 2000 + year } else { year };
    Some((u32::try_from(month).ok()?, u32::try_from(year).ok()?))
}

fn card_type(number: &str) -> &'static str {
    match number.as_bytes().first() {
        Some(b'4') => "Visa",
        Some(b'5') => "MasterCard",
        Some(b'3') => "American Express",
        Some(b'6') => "Discover",
        _ => "Unknown",
    }
}

/// Replaces raw card data with what the vault keeps: `bin`, `last_4`,
/// `masked_number`, `card_type` and a normalized expiration.
pub fn vault_card(attrs: &mut Attributes) {
    if let Some(number) = attrs.remove("number").map(|v| v.to_string()) {
        let bin = &number[..6.min(number.len())];
        let last_4 = &number[number.len().saturating_sub(4)..];
        attrs.insert("bin".into(), bin.into());
        attrs.insert("last_4".into(), last_4.into());
        attrs.insert("masked_number".into(), format!("{bin}******{last_4}").into());
        attrs.insert("card_type".into(), card_type(&number).into());
    }
    attrs.remove("cvv");
    if let Some((month, year)) = expiration(attrs) {
        attrs.insert("expiration_month".into(), format!("{month:02}").into());
        attrs.insert("expiration_year".into(), year.to_string().into());
        attrs.insert("expiration_date".into(), format!("{month:02}/{year}").into());
    }
}
