use crate::framework::{
    AssociationTable, Attributes, Collection, CollectionScope, Errors, HasMany, OwnerRef, Record,
    RecordResult, Resource, SingleAssociation,
};
use crate::resources::address::{self, Address};
use crate::resources::customer::Customer;
use crate::resources::transaction::CardTransactions;
use crate::validation::{
    format_matches, length_at_most, length_within, luhn_10, presence, DIGITS, EXPIRATION_DATE,
};
use once_cell::sync::Lazy;
use regex::Regex;

static CVV: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3,4}$").expect("valid cvv regex"));

/// A card vaulted under a customer, identified by its `token`.
pub struct CreditCard;

pub type CreditCardRecord = Record<CreditCard>;

pub const CUSTOMER: SingleAssociation<Customer> =
    SingleAssociation::belongs_to("customer", "customer_id");
pub const BILLING_ADDRESS: SingleAssociation<Address> =
    SingleAssociation::has_one("billing_address", Some("billing_address"));
pub const TRANSACTIONS: HasMany<CardTransactions> = HasMany::new("transactions");

static ASSOCIATIONS: AssociationTable = AssociationTable::new(&[
    CUSTOMER.descriptor(),
    BILLING_ADDRESS.descriptor(),
    TRANSACTIONS.descriptor(),
]);

/// Rules for card data submitted to the vault. Shared with customers that
/// carry a nested card.
pub fn validate_new_card(attrs: &Attributes, errors: &mut Errors) {
    if presence(attrs, errors, "number") {
        format_matches(attrs, errors, "number", &DIGITS);
        length_within(attrs, errors, "number", 12, 19);
        luhn_10(attrs, errors, "number");
    }
    format_matches(attrs, errors, "cvv", &CVV);
    validate_expiration(attrs, errors);
    validate_details(attrs, errors);
}

/// Expiration is either `MM/YYYY` or a month/year pair.
fn validate_expiration(attrs: &Attributes, errors: &mut Errors) {
    let has = |name: &str| attrs.get(name).is_some_and(|v| !v.is_blank());
    if has("expiration_date") {
        format_matches(attrs, errors, "expiration_date", &EXPIRATION_DATE);
    } else if has("expiration_month") || has("expiration_year") {
        presence(attrs, errors, "expiration_month");
        presence(attrs, errors, "expiration_year");
    } else {
        errors.add("expiration_date", "can't be blank");
    }
}

fn validate_details(attrs: &Attributes, errors: &mut Errors) {
    length_at_most(attrs, errors, "cardholder_name", 175);
    if let Some(billing) = attrs.get("billing_address").and_then(|v| v.as_map()) {
        let mut nested = Errors::new();
        address::validate_address(billing, &mut nested);
        for error in &nested {
            errors.add(format!("billing_address.{}", error.field), error.message.clone());
        }
    }
}

impl Resource for CreditCard {
    const KIND: &'static str = "credit_card";
    const ID_ATTRIBUTE: &'static str = "token";
    const ATTRIBUTES: &'static [&'static str] = &[
        "token",
        "customer_id",
        "cardholder_name",
        "number",
        "cvv",
        "expiration_date",
        "expiration_month",
        "expiration_year",
        "billing_address",
        "bin",
        "last_4",
        "masked_number",
        "card_type",
        "default",
        "created_at",
        "updated_at",
    ];
    const READONLY: &'static [&'static str] = &[
        "bin",
        "last_4",
        "masked_number",
        "card_type",
        "created_at",
        "updated_at",
    ];
    const WRITE_ONLY: &'static [&'static str] = &["number", "cvv"];

    fn associations() -> &'static AssociationTable {
        &ASSOCIATIONS
    }

    fn validate(record: &Record<Self>, errors: &mut Errors) {
        let attrs = record.attributes();
        if record.is_persisted() {
            // Stored cards may be updated without re-entering card data.
            if !record.get("number").is_null() {
                luhn_10(attrs, errors, "number");
            }
            format_matches(attrs, errors, "cvv", &CVV);
            format_matches(attrs, errors, "expiration_date", &EXPIRATION_DATE);
            validate_details(attrs, errors);
        } else {
            validate_new_card(attrs, errors);
        }
    }

    fn scope(record: &Record<Self>) -> Option<OwnerRef> {
        record
            .get_str("customer_id")
            .map(|id| OwnerRef::new(Customer::KIND, "customer_id", id))
    }
}

impl Record<CreditCard> {
    pub fn token(&self) -> Option<&str> {
        self.id()
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.get_str("customer_id")
    }

    pub fn cardholder_name(&self) -> Option<&str> {
        self.get_str("cardholder_name")
    }

    pub fn is_default(&self) -> bool {
        self.get("default").as_bool().unwrap_or(false)
    }

    /// `bin******last_4`, as reported by the vault or derived locally.
    pub fn masked_number(&self) -> Option<String> {
        if let Some(masked) = self.get_str("masked_number") {
            return Some(masked.to_string());
        }
        match (self.get_str("bin"), self.get_str("last_4")) {
            (Some(bin), Some(last_4)) => Some(format!("{bin}******{last_4}")),
            _ => None,
        }
    }

    /// `MM/YYYY`, from the composite field or the month/year pair.
    pub fn expiration_date(&self) -> Option<String> {
        if let Some(date) = self.get_str("expiration_date") {
            return Some(date.to_string());
        }
        let month = self.get("expiration_month").as_i64()?;
        let year = self.get("expiration_year").as_i64()?;
        Some(format!("{month:02}/{year}"))
    }

    pub fn customer(&mut self) -> RecordResult<Option<&mut Record<Customer>>> {
        self.association(&CUSTOMER)
    }

    pub fn billing_address(&mut self) -> RecordResult<Option<&mut Record<Address>>> {
        self.association(&BILLING_ADDRESS)
    }

    pub fn transactions(&mut self) -> &mut Collection<CardTransactions> {
        self.collection(&TRANSACTIONS)
    }
}

/// A customer's vaulted cards.
pub struct CreditCards;

impl CollectionScope for CreditCards {
    type Item = CreditCard;
    const OWNER_KEY: &'static str = "customer_id";
}
