use crate::framework::{
    AssociationTable, Attributes, Collection, Errors, HasMany, Record, RecordResult, Resource,
    SingleAssociation, Value,
};
use crate::resources::address::Addresses;
use crate::resources::credit_card::{self, CreditCard, CreditCards};
use crate::resources::transaction::Transactions;
use crate::validation::{exclusion, format_matches, length_at_most, IDENTIFIER};

/// A vault customer. Owns addresses, credit cards and transactions.
pub struct Customer;

pub type CustomerRecord = Record<Customer>;

pub const ADDRESSES: HasMany<Addresses> = HasMany::new("addresses");
pub const CREDIT_CARDS: HasMany<CreditCards> = HasMany::new("credit_cards");
pub const TRANSACTIONS: HasMany<Transactions> = HasMany::new("transactions");
/// Card submitted together with a new customer, as a nested mapping.
pub const CREDIT_CARD: SingleAssociation<CreditCard> =
    SingleAssociation::has_one("credit_card", Some("credit_card"));

static ASSOCIATIONS: AssociationTable = AssociationTable::new(&[
    ADDRESSES.descriptor(),
    CREDIT_CARDS.descriptor(),
    TRANSACTIONS.descriptor(),
    CREDIT_CARD.descriptor(),
]);

const NAME_FIELDS: [&str; 6] = ["first_name", "last_name", "company", "website", "phone", "fax"];

impl Resource for Customer {
    const KIND: &'static str = "customer";
    const ATTRIBUTES: &'static [&'static str] = &[
        "id",
        "first_name",
        "last_name",
        "email",
        "company",
        "website",
        "phone",
        "fax",
        "credit_card",
        "created_at",
        "updated_at",
    ];
    const READONLY: &'static [&'static str] = &["created_at", "updated_at"];

    fn associations() -> &'static AssociationTable {
        &ASSOCIATIONS
    }

    /// The nested card keeps its non-secret fields.
    fn scrub(attributes: &mut Attributes) {
        if let Some(Value::Map(card)) = attributes.get_mut("credit_card") {
            CreditCard::scrub(card);
        }
    }

    fn validate(record: &Record<Self>, errors: &mut Errors) {
        let attrs = record.attributes();
        if !record.is_persisted() {
            format_matches(attrs, errors, "id", &IDENTIFIER);
            length_at_most(attrs, errors, "id", 36);
            exclusion(attrs, errors, "id", &["all", "new"]);
        }
        for field in NAME_FIELDS {
            length_at_most(attrs, errors, field, 255);
        }
        if let Some(card) = record.get("credit_card").as_map() {
            let mut nested = Errors::new();
            credit_card::validate_new_card(card, &mut nested);
            for error in &nested {
                errors.add(format!("credit_card.{}", error.field), error.message.clone());
            }
        }
    }
}

impl Record<Customer> {
    pub fn first_name(&self) -> Option<&str> {
        self.get_str("first_name")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.get_str("last_name")
    }

    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    /// First and last name joined by a space, skipping blanks.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name(), self.last_name()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    pub fn addresses(&mut self) -> &mut Collection<Addresses> {
        self.collection(&ADDRESSES)
    }

    pub fn credit_cards(&mut self) -> &mut Collection<CreditCards> {
        self.collection(&CREDIT_CARDS)
    }

    pub fn transactions(&mut self) -> &mut Collection<Transactions> {
        self.collection(&TRANSACTIONS)
    }

    pub fn credit_card(&mut self) -> RecordResult<Option<&mut Record<CreditCard>>> {
        self.association(&CREDIT_CARD)
    }
}
