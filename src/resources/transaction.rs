use crate::attrs;
use crate::framework::{
    AssociationTable, Attributes, Collection, CollectionScope, Errors, Gateway, OwnerRef, Record,
    RecordResult, Resource, SingleAssociation,
};
use crate::resources::credit_card::{CreditCard, CreditCards};
use crate::resources::customer::Customer;
use crate::validation::{inclusion, numericality_positive, presence};

/// A sale or credit charged to a vaulted card.
pub struct Transaction;

pub type TransactionRecord = Record<Transaction>;

pub const SALE: &str = "sale";
pub const CREDIT: &str = "credit";

pub const CUSTOMER: SingleAssociation<Customer> =
    SingleAssociation::belongs_to("customer", "customer_id");
pub const CREDIT_CARD: SingleAssociation<CreditCard> =
    SingleAssociation::belongs_to("credit_card", "payment_method_token");

static ASSOCIATIONS: AssociationTable =
    AssociationTable::new(&[CUSTOMER.descriptor(), CREDIT_CARD.descriptor()]);

impl Resource for Transaction {
    const KIND: &'static str = "transaction";
    const ATTRIBUTES: &'static [&'static str] = &[
        "id",
        "type",
        "amount",
        "status",
        "order_id",
        "customer_id",
        "payment_method_token",
        "created_at",
        "updated_at",
    ];
    const READONLY: &'static [&'static str] = &["id", "status", "created_at", "updated_at"];

    fn associations() -> &'static AssociationTable {
        &ASSOCIATIONS
    }

    fn validate(record: &Record<Self>, errors: &mut Errors) {
        let attrs = record.attributes();
        if presence(attrs, errors, "amount") {
            numericality_positive(attrs, errors, "amount");
        }
        if presence(attrs, errors, "type") {
            inclusion(attrs, errors, "type", &[SALE, CREDIT]);
        }
    }
}

impl Record<Transaction> {
    pub fn amount(&self) -> Option<f64> {
        self.get("amount").as_f64()
    }

    pub fn transaction_type(&self) -> Option<&str> {
        self.get_str("type")
    }

    pub fn status(&self) -> Option<&str> {
        self.get_str("status")
    }

    pub fn customer(&mut self) -> RecordResult<Option<&mut Record<Customer>>> {
        self.association(&CUSTOMER)
    }

    pub fn credit_card(&mut self) -> RecordResult<Option<&mut Record<CreditCard>>> {
        self.association(&CREDIT_CARD)
    }
}

fn sale_defaults(owner: Option<&OwnerRef>) -> Attributes {
    let mut options = attrs! { "type" => SALE };
    if let Some(owner) = owner.filter(|o| o.has_identity()) {
        options.insert(owner.key().to_string(), owner.id().into());
    }
    options
}

/// A customer's transactions, or every transaction when unscoped.
pub struct Transactions;

impl CollectionScope for Transactions {
    type Item = Transaction;
    const OWNER_KEY: &'static str = "customer_id";

    fn default_options(owner: Option<&OwnerRef>) -> Attributes {
        sale_defaults(owner)
    }

    /// Charges the customer's default card unless a token is given.
    fn resolve_options(
        gateway: &Gateway,
        owner: Option<&OwnerRef>,
        attributes: &Attributes,
        options: &mut Attributes,
    ) -> RecordResult<()> {
        if attributes.contains_key("payment_method_token") {
            return Ok(());
        }
        let Some(owner) = owner.filter(|o| o.has_identity()) else {
            return Ok(());
        };
        let mut cards = Collection::<CreditCards>::new(gateway, Some(owner.clone()));
        if let Some(token) = cards
            .find_by(|card| card.is_default())?
            .and_then(|card| card.token().map(str::to_owned))
        {
            options.insert("payment_method_token".into(), token.into());
        }
        Ok(())
    }
}

/// Transactions charged to one card.
pub struct CardTransactions;

impl CollectionScope for CardTransactions {
    type Item = Transaction;
    const OWNER_KEY: &'static str = "payment_method_token";

    fn default_options(owner: Option<&OwnerRef>) -> Attributes {
        sale_defaults(owner)
    }
}
