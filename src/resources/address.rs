use crate::framework::{
    AssociationTable, CollectionScope, Errors, OwnerRef, Record, RecordResult, Resource,
    SingleAssociation,
};
use crate::resources::customer::Customer;
use crate::validation::{format_matches, length_at_most, POSTAL_CODE};

/// A postal address stored under a customer.
pub struct Address;

pub type AddressRecord = Record<Address>;

pub const CUSTOMER: SingleAssociation<Customer> =
    SingleAssociation::belongs_to("customer", "customer_id");

static ASSOCIATIONS: AssociationTable = AssociationTable::new(&[CUSTOMER.descriptor()]);

const TEXT_FIELDS: [&str; 8] = [
    "first_name",
    "last_name",
    "company",
    "street_address",
    "extended_address",
    "locality",
    "region",
    "country_name",
];

/// Field rules shared with addresses nested in other records.
pub fn validate_address(attrs: &crate::framework::Attributes, errors: &mut Errors) {
    for field in TEXT_FIELDS {
        length_at_most(attrs, errors, field, 255);
    }
    format_matches(attrs, errors, "postal_code", &POSTAL_CODE);
    length_at_most(attrs, errors, "postal_code", 9);
}

impl Resource for Address {
    const KIND: &'static str = "address";
    const ATTRIBUTES: &'static [&'static str] = &[
        "id",
        "customer_id",
        "first_name",
        "last_name",
        "company",
        "street_address",
        "extended_address",
        "locality",
        "region",
        "postal_code",
        "country_name",
        "created_at",
        "updated_at",
    ];
    const READONLY: &'static [&'static str] = &["id", "created_at", "updated_at"];

    fn associations() -> &'static AssociationTable {
        &ASSOCIATIONS
    }

    fn validate(record: &Record<Self>, errors: &mut Errors) {
        validate_address(record.attributes(), errors);
    }

    fn scope(record: &Record<Self>) -> Option<OwnerRef> {
        record
            .get_str("customer_id")
            .map(|id| OwnerRef::new(Customer::KIND, "customer_id", id))
    }
}

impl Record<Address> {
    pub fn customer_id(&self) -> Option<&str> {
        self.get_str("customer_id")
    }

    pub fn postal_code(&self) -> Option<&str> {
        self.get_str("postal_code")
    }

    pub fn customer(&mut self) -> RecordResult<Option<&mut Record<Customer>>> {
        self.association(&CUSTOMER)
    }
}

/// A customer's addresses.
pub struct Addresses;

impl CollectionScope for Addresses {
    type Item = Address;
    const OWNER_KEY: &'static str = "customer_id";
}
