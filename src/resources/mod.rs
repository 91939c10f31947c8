//! Resource kinds of the payment vault.
//!
//! Each kind is a marker type implementing [`Resource`](crate::framework::Resource)
//! plus typed accessors on its `Record`. Association descriptors are exported
//! as constants next to the kind that declares them.

pub mod address;
pub mod credit_card;
pub mod customer;
pub mod transaction;

pub use address::{Address, AddressRecord, Addresses};
pub use credit_card::{CreditCard, CreditCardRecord, CreditCards};
pub use customer::{Customer, CustomerRecord};
pub use transaction::{CardTransactions, Transaction, TransactionRecord, Transactions};
