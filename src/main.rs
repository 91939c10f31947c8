//! Walkthrough against the in-memory vault: sign up a customer with a card,
//! add an address, charge the card and clean up.

use gateway_records::attrs;
use gateway_records::lifecycle::{setup_tracing, GatewayConfig, GatewaySystem};
use gateway_records::resources::{CustomerRecord, TransactionRecord};
use tracing::{error, info, warn};

fn main() -> Result<(), String> {
    setup_tracing();

    info!("Starting gateway demo");

    let system = GatewaySystem::start(GatewayConfig::from_env()).map_err(|e| e.to_string())?;
    let gateway = system.gateway();

    let span = tracing::info_span!("signup").entered();
    let mut customer = CustomerRecord::create_strict(
        &gateway,
        attrs! {
            "first_name" => "Ada",
            "last_name" => "Lovelace",
            "email" => "ada@example.com",
            "credit_card" => attrs! {
                "cardholder_name" => "Ada Lovelace",
                "number" => "4111111111111111",
                "cvv" => "123",
                "expiration_date" => "05/2030",
            },
        },
    )
    .map_err(|e| e.to_string())?;
    let customer_id = customer.id().unwrap_or_default().to_string();
    info!(%customer_id, name = ?customer.full_name(), "Customer signed up");
    drop(span);

    let span = tracing::info_span!("address").entered();
    let address = customer
        .addresses()
        .create(attrs! {
            "street_address" => "12 St James's Square",
            "locality" => "London",
            "postal_code" => "SW1Y 4LB",
        })
        .map_err(|e| e.to_string())?;
    if address.is_persisted() {
        info!(id = ?address.id(), "Address added");
    } else {
        warn!(errors = %address.errors(), "Address rejected");
    }
    drop(address);
    drop(span);

    // A bad card is reported through `errors`, not as an Err.
    let rejected = customer
        .credit_cards()
        .create(attrs! { "number" => "4111111111111112", "cvv" => "1", "expiration_date" => "13/2030" })
        .map_err(|e| e.to_string())?;
    warn!(errors = %rejected.errors(), "Card rejected as expected");
    drop(rejected);

    let span = tracing::info_span!("charge").entered();
    let sale = customer
        .transactions()
        .create(attrs! { "amount" => "42.50" })
        .map_err(|e| e.to_string())?;
    match sale.id() {
        Some(id) => info!(%id, status = ?sale.status(), "Charged default card"),
        None => error!(errors = %sale.errors(), "Charge failed"),
    }
    drop(sale);
    drop(span);

    let cards = customer.credit_cards().len().map_err(|e| e.to_string())?;
    let not_found = TransactionRecord::find(&gateway, None, "txn_missing")
        .is_err_and(|e| e.is_not_found());
    info!(cards, not_found, "Vault state");

    customer.destroy().map_err(|e| e.to_string())?;
    info!(%customer_id, "Customer removed");

    drop(customer);
    drop(gateway);
    system.shutdown().map_err(|e| e.to_string())?;

    info!("Demo completed successfully");
    Ok(())
}
