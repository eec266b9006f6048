// src/main.rs

//! # Reclaim Tickets - Demo Entry Point
//!
//! Starts the ticket services against the in-memory zone store and walks
//! through one full ticket lifecycle: issue, consume, list, revoke, consume.
//!
//! ## Environment Variables
//! - `RUST_LOG`: log filter (default: `info`)
//! - `RECLAIM_TICKET_REFRESH_INTERVAL`: (Optional) record expiration in seconds
//! - `RECLAIM_CONSUME_TIMEOUT`: (Optional) consume watchdog in seconds
//! - `RECLAIM_CONFIG`: (Optional) config file name (default: `reclaim`)

use anyhow::Context;
use dotenv::dotenv;
use log::info;
use reclaim_tickets::models::Expiration;
use reclaim_tickets::storage::Namestore;
use reclaim_tickets::{
    Attribute, AttributeList, IdentityPrivateKey, PresentationList, ReclaimConfig, Services,
    TicketService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_file = std::env::var("RECLAIM_CONFIG").ok();
    let config = ReclaimConfig::load(config_file.as_deref()).context("Failed to load configuration")?;
    let (services, namestore, _statistics) = Services::in_memory(config);
    let tickets = TicketService::new(services.clone());

    let issuer = IdentityPrivateKey::generate();
    let audience = IdentityPrivateKey::generate();

    // The issuer's own attribute, stored at the label of its id
    let email = Attribute::new("email", 1, b"a@b.com");
    namestore
        .store(
            &issuer,
            &email.id.to_label(),
            vec![email.to_record(Expiration::Relative(config.ticket_refresh_interval))?],
        )
        .await
        .context("Failed to store attribute")?;

    let issued = tickets
        .issue(&issuer, AttributeList::from(vec![email]), PresentationList::new(), audience.public_key())
        .await
        .context("Issue failed")?;
    info!("Issued ticket {}", issued.ticket.rnd);

    let consumed = tickets
        .consume(&audience, issued.ticket)
        .await
        .context("Consume failed")?;
    for attribute in consumed.attributes.iter() {
        info!(
            "Audience sees {} = {}",
            attribute.name,
            String::from_utf8_lossy(&attribute.data)
        );
    }

    let listed = tickets.iterate(&issuer).collect().await.context("Listing failed")?;
    info!("Issuer holds {} ticket(s)", listed.len());

    tickets
        .revoke(&issuer, issued.ticket)
        .await
        .context("Revoke failed")?;
    let after = tickets
        .consume(&audience, issued.ticket)
        .await
        .context("Consume after revoke failed")?;
    info!("After revocation the audience sees {} attribute(s)", after.attributes.len());

    services.shutdown().await;
    Ok(())
}
