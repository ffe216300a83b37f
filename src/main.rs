use anyhow::Context;
use chrono::NaiveDate;
use sitboard::config::Config;
use sitboard::models::{BrowseFilter, ListingType};
use sitboard::query::{QueryCache, QueryClient};
use sitboard::store::{MemoryRowStore, RestRowStore, RowStore};
use sitboard::validation::ListingForm;
use sitboard::{logging, Role, Session};
use std::sync::Arc;
use tracing::{info, warn};

fn build_store(config: &Config) -> anyhow::Result<Arc<dyn RowStore>> {
    match (&config.backend_url, &config.api_key) {
        (Some(url), Some(key)) => {
            info!("Using backend at {}", url);
            let store = RestRowStore::new(url, key, config.http_timeout)
                .context("Failed to create backend client")?;
            Ok(Arc::new(store))
        }
        _ => {
            warn!("No backend configured, using an in-memory store");
            Ok(Arc::new(MemoryRowStore::marketplace()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let store = build_store(&config)?;
    let client = QueryClient::with_cache(store, QueryCache::new(config.stale_time));
    let mut session = Session::new(&config.seeker_id, &config.sitter_id);

    info!("SitBoard - marketplace walkthrough");

    // Seeker posts a listing
    session.switch_role(Some(Role::ServiceSeeker));
    let seeker_id = session.actor_id().unwrap_or_default().to_string();
    let form = ListingForm {
        listing_type: ListingType::PetSitting,
        location: "Cape Town, Western Cape".to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 6, 1).context("invalid start date")?,
        end_date: NaiveDate::from_ymd_opt(2025, 6, 10).context("invalid end date")?,
        description: "Two friendly dogs need walks twice a day.".to_string(),
    };
    let input = form.into_create_input(&seeker_id)?;
    let created = client.create_listing(&input).await?;
    info!("Created listing {}", created.listing_id);

    let mine = client.listings(&seeker_id).await?;
    println!("My listings ({}):", mine.len());
    for (i, listing) in mine.iter().enumerate() {
        println!(
            "{}. {} {} in {} ({}, {} days) [{}]",
            i + 1,
            listing.listing_type.icon(),
            listing.listing_type.label(),
            listing.location,
            listing.date_range(),
            listing.duration_days(),
            listing.status.label()
        );
    }
    println!();

    // Sitter browses and saves it
    session.switch_role(Some(Role::Sitter));
    let sitter_id = session.actor_id().unwrap_or_default().to_string();
    for filter in BrowseFilter::ALL {
        let listings = client.active_listings_filtered(filter.listing_type()).await?;
        println!("{}: {} active", filter.label(), listings.len());
    }

    let now_saved = client.toggle_saved(&sitter_id, &created.listing_id).await?;
    let saved_ids = client.saved_listing_ids(&sitter_id).await?;
    println!(
        "Saved {}: {} ({} saved in total)",
        created.listing_id,
        now_saved,
        saved_ids.len()
    );
    println!();

    // Seeker removes the listing; the sitter's bookmark now dangles
    session.switch_role(Some(Role::ServiceSeeker));
    client.delete_listing(&created.listing_id, &seeker_id).await?;
    info!("Deleted listing {}", created.listing_id);

    session.switch_role(Some(Role::Sitter));
    for detail in client.saved_listings_with_details(&sitter_id).await? {
        match detail.listing {
            Ok(listing) => println!("Saved: {} in {}", listing.listing_type.label(), listing.location),
            Err(err) => println!("Saved {} is unavailable: {}", detail.saved.listing_id, err),
        }
    }

    session.logout();
    Ok(())
}
