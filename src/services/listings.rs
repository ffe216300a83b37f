use crate::error::{Error, Result};
use crate::models::{CreateListingInput, Listing, ListingStatus, UpdateListingInput, LISTING_TABLE};
use crate::services::{from_row, from_rows, to_row};
use crate::store::{Direction, Filter, RowStore, SelectQuery, Strictness};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Typed access to the `listing` table
#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn RowStore>,
}

impl ListingService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// All listings of one seeker, latest start date first
    #[instrument(skip(self))]
    pub async fn get_listings_by_seeker_id(&self, seeker_id: &str) -> Result<Vec<Listing>> {
        let query = SelectQuery::from(LISTING_TABLE)
            .eq("service_seeker_id", seeker_id)
            .order("start_date", Direction::Descending);
        let listings: Vec<Listing> = from_rows(self.store.select(&query).await?)?;
        debug!("Fetched {} listings for seeker", listings.len());
        Ok(listings)
    }

    /// Exactly one listing. Zero or several matches is an error.
    #[instrument(skip(self))]
    pub async fn get_listing_by_id(&self, listing_id: &str) -> Result<Listing> {
        let query = SelectQuery::from(LISTING_TABLE).eq("listing_id", listing_id);
        let row = self
            .store
            .fetch_one(&query, Strictness::Single)
            .await?
            .ok_or_else(|| Error::NotFound(format!("listing {listing_id} not found")))?;
        from_row(row)
    }

    #[instrument(skip(self, input), fields(seeker_id = %input.service_seeker_id))]
    pub async fn create_listing(&self, input: &CreateListingInput) -> Result<Listing> {
        let row = self.store.insert(LISTING_TABLE, to_row(input)?).await?;
        let listing: Listing = from_row(row)?;
        info!(listing_id = %listing.listing_id, "listing_created");
        Ok(listing)
    }

    /// Overwrite the fields set in `input` and return the updated listing
    #[instrument(skip(self, input))]
    pub async fn update_listing(&self, listing_id: &str, input: &UpdateListingInput) -> Result<Listing> {
        let filters = [Filter::eq("listing_id", listing_id)];
        let rows = self
            .store
            .update(LISTING_TABLE, &filters, to_row(input)?)
            .await?;
        let row = Strictness::Single
            .pick(LISTING_TABLE, rows)?
            .ok_or_else(|| Error::NotFound(format!("listing {listing_id} not found")))?;
        let listing: Listing = from_row(row)?;
        info!(status = listing.status.as_str(), "listing_updated");
        Ok(listing)
    }

    #[instrument(skip(self))]
    pub async fn delete_listing(&self, listing_id: &str) -> Result<bool> {
        self.store
            .delete(LISTING_TABLE, &[Filter::eq("listing_id", listing_id)])
            .await?;
        info!("listing_deleted");
        Ok(true)
    }

    /// Every active listing, earliest start date first
    #[instrument(skip(self))]
    pub async fn get_active_listings(&self) -> Result<Vec<Listing>> {
        let query = SelectQuery::from(LISTING_TABLE)
            .eq("status", ListingStatus::Active.as_str())
            .order("start_date", Direction::Ascending);
        let listings: Vec<Listing> = from_rows(self.store.select(&query).await?)?;
        debug!("Fetched {} active listings", listings.len());
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingType;
    use crate::store::MemoryRowStore;
    use chrono::NaiveDate;

    fn service() -> (Arc<MemoryRowStore>, ListingService) {
        let store = Arc::new(MemoryRowStore::marketplace());
        (store.clone(), ListingService::new(store))
    }

    fn input(seeker: &str, start: (i32, u32, u32), listing_type: ListingType) -> CreateListingInput {
        let start = NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap();
        CreateListingInput {
            service_seeker_id: seeker.to_string(),
            listing_type,
            location: "Stellenbosch".to_string(),
            start_date: start,
            end_date: start + chrono::Duration::days(5),
            description: "Feed the dog twice a day".to_string(),
        }
    }

    #[tokio::test]
    async fn created_listing_round_trips_with_active_status() {
        let (_, listings) = service();
        let new = input("seeker-1", (2025, 6, 1), ListingType::PetSitting);

        let created = listings.create_listing(&new).await.unwrap();
        let fetched = listings.get_listing_by_id(&created.listing_id).await.unwrap();

        assert_eq!(fetched.service_seeker_id, new.service_seeker_id);
        assert_eq!(fetched.listing_type, new.listing_type);
        assert_eq!(fetched.location, new.location);
        assert_eq!(fetched.start_date, new.start_date);
        assert_eq!(fetched.end_date, new.end_date);
        assert_eq!(fetched.description, new.description);
        assert_eq!(fetched.status, ListingStatus::Active);
    }

    #[tokio::test]
    async fn status_update_leaves_other_fields() {
        let (_, listings) = service();
        let created = listings
            .create_listing(&input("seeker-1", (2025, 6, 1), ListingType::Both))
            .await
            .unwrap();

        listings
            .update_listing(&created.listing_id, &UpdateListingInput::status(ListingStatus::Cancelled))
            .await
            .unwrap();
        let fetched = listings.get_listing_by_id(&created.listing_id).await.unwrap();

        assert_eq!(fetched.status, ListingStatus::Cancelled);
        assert_eq!(
            Listing {
                status: ListingStatus::Active,
                ..fetched
            },
            created
        );
    }

    #[tokio::test]
    async fn deleted_listing_is_not_found() {
        let (_, listings) = service();
        let created = listings
            .create_listing(&input("seeker-1", (2025, 6, 1), ListingType::Both))
            .await
            .unwrap();

        assert!(listings.delete_listing(&created.listing_id).await.unwrap());
        let err = listings.get_listing_by_id(&created.listing_id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_of_missing_listing_errors() {
        let (_, listings) = service();
        let err = listings
            .update_listing("missing", &UpdateListingInput::status(ListingStatus::Completed))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn seeker_listings_are_newest_first() {
        let (_, listings) = service();
        for start in [(2025, 3, 1), (2025, 6, 1), (2025, 1, 1)] {
            listings
                .create_listing(&input("seeker-1", start, ListingType::PetSitting))
                .await
                .unwrap();
        }
        listings
            .create_listing(&input("seeker-2", (2025, 9, 1), ListingType::PetSitting))
            .await
            .unwrap();

        let mine = listings.get_listings_by_seeker_id("seeker-1").await.unwrap();
        let starts: Vec<_> = mine.iter().map(|l| l.start_date.to_string()).collect();
        assert_eq!(starts, vec!["2025-06-01", "2025-03-01", "2025-01-01"]);

        assert!(listings.get_listings_by_seeker_id("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn active_listings_exclude_closed_and_sort_ascending() {
        let (_, listings) = service();
        let late = listings
            .create_listing(&input("seeker-1", (2025, 8, 1), ListingType::PetSitting))
            .await
            .unwrap();
        let early = listings
            .create_listing(&input("seeker-2", (2025, 2, 1), ListingType::HouseSitting))
            .await
            .unwrap();
        let done = listings
            .create_listing(&input("seeker-2", (2025, 1, 1), ListingType::Both))
            .await
            .unwrap();
        listings
            .update_listing(&done.listing_id, &UpdateListingInput::status(ListingStatus::Completed))
            .await
            .unwrap();

        let active = listings.get_active_listings().await.unwrap();
        let ids: Vec<_> = active.iter().map(|l| l.listing_id.as_str()).collect();
        assert_eq!(ids, vec![early.listing_id.as_str(), late.listing_id.as_str()]);
    }

    #[tokio::test]
    async fn backend_failure_is_returned_not_raised() {
        let (store, listings) = service();
        store.fail_next(Error::Transport("connection reset".into()));

        let err = listings.get_active_listings().await.unwrap_err();
        assert_eq!(err.message(), "request failed: connection reset");
    }
}
