use crate::error::{Error, Result};
use crate::models::{
    CreateListingInput, CreateSavedListingInput, Listing, ListingType, SavedListing,
    UpdateListingInput,
};
use crate::query::cache::{QueryCache, QueryStatus};
use crate::query::filter::filter_by_type;
use crate::query::key::{ListingScope, QueryKey, SavedScope};
use crate::services::{ListingService, SavedListingService};
use crate::store::RowStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A saved listing alongside the result of loading the listing it points at.
/// The load fails when the listing was deleted after being saved.
#[derive(Debug, Clone)]
pub struct SavedListingDetail {
    pub saved: SavedListing,
    pub listing: Result<Listing>,
}

/// Cached queries and mutations over both services.
///
/// Reads go through the cache; each successful mutation invalidates the
/// keys whose data it changed. Failed mutations leave the cache untouched.
pub struct QueryClient {
    listings: ListingService,
    saved: SavedListingService,
    cache: QueryCache,
}

impl QueryClient {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self::with_cache(store, QueryCache::default())
    }

    pub fn with_cache(store: Arc<dyn RowStore>, cache: QueryCache) -> Self {
        info!(backend = store.backend_name(), "query client ready");
        Self {
            listings: ListingService::new(store.clone()),
            saved: SavedListingService::new(store),
            cache,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn listing_service(&self) -> &ListingService {
        &self.listings
    }

    pub fn saved_listing_service(&self) -> &SavedListingService {
        &self.saved
    }

    /// Fetch state of `key`. A filtered view reports the state of the
    /// active listings it is derived from.
    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        match key {
            QueryKey::Listings(ListingScope::ActiveFiltered(_)) => {
                self.cache.status(&QueryKey::active_listings())
            }
            _ => self.cache.status(key),
        }
    }

    // Queries

    /// Listings owned by a seeker. Disabled for an empty id.
    pub async fn listings(&self, seeker_id: &str) -> Result<Vec<Listing>> {
        self.seeker_listings_query(seeker_id, false).await
    }

    pub async fn listing(&self, listing_id: &str) -> Result<Listing> {
        self.detail_query(listing_id, false).await
    }

    pub async fn active_listings(&self) -> Result<Vec<Listing>> {
        self.active_query(false).await
    }

    /// Active listings of one type, filtered in memory from the unfiltered set
    pub async fn active_listings_filtered(&self, listing_type: Option<ListingType>) -> Result<Vec<Listing>> {
        match listing_type {
            Some(t) => self.filtered_query(t, false).await,
            None => self.active_listings().await,
        }
    }

    /// Saved listings of a sitter. Disabled for an empty id.
    pub async fn saved_listings(&self, sitter_id: &str) -> Result<Vec<SavedListing>> {
        self.saved_query(sitter_id, false).await
    }

    /// Ids of the listings a sitter saved. Disabled for an empty id.
    pub async fn saved_listing_ids(&self, sitter_id: &str) -> Result<Vec<String>> {
        self.saved_ids_query(sitter_id, false).await
    }

    /// Each saved listing with its listing loaded through the detail cache
    pub async fn saved_listings_with_details(&self, sitter_id: &str) -> Result<Vec<SavedListingDetail>> {
        let saved = self.saved_listings(sitter_id).await?;
        let mut details = Vec::with_capacity(saved.len());
        for row in saved {
            let listing = self.listing(&row.listing_id).await;
            if let Err(err) = &listing {
                debug!(listing_id = %row.listing_id, error = %err, "saved listing unavailable");
            }
            details.push(SavedListingDetail { saved: row, listing });
        }
        Ok(details)
    }

    /// Refetch `key` now (pull-to-refresh). A namespace key refreshes every
    /// cached key beneath it; one failing key does not stop the rest, and
    /// the first error is returned once all have been tried.
    pub async fn refresh(&self, key: &QueryKey) -> Result<()> {
        if !key.is_namespace() {
            return self.refresh_key(key).await;
        }
        let mut first_err = None;
        for cached in self.cache.keys(key) {
            if let Err(err) = self.refresh_key(&cached).await {
                debug!(key = %cached, error = %err, "refresh failed");
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Refetch the given keys that went stale, as a screen does when it
    /// regains focus. Every stale key is tried; the first error is returned.
    pub async fn refetch_stale(&self, keys: &[QueryKey]) -> Result<usize> {
        let mut refetched = 0;
        let mut first_err = None;
        for key in keys {
            if !self.cache.is_stale(key) {
                continue;
            }
            match self.refresh_key(key).await {
                Ok(()) => refetched += 1,
                Err(err) => {
                    debug!(%key, error = %err, "refetch failed");
                    first_err.get_or_insert(err);
                }
            }
        }
        first_err.map_or(Ok(refetched), Err)
    }

    async fn refresh_key(&self, key: &QueryKey) -> Result<()> {
        match key {
            QueryKey::Listings(ListingScope::All) | QueryKey::SavedListings(SavedScope::All) => Ok(()),
            QueryKey::Listings(ListingScope::BySeeker(id)) => self.seeker_listings_query(id, true).await.map(drop),
            QueryKey::Listings(ListingScope::Detail(id)) => self.detail_query(id, true).await.map(drop),
            QueryKey::Listings(ListingScope::Active | ListingScope::ActiveFiltered(_)) => {
                self.active_query(true).await.map(drop)
            }
            QueryKey::SavedListings(SavedScope::BySitter(id)) => self.saved_query(id, true).await.map(drop),
            QueryKey::SavedListings(SavedScope::Ids(id)) => self.saved_ids_query(id, true).await.map(drop),
        }
    }

    async fn seeker_listings_query(&self, seeker_id: &str, force: bool) -> Result<Vec<Listing>> {
        if seeker_id.is_empty() {
            return Ok(Vec::new());
        }
        let key = QueryKey::listings_by_seeker(seeker_id);
        let fetcher = || self.listings.get_listings_by_seeker_id(seeker_id);
        if force {
            self.cache.refetch(&key, fetcher).await
        } else {
            self.cache.fetch(&key, fetcher).await
        }
    }

    async fn detail_query(&self, listing_id: &str, force: bool) -> Result<Listing> {
        if listing_id.is_empty() {
            return Err(Error::NotFound("no listing selected".to_string()));
        }
        let key = QueryKey::listing_detail(listing_id);
        let fetcher = || self.listings.get_listing_by_id(listing_id);
        if force {
            self.cache.refetch(&key, fetcher).await
        } else {
            self.cache.fetch(&key, fetcher).await
        }
    }

    async fn active_query(&self, force: bool) -> Result<Vec<Listing>> {
        let key = QueryKey::active_listings();
        let fetcher = || self.listings.get_active_listings();
        if force {
            self.cache.refetch(&key, fetcher).await
        } else {
            self.cache.fetch(&key, fetcher).await
        }
    }

    /// Derived from the active entry on every call and never cached on its
    /// own, so it can't disagree with the active set
    async fn filtered_query(&self, listing_type: ListingType, force: bool) -> Result<Vec<Listing>> {
        let all = self.active_query(force).await?;
        Ok(filter_by_type(&all, Some(listing_type)))
    }

    async fn saved_query(&self, sitter_id: &str, force: bool) -> Result<Vec<SavedListing>> {
        if sitter_id.is_empty() {
            return Ok(Vec::new());
        }
        let key = QueryKey::saved_by_sitter(sitter_id);
        let fetcher = || self.saved.get_saved_listings_by_sitter_id(sitter_id);
        if force {
            self.cache.refetch(&key, fetcher).await
        } else {
            self.cache.fetch(&key, fetcher).await
        }
    }

    async fn saved_ids_query(&self, sitter_id: &str, force: bool) -> Result<Vec<String>> {
        if sitter_id.is_empty() {
            return Ok(Vec::new());
        }
        let key = QueryKey::saved_ids(sitter_id);
        let fetcher = || self.saved.get_saved_listing_ids(sitter_id);
        if force {
            self.cache.refetch(&key, fetcher).await
        } else {
            self.cache.fetch(&key, fetcher).await
        }
    }

    // Mutations

    #[instrument(skip(self, input), fields(seeker_id = %input.service_seeker_id))]
    pub async fn create_listing(&self, input: &CreateListingInput) -> Result<Listing> {
        let listing = self.listings.create_listing(input).await?;
        self.cache
            .invalidate(&QueryKey::listings_by_seeker(&input.service_seeker_id));
        self.cache.invalidate(&QueryKey::active_listings());
        Ok(listing)
    }

    /// Update a listing and write the response straight into its detail entry
    #[instrument(skip(self, input))]
    pub async fn update_listing(&self, listing_id: &str, input: &UpdateListingInput) -> Result<Listing> {
        let listing = self.listings.update_listing(listing_id, input).await?;
        self.cache
            .set_data(&QueryKey::listing_detail(&listing.listing_id), listing.clone());
        self.cache
            .invalidate(&QueryKey::listings_by_seeker(&listing.service_seeker_id));
        self.cache.invalidate(&QueryKey::active_listings());
        Ok(listing)
    }

    #[instrument(skip(self))]
    pub async fn delete_listing(&self, listing_id: &str, seeker_id: &str) -> Result<bool> {
        let deleted = self.listings.delete_listing(listing_id).await?;
        self.cache.remove(&QueryKey::listing_detail(listing_id));
        self.cache.invalidate(&QueryKey::listings_by_seeker(seeker_id));
        self.cache.invalidate(&QueryKey::active_listings());
        Ok(deleted)
    }

    #[instrument(skip(self, input), fields(sitter_id = %input.sitter_id))]
    pub async fn save_listing(&self, input: &CreateSavedListingInput) -> Result<SavedListing> {
        let saved = self.saved.save_listing(input).await?;
        self.invalidate_saved(&input.sitter_id);
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn unsave_listing(&self, sitter_id: &str, listing_id: &str) -> Result<bool> {
        let unsaved = self.saved.unsave_listing(sitter_id, listing_id).await?;
        self.invalidate_saved(sitter_id);
        Ok(unsaved)
    }

    /// Save the listing, or unsave it if the sitter's saved ids already hold
    /// it. Returns whether the listing is saved afterwards.
    pub async fn toggle_saved(&self, sitter_id: &str, listing_id: &str) -> Result<bool> {
        let saved_ids = self.saved_listing_ids(sitter_id).await?;
        if saved_ids.iter().any(|id| id == listing_id) {
            self.unsave_listing(sitter_id, listing_id).await?;
            Ok(false)
        } else {
            let input = CreateSavedListingInput {
                sitter_id: sitter_id.to_string(),
                listing_id: listing_id.to_string(),
            };
            self.save_listing(&input).await?;
            Ok(true)
        }
    }

    fn invalidate_saved(&self, sitter_id: &str) {
        self.cache.invalidate(&QueryKey::saved_by_sitter(sitter_id));
        self.cache.invalidate(&QueryKey::saved_ids(sitter_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingStatus;
    use crate::store::MemoryRowStore;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn client() -> (Arc<MemoryRowStore>, QueryClient) {
        let store = Arc::new(MemoryRowStore::marketplace());
        (store.clone(), QueryClient::new(store))
    }

    fn input(seeker: &str, day: u32, listing_type: ListingType) -> CreateListingInput {
        let start = NaiveDate::from_ymd_opt(2025, 7, day).unwrap();
        CreateListingInput {
            service_seeker_id: seeker.to_string(),
            listing_type,
            location: "Knysna".to_string(),
            start_date: start,
            end_date: start,
            description: "Look after the garden".to_string(),
        }
    }

    #[tokio::test]
    async fn repeated_reads_are_served_from_cache() {
        let (store, client) = client();
        client.active_listings().await.unwrap();
        client.active_listings().await.unwrap();
        assert_eq!(store.select_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_reads_issue_one_select() {
        let store = Arc::new(MemoryRowStore::marketplace().with_latency(Duration::from_millis(20)));
        let client = QueryClient::new(store.clone());

        let (a, b, c) = tokio::join!(
            client.active_listings(),
            client.active_listings(),
            client.active_listings_filtered(Some(ListingType::Both)),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
        assert_eq!(store.select_count(), 1);
    }

    #[tokio::test]
    async fn create_invalidates_seeker_and_active() {
        let (_, client) = client();
        let seeker_key = QueryKey::listings_by_seeker("seeker-1");
        let other_key = QueryKey::listings_by_seeker("seeker-2");
        client.listings("seeker-1").await.unwrap();
        client.listings("seeker-2").await.unwrap();
        client.active_listings().await.unwrap();

        client
            .create_listing(&input("seeker-1", 1, ListingType::PetSitting))
            .await
            .unwrap();

        assert!(client.cache().is_stale(&seeker_key));
        assert!(client.cache().is_stale(&QueryKey::active_listings()));
        assert!(!client.cache().is_stale(&other_key));
        assert_eq!(client.listings("seeker-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_writes_detail_without_refetch() {
        let (store, client) = client();
        let created = client
            .create_listing(&input("seeker-1", 1, ListingType::PetSitting))
            .await
            .unwrap();

        let updated = client
            .update_listing(&created.listing_id, &UpdateListingInput::status(ListingStatus::Completed))
            .await
            .unwrap();
        let selects = store.select_count();

        let detail = client.listing(&created.listing_id).await.unwrap();
        assert_eq!(detail, updated);
        assert_eq!(store.select_count(), selects);
    }

    #[tokio::test]
    async fn delete_evicts_detail() {
        let (_, client) = client();
        let created = client
            .create_listing(&input("seeker-1", 1, ListingType::HouseSitting))
            .await
            .unwrap();
        client.listing(&created.listing_id).await.unwrap();

        client
            .delete_listing(&created.listing_id, "seeker-1")
            .await
            .unwrap();

        let detail_key = QueryKey::listing_detail(&created.listing_id);
        assert_eq!(client.cache().get_data::<Listing>(&detail_key), None);
        assert!(client.listing(&created.listing_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn failed_mutation_invalidates_nothing() {
        let (store, client) = client();
        client.active_listings().await.unwrap();
        store.fail_next(Error::backend("new row violates row-level security policy"));

        let err = client
            .create_listing(&input("seeker-1", 1, ListingType::Both))
            .await
            .unwrap_err();

        assert_eq!(err.message(), "new row violates row-level security policy");
        assert!(!client.cache().is_stale(&QueryKey::active_listings()));
    }

    #[tokio::test]
    async fn filtered_view_follows_active_invalidation() {
        let (_, client) = client();
        client
            .create_listing(&input("seeker-1", 1, ListingType::PetSitting))
            .await
            .unwrap();
        let pets = client
            .active_listings_filtered(Some(ListingType::PetSitting))
            .await
            .unwrap();
        assert_eq!(pets.len(), 1);

        client
            .create_listing(&input("seeker-2", 2, ListingType::PetSitting))
            .await
            .unwrap();
        assert!(client
            .status(&QueryKey::active_listings_filtered(ListingType::PetSitting))
            .is_stale);

        let pets = client
            .active_listings_filtered(Some(ListingType::PetSitting))
            .await
            .unwrap();
        assert_eq!(pets.len(), 2);
    }

    #[tokio::test]
    async fn filtered_view_tracks_refreshed_active_set() {
        let (_, client) = client();
        client
            .create_listing(&input("seeker-1", 1, ListingType::PetSitting))
            .await
            .unwrap();
        let pets = client
            .active_listings_filtered(Some(ListingType::PetSitting))
            .await
            .unwrap();
        assert_eq!(pets.len(), 1);

        // Written behind the cache's back, then picked up by a pull-to-refresh
        client
            .listing_service()
            .create_listing(&input("seeker-2", 2, ListingType::PetSitting))
            .await
            .unwrap();
        client.refresh(&QueryKey::active_listings()).await.unwrap();

        let active = client.active_listings().await.unwrap();
        let pets = client
            .active_listings_filtered(Some(ListingType::PetSitting))
            .await
            .unwrap();
        assert_eq!(pets.len(), 2);
        assert!(pets.iter().all(|p| active.contains(p)));
        assert!(client
            .cache()
            .keys(&QueryKey::active_listings_filtered(ListingType::PetSitting))
            .is_empty());
    }

    #[tokio::test]
    async fn filtered_view_expires_with_active_set() {
        let store = Arc::new(MemoryRowStore::marketplace());
        let client = QueryClient::with_cache(store.clone(), QueryCache::new(Some(Duration::from_millis(10))));
        client
            .listing_service()
            .create_listing(&input("seeker-1", 1, ListingType::HouseSitting))
            .await
            .unwrap();
        let houses = client
            .active_listings_filtered(Some(ListingType::HouseSitting))
            .await
            .unwrap();
        assert_eq!(houses.len(), 1);

        // Cancelled behind the cache's back; only expiry can reveal it
        client
            .listing_service()
            .update_listing(&houses[0].listing_id, &UpdateListingInput::status(ListingStatus::Cancelled))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(client.active_listings().await.unwrap().is_empty());
        assert!(client
            .active_listings_filtered(Some(ListingType::HouseSitting))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn namespace_refresh_continues_past_failed_key() {
        let (_, client) = client();
        let created = client
            .create_listing(&input("seeker-a", 1, ListingType::Both))
            .await
            .unwrap();
        client.listing(&created.listing_id).await.unwrap();
        assert_eq!(client.listings("seeker-a").await.unwrap().len(), 1);

        client
            .listing_service()
            .delete_listing(&created.listing_id)
            .await
            .unwrap();

        let err = client
            .refresh(&QueryKey::Listings(ListingScope::All))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let mine = client
            .cache()
            .get_data::<Vec<Listing>>(&QueryKey::listings_by_seeker("seeker-a"))
            .unwrap();
        assert!(mine.is_empty());
    }

    #[tokio::test]
    async fn refetch_stale_tries_every_key() {
        let (_, client) = client();
        let created = client
            .create_listing(&input("seeker-a", 1, ListingType::Both))
            .await
            .unwrap();
        client.listing(&created.listing_id).await.unwrap();
        client.listings("seeker-a").await.unwrap();

        client
            .listing_service()
            .delete_listing(&created.listing_id)
            .await
            .unwrap();
        let detail = QueryKey::listing_detail(&created.listing_id);
        let mine = QueryKey::listings_by_seeker("seeker-a");
        client.cache().invalidate(&detail);
        client.cache().invalidate(&mine);

        assert!(client.refetch_stale(&[detail, mine.clone()]).await.is_err());
        assert!(!client.cache().is_stale(&mine));
        assert!(client.cache().get_data::<Vec<Listing>>(&mine).unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_saves_then_unsaves() {
        let (_, client) = client();
        assert!(client.toggle_saved("sitter-1", "listing-1").await.unwrap());
        assert_eq!(
            client.saved_listing_ids("sitter-1").await.unwrap(),
            vec!["listing-1".to_string()]
        );
        assert!(!client.toggle_saved("sitter-1", "listing-1").await.unwrap());
        assert!(client.saved_listing_ids("sitter-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_scope_is_disabled() {
        let (store, client) = client();
        assert!(client.listings("").await.unwrap().is_empty());
        assert!(client.saved_listing_ids("").await.unwrap().is_empty());
        assert_eq!(store.select_count(), 0);
    }

    #[tokio::test]
    async fn refresh_refetches_fresh_data() {
        let (store, client) = client();
        client.saved_listings("sitter-1").await.unwrap();
        client.refresh(&QueryKey::saved_by_sitter("sitter-1")).await.unwrap();
        assert_eq!(store.select_count(), 2);
    }

    #[tokio::test]
    async fn refetch_stale_skips_fresh_keys() {
        let (store, client) = client();
        client.saved_listings("sitter-1").await.unwrap();
        client.saved_listing_ids("sitter-1").await.unwrap();
        client.active_listings().await.unwrap();
        client.save_listing(&CreateSavedListingInput {
            sitter_id: "sitter-1".to_string(),
            listing_id: "listing-1".to_string(),
        })
        .await
        .unwrap();
        let before = store.select_count();

        let keys = [
            QueryKey::saved_by_sitter("sitter-1"),
            QueryKey::saved_ids("sitter-1"),
            QueryKey::active_listings(),
        ];
        assert_eq!(client.refetch_stale(&keys).await.unwrap(), 2);
        assert_eq!(store.select_count(), before + 2);
    }
}
