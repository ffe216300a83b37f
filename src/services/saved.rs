use crate::error::{Error, Result};
use crate::models::{CreateSavedListingInput, SavedListing, SAVED_LISTING_TABLE};
use crate::services::{from_row, from_rows, to_row};
use crate::store::{Filter, RowStore, SelectQuery, Strictness};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Typed access to the `saved_listing` table
#[derive(Clone)]
pub struct SavedListingService {
    store: Arc<dyn RowStore>,
}

impl SavedListingService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Whether the sitter saved the listing. No match means not saved.
    #[instrument(skip(self))]
    pub async fn is_listing_saved(&self, sitter_id: &str, listing_id: &str) -> Result<bool> {
        let query = SelectQuery::from(SAVED_LISTING_TABLE)
            .columns(&["saved_listing_id"])
            .eq("sitter_id", sitter_id)
            .eq("listing_id", listing_id);
        let row = self.store.fetch_one(&query, Strictness::MaybeSingle).await?;
        Ok(row.is_some())
    }

    #[instrument(skip(self))]
    pub async fn get_saved_listings_by_sitter_id(&self, sitter_id: &str) -> Result<Vec<SavedListing>> {
        let query = SelectQuery::from(SAVED_LISTING_TABLE).eq("sitter_id", sitter_id);
        let saved: Vec<SavedListing> = from_rows(self.store.select(&query).await?)?;
        debug!("Fetched {} saved listings", saved.len());
        Ok(saved)
    }

    /// Insert without a duplicate check; callers consult the saved ids first
    #[instrument(skip(self, input), fields(sitter_id = %input.sitter_id, listing_id = %input.listing_id))]
    pub async fn save_listing(&self, input: &CreateSavedListingInput) -> Result<SavedListing> {
        let row = self.store.insert(SAVED_LISTING_TABLE, to_row(input)?).await?;
        let saved: SavedListing = from_row(row)?;
        info!(saved_listing_id = %saved.saved_listing_id, "listing_saved");
        Ok(saved)
    }

    /// Remove the bookmark. Removing one that does not exist succeeds.
    #[instrument(skip(self))]
    pub async fn unsave_listing(&self, sitter_id: &str, listing_id: &str) -> Result<bool> {
        let filters = [
            Filter::eq("sitter_id", sitter_id),
            Filter::eq("listing_id", listing_id),
        ];
        self.store.delete(SAVED_LISTING_TABLE, &filters).await?;
        info!("listing_unsaved");
        Ok(true)
    }

    /// Ids of the listings a sitter saved, each id once
    #[instrument(skip(self))]
    pub async fn get_saved_listing_ids(&self, sitter_id: &str) -> Result<Vec<String>> {
        let query = SelectQuery::from(SAVED_LISTING_TABLE)
            .columns(&["listing_id"])
            .eq("sitter_id", sitter_id);
        let rows = self.store.select(&query).await?;

        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row
                .get("listing_id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::Decode("saved_listing row without listing_id".to_string()))?;
            if seen.insert(id.to_string()) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }
}
