use crate::models::{Listing, ListingType};

/// Keep the listings of one type; `None` keeps everything
pub fn filter_by_type(listings: &[Listing], listing_type: Option<ListingType>) -> Vec<Listing> {
    match listing_type {
        Some(t) => listings
            .iter()
            .filter(|listing| listing.listing_type == t)
            .cloned()
            .collect(),
        None => listings.to_vec(),
    }
}
