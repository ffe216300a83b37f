use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Table holding listings
pub const LISTING_TABLE: &str = "listing";
/// Table relating sitters to the listings they saved
pub const SAVED_LISTING_TABLE: &str = "saved_listing";

/// Soft guidance for description length. Not enforced by the backend.
pub const DESCRIPTION_SOFT_LIMIT: usize = 500;

/// Kind of sitting a seeker is asking for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingType {
    PetSitting,
    HouseSitting,
    Both,
}

impl ListingType {
    pub const ALL: [ListingType; 3] = [Self::PetSitting, Self::HouseSitting, Self::Both];

    /// Wire representation, as stored in the `listing_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PetSitting => "PET_SITTING",
            Self::HouseSitting => "HOUSE_SITTING",
            Self::Both => "BOTH",
        }
    }
}

/// Lifecycle state of a listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// A request for sitting, owned by one service seeker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub listing_id: String,
    pub service_seeker_id: String,
    pub listing_type: ListingType,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
    pub status: ListingStatus,
}

/// Fields required to create a listing. The backend assigns the id and
/// defaults the status to `ACTIVE`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateListingInput {
    pub service_seeker_id: String,
    pub listing_type: ListingType,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
}

/// Partial update. Only the fields that are set get written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateListingInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_type: Option<ListingType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
}

impl UpdateListingInput {
    /// Update that only changes the status
    pub fn status(status: ListingStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// A sitter's bookmark of a listing. References the listing by id only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedListing {
    pub saved_listing_id: String,
    pub sitter_id: String,
    pub listing_id: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateSavedListingInput {
    pub sitter_id: String,
    pub listing_id: String,
}

/// Filter chips on the browse screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowseFilter {
    #[default]
    All,
    PetSitting,
    HouseSitting,
    Both,
}

impl BrowseFilter {
    pub const ALL: [BrowseFilter; 4] = [Self::All, Self::PetSitting, Self::HouseSitting, Self::Both];

    /// Listing type to filter on, `None` meaning no filter
    pub fn listing_type(&self) -> Option<ListingType> {
        match self {
            Self::All => None,
            Self::PetSitting => Some(ListingType::PetSitting),
            Self::HouseSitting => Some(ListingType::HouseSitting),
            Self::Both => Some(ListingType::Both),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::PetSitting => "Pet Sitting",
            Self::HouseSitting => "House Sitting",
            Self::Both => "Both",
        }
    }
}
