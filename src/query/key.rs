use crate::models::ListingType;
use std::fmt;

/// Scopes within the listings namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListingScope {
    All,
    BySeeker(String),
    Detail(String),
    Active,
    ActiveFiltered(ListingType),
}

/// Scopes within the saved-listings namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SavedScope {
    All,
    BySitter(String),
    Ids(String),
}

/// Cache key: an entity namespace plus the scope of the fetch.
///
/// Keys form a hierarchy of path segments, and invalidation matches by
/// prefix: `Listings(Active)` covers every `Listings(ActiveFiltered(_))`,
/// and `Listings(All)` covers the whole namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Listings(ListingScope),
    SavedListings(SavedScope),
}

impl QueryKey {
    pub fn listings_by_seeker(seeker_id: &str) -> Self {
        Self::Listings(ListingScope::BySeeker(seeker_id.to_string()))
    }

    pub fn listing_detail(listing_id: &str) -> Self {
        Self::Listings(ListingScope::Detail(listing_id.to_string()))
    }

    pub fn active_listings() -> Self {
        Self::Listings(ListingScope::Active)
    }

    pub fn active_listings_filtered(listing_type: ListingType) -> Self {
        Self::Listings(ListingScope::ActiveFiltered(listing_type))
    }

    pub fn saved_by_sitter(sitter_id: &str) -> Self {
        Self::SavedListings(SavedScope::BySitter(sitter_id.to_string()))
    }

    pub fn saved_ids(sitter_id: &str) -> Self {
        Self::SavedListings(SavedScope::Ids(sitter_id.to_string()))
    }

    /// Whole-namespace key
    pub fn is_namespace(&self) -> bool {
        matches!(
            self,
            Self::Listings(ListingScope::All) | Self::SavedListings(SavedScope::All)
        )
    }

    pub fn segments(&self) -> Vec<&str> {
        match self {
            Self::Listings(scope) => {
                let mut segments = vec!["listings"];
                match scope {
                    ListingScope::All => {}
                    ListingScope::BySeeker(id) => segments.extend(["seeker", id.as_str()]),
                    ListingScope::Detail(id) => segments.extend(["detail", id.as_str()]),
                    ListingScope::Active => segments.push("active"),
                    ListingScope::ActiveFiltered(t) => {
                        segments.extend(["active", "filter", t.as_str()])
                    }
                }
                segments
            }
            Self::SavedListings(scope) => {
                let mut segments = vec!["savedListings"];
                match scope {
                    SavedScope::All => {}
                    SavedScope::BySitter(id) => segments.extend(["sitter", id.as_str()]),
                    SavedScope::Ids(id) => segments.extend(["ids", id.as_str()]),
                }
                segments
            }
        }
    }

    /// True when `prefix` covers this key
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        let own = self.segments();
        let prefix = prefix.segments();
        own.len() >= prefix.len() && own[..prefix.len()] == prefix[..]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments().join("/"))
    }
}
