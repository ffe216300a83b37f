//! Human-readable labels and date formatting for listings.

use chrono::NaiveDate;

use crate::models::{Listing, ListingStatus, ListingType};

impl ListingType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PetSitting => "Pet Sitting",
            Self::HouseSitting => "House Sitting",
            Self::Both => "Pet & House Sitting",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::PetSitting => "🐕",
            Self::HouseSitting => "🏠",
            Self::Both => "🐕🏠",
        }
    }
}

impl ListingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl Listing {
    /// Number of days between start and end date
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days().abs()
    }

    /// "Jun 1 - Jun 10"
    pub fn date_range(&self) -> String {
        format!(
            "{} - {}",
            format_short_date(self.start_date),
            format_short_date(self.end_date)
        )
    }
}

/// "Jun 1"
pub fn format_short_date(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// "Sunday, June 1, 2025"
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}
