//! Checks the create and edit forms run before submitting a listing.
//! The services accept whatever they are given.

use chrono::NaiveDate;
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::{CreateListingInput, ListingType, UpdateListingInput, DESCRIPTION_SOFT_LIMIT};

/// Listing form as entered by a seeker
#[derive(Debug, Clone)]
pub struct ListingForm {
    pub listing_type: ListingType,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
}

impl ListingForm {
    pub fn validate(&self) -> Result<()> {
        if self.location.trim().is_empty() {
            return Err(Error::Validation("Please enter a location".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(Error::Validation("Please enter a description".to_string()));
        }
        if self.end_date < self.start_date {
            return Err(Error::Validation(
                "End date must be after start date".to_string(),
            ));
        }
        let chars = self.description.trim().chars().count();
        if chars > DESCRIPTION_SOFT_LIMIT {
            warn!(chars, limit = DESCRIPTION_SOFT_LIMIT, "description over soft limit");
        }
        Ok(())
    }

    /// Validate and build a create request with trimmed text fields
    pub fn into_create_input(self, service_seeker_id: &str) -> Result<CreateListingInput> {
        self.validate()?;
        Ok(CreateListingInput {
            service_seeker_id: service_seeker_id.to_string(),
            listing_type: self.listing_type,
            location: self.location.trim().to_string(),
            start_date: self.start_date,
            end_date: self.end_date,
            description: self.description.trim().to_string(),
        })
    }

    /// Validate and build an update that overwrites every form field
    pub fn into_update_input(self) -> Result<UpdateListingInput> {
        self.validate()?;
        Ok(UpdateListingInput {
            listing_type: Some(self.listing_type),
            location: Some(self.location.trim().to_string()),
            start_date: Some(self.start_date),
            end_date: Some(self.end_date),
            description: Some(self.description.trim().to_string()),
            status: None,
        })
    }
}
