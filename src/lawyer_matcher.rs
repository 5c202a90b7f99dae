use tracing::debug;

use crate::catalog::LawyerCatalog;
use crate::error::MatchError;
use crate::models::{LawyerRecord, MatchResult};

impl LawyerCatalog {
    /// First lawyer, in catalog order, whose address contains `location`
    /// ignoring case. Blank locations are rejected rather than matching
    /// every row.
    pub fn find_by_location(
        &self,
        location: &str,
    ) -> Result<MatchResult<LawyerRecord>, MatchError> {
        let needle = location.trim().to_lowercase();
        if needle.is_empty() {
            return Err(MatchError::EmptyQuery);
        }

        let found = self
            .iter()
            .enumerate()
            .find(|(_, lawyer)| lawyer.address.to_lowercase().contains(&needle));

        match found {
            Some((index, lawyer)) => {
                debug!("Lawyer match for '{}': row {}", needle, index);
                Ok(MatchResult::Found {
                    index,
                    record: lawyer.clone(),
                    score: 1.0,
                })
            }
            None => {
                debug!("No lawyer address contains '{}'", needle);
                Ok(MatchResult::NotFound)
            }
        }
    }
}

/// Free-function form of [`LawyerCatalog::find_by_location`].
pub fn match_lawyer(
    catalog: &LawyerCatalog,
    location: &str,
) -> Result<MatchResult<LawyerRecord>, MatchError> {
    catalog.find_by_location(location)
}
