use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

/// Highest star rating a user can give
pub const MAX_RATING: u8 = 5;

/// User star ratings keyed by movie title
///
/// Keyed by title rather than by result set, so a rating survives a new
/// recommendation round in which the same title reappears.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct UserRatingMap(BTreeMap<String, u8>);

impl UserRatingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rating, replacing any earlier rating for the same title
    pub fn rate(&mut self, title: &str, rating: u8) -> AppResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput(
                "Movie title cannot be empty".to_string(),
            ));
        }
        if rating > MAX_RATING {
            return Err(AppError::InvalidInput(format!(
                "Rating must be between 0 and {}, got {}",
                MAX_RATING, rating
            )));
        }

        self.0.insert(title.to_string(), rating);
        Ok(())
    }

    /// The rating for a title, 0 when the user has not rated it
    pub fn rating_for(&self, title: &str) -> u8 {
        self.0.get(title.trim()).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
