use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::FeatureVector;
use crate::error::{AppError, AppResult};

pub const DEFAULT_TEMPO_MIN: f64 = 60.0;
pub const DEFAULT_TEMPO_MAX: f64 = 180.0;

/// Preferred tempo range in BPM
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoRange {
    pub min: f64,
    pub max: f64,
}

impl Default for TempoRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_TEMPO_MIN,
            max: DEFAULT_TEMPO_MAX,
        }
    }
}

impl TempoRange {
    /// Builds a range from optional bounds, defaulting each missing one
    pub fn from_bounds(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min: min.unwrap_or(DEFAULT_TEMPO_MIN),
            max: max.unwrap_or(DEFAULT_TEMPO_MAX),
        }
    }
}

/// Everything the scorer needs to know about one user, captured once per run
#[derive(Debug, Clone, PartialEq)]
pub struct UserSnapshot {
    pub user_id: String,
    /// Per-feature mean over the sampled listening history
    pub avg_history: FeatureVector,
    /// Features stored on the user node itself
    pub static_profile: FeatureVector,
    pub favorite_genre: Option<String>,
    pub disliked_genre: Option<String>,
    pub favorite_artist: Option<String>,
    pub tempo_range: TempoRange,
    pub listened_ids: HashSet<String>,
}

impl UserSnapshot {
    /// Creates a snapshot with no history and no preferences
    pub fn new(user_id: impl Into<String>, static_profile: FeatureVector) -> Self {
        Self {
            user_id: user_id.into(),
            avg_history: FeatureVector::zero(),
            static_profile,
            favorite_genre: None,
            disliked_genre: None,
            favorite_artist: None,
            tempo_range: TempoRange::default(),
            listened_ids: HashSet::new(),
        }
    }

    /// Rejects preference combinations the scorer cannot interpret
    pub fn validate(&self) -> AppResult<()> {
        if let (Some(favorite), Some(disliked)) = (&self.favorite_genre, &self.disliked_genre) {
            if favorite == disliked {
                return Err(AppError::InvalidProfile(format!(
                    "genre '{}' is both liked and disliked by user {}",
                    favorite, self.user_id
                )));
            }
        }
        Ok(())
    }

    pub fn has_listened(&self, track_id: &str) -> bool {
        self.listened_ids.contains(track_id)
    }
}

/// Serializable view of a snapshot included in reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub avg_history: FeatureVector,
    pub static_profile: FeatureVector,
    pub favorite_genre: Option<String>,
    pub disliked_genre: Option<String>,
    pub favorite_artist: Option<String>,
    pub tempo_range: TempoRange,
    pub listened_count: usize,
}

impl From<&UserSnapshot> for ProfileSummary {
    fn from(snapshot: &UserSnapshot) -> Self {
        Self {
            avg_history: snapshot.avg_history,
            static_profile: snapshot.static_profile,
            favorite_genre: snapshot.favorite_genre.clone(),
            disliked_genre: snapshot.disliked_genre.clone(),
            favorite_artist: snapshot.favorite_artist.clone(),
            tempo_range: snapshot.tempo_range,
            listened_count: snapshot.listened_ids.len(),
        }
    }
}
