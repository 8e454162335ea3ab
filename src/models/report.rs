use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Branch, Candidate, ProfileSummary};

/// A candidate with its scores for one run
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    /// Weighted sum of the similarity and preference signals
    pub weighted_score: f64,
    /// Weighted score after jitter; this is what gets normalized
    pub raw_score: f64,
    /// Raw score rescaled to [0, 10] across the run; 0.0 until normalized
    pub normalized_score: f64,
}

/// Sizes observed while merging branch outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub recent_history: usize,
    pub favorite_artist: usize,
    pub profile: usize,
    pub merged: usize,
}

impl PoolStats {
    pub fn branch_size(&self, branch: Branch) -> usize {
        match branch {
            Branch::RecentHistory => self.recent_history,
            Branch::FavoriteArtist => self.favorite_artist,
            Branch::Profile => self.profile,
        }
    }

    pub fn total_retrieved(&self) -> usize {
        self.recent_history + self.favorite_artist + self.profile
    }

    /// Number of branch results dropped because an earlier branch had the track
    pub fn duplicates(&self) -> usize {
        self.total_retrieved().saturating_sub(self.merged)
    }
}

/// One ranked line of the final report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub rank: usize,
    pub track_id: String,
    pub display_name: String,
    pub artist: String,
    pub genre: String,
    pub normalized_score: f64,
    pub raw_score: f64,
}

/// Recoverable conditions encountered during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    BranchQueryFailed { branch: Branch, reason: String },
    EmptyCandidatePool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub pool: PoolStats,
    pub duplicates: usize,
    pub failed_branches: usize,
}

impl RunDiagnostics {
    pub fn new(pool: PoolStats, failed_branches: usize) -> Self {
        Self {
            pool,
            duplicates: pool.duplicates(),
            failed_branches,
        }
    }
}

/// Ranked recommendations for a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub run_id: Uuid,
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<ReportEntry>,
    pub diagnostics: RunDiagnostics,
    pub warnings: Vec<RunWarning>,
    pub profile: ProfileSummary,
}

impl RecommendationReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Converts ranked candidates into report lines, ranks starting at 1
pub fn to_entries(ranked: &[ScoredCandidate]) -> Vec<ReportEntry> {
    ranked
        .iter()
        .enumerate()
        .map(|(idx, scored)| ReportEntry {
            rank: idx + 1,
            track_id: scored.candidate.id.clone(),
            display_name: scored.candidate.display_name.clone(),
            artist: scored.candidate.artist.clone(),
            genre: scored.candidate.genre.clone(),
            normalized_score: scored.normalized_score,
            raw_score: scored.raw_score,
        })
        .collect()
}
