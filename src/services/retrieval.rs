use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    config::{BranchParams, RecommendationConfig},
    error::{AppError, AppResult},
    graph::{fields, params, GraphQueryPort, GraphRow, QueryId, QueryParams},
    models::{Branch, Candidate, FeatureVector},
};

/// Result of one branch; a failed branch carries no candidates
#[derive(Debug)]
pub struct BranchOutput {
    pub branch: Branch,
    pub candidates: Vec<Candidate>,
    pub error: Option<AppError>,
}

impl BranchOutput {
    fn from_result(branch: Branch, result: AppResult<Vec<Candidate>>) -> Self {
        match result {
            Ok(candidates) => Self {
                branch,
                candidates,
                error: None,
            },
            Err(error) => Self {
                branch,
                candidates: Vec::new(),
                error: Some(error),
            },
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Outputs of all three branches, always in merge order
#[derive(Debug)]
pub struct RetrievalOutcome {
    pub recent_history: BranchOutput,
    pub favorite_artist: BranchOutput,
    pub profile: BranchOutput,
}

impl RetrievalOutcome {
    pub fn in_merge_order(&self) -> [&BranchOutput; 3] {
        [&self.recent_history, &self.favorite_artist, &self.profile]
    }

    pub fn failed_branches(&self) -> usize {
        self.in_merge_order().iter().filter(|o| o.failed()).count()
    }
}

fn query_for(branch: Branch) -> QueryId {
    match branch {
        Branch::RecentHistory => QueryId::RecentHistoryAffinity,
        Branch::FavoriteArtist => QueryId::FavoriteArtistAffinity,
        Branch::Profile => QueryId::ProfileAffinity,
    }
}

fn branch_query_params(branch: Branch, user_id: &str, branch_params: &BranchParams) -> QueryParams {
    let thresholds = &branch_params.thresholds;
    let query_params = QueryParams::new()
        .param(params::USER_ID, user_id)
        .param(params::MAX_DANCEABILITY_DELTA, thresholds.danceability)
        .param(params::MAX_ENERGY_DELTA, thresholds.energy)
        .param(params::MAX_VALENCE_DELTA, thresholds.valence)
        .param(params::RESULT_CAP, branch_params.result_cap);

    match branch {
        Branch::Profile => query_params,
        Branch::RecentHistory | Branch::FavoriteArtist => {
            query_params.param(params::ANCHOR_LIMIT, branch_params.anchor_limit)
        }
    }
}

/// Converts a row into a candidate; rows without an id or features are unusable
fn parse_candidate(row: &GraphRow) -> Option<Candidate> {
    let id = row.get_string(fields::TRACK_ID)?;
    let features = FeatureVector::new(
        row.get_f64(fields::DANCEABILITY)?,
        row.get_f64(fields::ENERGY)?,
        row.get_f64(fields::VALENCE)?,
    );
    let display_name = row.get_string(fields::NAME).unwrap_or_else(|| id.clone());

    Some(Candidate {
        id,
        features,
        genre: row.get_string(fields::GENRE).unwrap_or_default(),
        artist: row.get_string(fields::ARTIST).unwrap_or_default(),
        display_name,
    })
}

/// Runs the three candidate retrieval branches against the graph
#[derive(Clone)]
pub struct CandidateRetriever {
    graph: Arc<dyn GraphQueryPort>,
}

impl CandidateRetriever {
    pub fn new(graph: Arc<dyn GraphQueryPort>) -> Self {
        Self { graph }
    }

    /// Runs a single branch
    ///
    /// Any query error or timeout comes back as `BranchQueryFailed`.
    pub async fn retrieve(
        &self,
        branch: Branch,
        user_id: &str,
        branch_params: &BranchParams,
        timeout: Duration,
    ) -> AppResult<Vec<Candidate>> {
        let start = Instant::now();
        let query_params = branch_query_params(branch, user_id, branch_params);

        let query = self.graph.run(query_for(branch), &query_params);

        let rows = match tokio::time::timeout(timeout, query).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                return Err(AppError::BranchQueryFailed {
                    branch,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(AppError::BranchQueryFailed {
                    branch,
                    reason: format!("timed out after {} ms", timeout.as_millis()),
                })
            }
        };

        let returned = rows.len();
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for row in &rows {
            let Some(candidate) = parse_candidate(row) else {
                tracing::debug!(branch = %branch, row = ?row, "Skipping malformed candidate row");
                continue;
            };
            if !seen.insert(candidate.id.clone()) {
                continue;
            }
            candidates.push(candidate);
            if candidates.len() == branch_params.result_cap {
                break;
            }
        }

        tracing::info!(
            branch = %branch,
            backend = self.graph.name(),
            returned,
            candidates = candidates.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Branch retrieval completed"
        );

        Ok(candidates)
    }

    /// Runs all three branches concurrently
    ///
    /// Outputs are reported per branch identity, independent of which query
    /// finished first. A failing branch never affects the others.
    pub async fn retrieve_all(&self, user_id: &str, config: &RecommendationConfig) -> RetrievalOutcome {
        let branches = &config.branches;
        let timeout = config.branch_timeout;

        let (recent_history, favorite_artist, profile) = tokio::join!(
            self.retrieve(Branch::RecentHistory, user_id, &branches.recent_history, timeout),
            self.retrieve(Branch::FavoriteArtist, user_id, &branches.favorite_artist, timeout),
            self.retrieve(Branch::Profile, user_id, &branches.profile, timeout),
        );

        let outcome = RetrievalOutcome {
            recent_history: BranchOutput::from_result(Branch::RecentHistory, recent_history),
            favorite_artist: BranchOutput::from_result(Branch::FavoriteArtist, favorite_artist),
            profile: BranchOutput::from_result(Branch::Profile, profile),
        };

        for output in outcome.in_merge_order() {
            if let Some(error) = &output.error {
                tracing::warn!(
                    user_id = %user_id,
                    branch = %output.branch,
                    error = %error,
                    "Branch failed, continuing with an empty result"
                );
            }
        }

        outcome
    }
}
