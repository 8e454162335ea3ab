use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::RecommendationConfig,
    error::{AppError, AppResult},
    graph::GraphQueryPort,
    models::{report, ProfileSummary, RecommendationReport, RunDiagnostics, RunWarning},
    services::{
        pool::CandidatePool, profile::UserProfileLoader, ranking::normalize,
        retrieval::CandidateRetriever, scoring::ScoringEngine,
    },
};

/// Per-request adjustments to the configured run parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RecommendationOverrides {
    pub top_n: Option<usize>,
    pub seed: Option<u64>,
}

/// Runs the full recommendation pipeline for one user at a time
///
/// Load the snapshot, retrieve the three branches concurrently, merge, score,
/// then normalize and rank. Each run only reads shared state, so concurrent
/// runs for different users are independent.
#[derive(Clone)]
pub struct RecommendationService {
    profiles: UserProfileLoader,
    retriever: CandidateRetriever,
    config: RecommendationConfig,
}

impl RecommendationService {
    pub fn new(graph: Arc<dyn GraphQueryPort>, config: RecommendationConfig) -> Self {
        Self {
            profiles: UserProfileLoader::new(graph.clone()),
            retriever: CandidateRetriever::new(graph),
            config,
        }
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    pub async fn recommend(
        &self,
        user_id: &str,
        overrides: RecommendationOverrides,
    ) -> AppResult<RecommendationReport> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::InvalidInput("user_id must not be empty".to_string()));
        }
        let top_n = match overrides.top_n {
            Some(0) => {
                return Err(AppError::InvalidInput("top_n must be positive".to_string()));
            }
            Some(n) => n,
            None => self.config.top_n,
        };
        let seed = overrides.seed.or(self.config.rng_seed);

        let run_id = Uuid::new_v4();
        let start = Instant::now();
        tracing::info!(
            run_id = %run_id,
            user_id = %user_id,
            top_n,
            seed = ?seed,
            "Starting recommendation run"
        );

        let snapshot = self.profiles.load(user_id, self.config.history_limit).await?;

        let outcome = self.retriever.retrieve_all(user_id, &self.config).await;
        let mut warnings: Vec<RunWarning> = outcome
            .in_merge_order()
            .iter()
            .filter_map(|output| {
                output.error.as_ref().map(|error| RunWarning::BranchQueryFailed {
                    branch: output.branch,
                    reason: error.to_string(),
                })
            })
            .collect();

        let pool = CandidatePool::merge(
            &outcome.recent_history.candidates,
            &outcome.favorite_artist.candidates,
            &outcome.profile.candidates,
        );
        if pool.is_empty() {
            tracing::warn!(run_id = %run_id, user_id = %user_id, "No candidates retrieved");
            warnings.push(RunWarning::EmptyCandidatePool);
        }

        let scored = ScoringEngine::from_config(&self.config).score(&pool, &snapshot, seed);
        let ranked = normalize(scored, top_n);

        let report = RecommendationReport {
            run_id,
            user_id: user_id.to_string(),
            generated_at: Utc::now(),
            entries: report::to_entries(&ranked),
            diagnostics: RunDiagnostics::new(pool.stats(), outcome.failed_branches()),
            warnings,
            profile: ProfileSummary::from(&snapshot),
        };

        tracing::info!(
            run_id = %run_id,
            user_id = %user_id,
            pool_size = pool.len(),
            duplicates = report.diagnostics.duplicates,
            failed_branches = report.diagnostics.failed_branches,
            returned = report.entries.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Recommendation run completed"
        );

        Ok(report)
    }
}
