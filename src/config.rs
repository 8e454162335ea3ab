use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::models::{Branch, FeatureThresholds};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Neo4j bolt URI
    #[serde(default = "default_neo4j_uri")]
    pub neo4j_uri: String,

    #[serde(default = "default_neo4j_user")]
    pub neo4j_user: String,

    pub neo4j_password: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of recommendations returned per run
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Fixed jitter seed; unset means a fresh seed per run
    #[serde(default)]
    pub rng_seed: Option<u64>,

    /// Relative jitter amplitude applied to raw scores
    #[serde(default = "default_jitter")]
    pub jitter: f64,

    #[serde(default = "default_branch_timeout_ms")]
    pub branch_timeout_ms: u64,

    /// Listened tracks sampled for the history average
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_neo4j_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_neo4j_user() -> String {
    "neo4j".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_jitter() -> f64 {
    DEFAULT_JITTER
}

fn default_branch_timeout_ms() -> u64 {
    DEFAULT_BRANCH_TIMEOUT_MS
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Builds the validated pipeline configuration
    pub fn recommendation_config(&self) -> AppResult<RecommendationConfig> {
        let config = RecommendationConfig {
            top_n: self.top_n,
            rng_seed: self.rng_seed,
            jitter: self.jitter,
            branch_timeout: Duration::from_millis(self.branch_timeout_ms),
            history_limit: self.history_limit,
            ..RecommendationConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

pub const DEFAULT_TOP_N: usize = 30;
pub const DEFAULT_JITTER: f64 = 0.05;
pub const DEFAULT_BRANCH_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_HISTORY_LIMIT: usize = 30;
pub const DEFAULT_ANCHOR_LIMIT: usize = 20;
pub const DEFAULT_RESULT_CAP: usize = 250;

/// Sum of the default scoring weights
pub const DEFAULT_WEIGHT_TOTAL: f64 = 1.0;

/// Query parameters for one retrieval branch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchParams {
    pub thresholds: FeatureThresholds,
    /// Anchor tracks compared against; unused by the profile branch
    pub anchor_limit: usize,
    pub result_cap: usize,
}

impl BranchParams {
    pub fn new(delta: f64) -> Self {
        Self {
            thresholds: FeatureThresholds::uniform(delta),
            anchor_limit: DEFAULT_ANCHOR_LIMIT,
            result_cap: DEFAULT_RESULT_CAP,
        }
    }
}

/// Parameters for all three branches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchSettings {
    pub recent_history: BranchParams,
    pub favorite_artist: BranchParams,
    pub profile: BranchParams,
}

impl Default for BranchSettings {
    fn default() -> Self {
        Self {
            recent_history: BranchParams::new(0.035),
            favorite_artist: BranchParams::new(0.025),
            profile: BranchParams::new(0.06),
        }
    }
}

impl BranchSettings {
    pub fn for_branch(&self, branch: Branch) -> &BranchParams {
        match branch {
            Branch::RecentHistory => &self.recent_history,
            Branch::FavoriteArtist => &self.favorite_artist,
            Branch::Profile => &self.profile,
        }
    }
}

/// Weights of the five scoring signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Similarity to the listening history average
    pub history_similarity: f64,
    /// Similarity to the static profile
    pub profile_similarity: f64,
    pub favorite_artist: f64,
    /// Applied as a bonus for the favorite genre, a penalty for the disliked one
    pub genre: f64,
    /// Penalty for tracks already listened to
    pub already_listened: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            history_similarity: 0.4,
            profile_similarity: 0.2,
            favorite_artist: 0.15,
            genre: 0.1,
            already_listened: 0.15,
        }
    }
}

impl ScoringWeights {
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.history_similarity,
            self.profile_similarity,
            self.favorite_artist,
            self.genre,
            self.already_listened,
        ]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

/// Everything a recommendation run depends on, passed explicitly to each stage
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationConfig {
    pub branches: BranchSettings,
    pub weights: ScoringWeights,
    pub jitter: f64,
    pub rng_seed: Option<u64>,
    pub top_n: usize,
    pub history_limit: usize,
    pub branch_timeout: Duration,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            branches: BranchSettings::default(),
            weights: ScoringWeights::default(),
            jitter: DEFAULT_JITTER,
            rng_seed: None,
            top_n: DEFAULT_TOP_N,
            history_limit: DEFAULT_HISTORY_LIMIT,
            branch_timeout: Duration::from_millis(DEFAULT_BRANCH_TIMEOUT_MS),
        }
    }
}

impl RecommendationConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self
            .weights
            .as_array()
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(AppError::InvalidInput(
                "scoring weights must be finite and non-negative".to_string(),
            ));
        }

        for branch in Branch::ALL {
            let params = self.branches.for_branch(branch);
            if !params.thresholds.all_positive() {
                return Err(AppError::InvalidInput(format!(
                    "{} thresholds must be positive",
                    branch
                )));
            }
            if params.result_cap == 0 || params.anchor_limit == 0 {
                return Err(AppError::InvalidInput(format!(
                    "{} result cap and anchor limit must be positive",
                    branch
                )));
            }
        }

        if !(0.0..1.0).contains(&self.jitter) {
            return Err(AppError::InvalidInput(format!(
                "jitter must be in [0, 1), got {}",
                self.jitter
            )));
        }
        if self.top_n == 0 {
            return Err(AppError::InvalidInput("top_n must be positive".to_string()));
        }
        if self.history_limit == 0 {
            return Err(AppError::InvalidInput(
                "history_limit must be positive".to_string(),
            ));
        }
        if self.branch_timeout.is_zero() {
            return Err(AppError::InvalidInput(
                "branch timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
