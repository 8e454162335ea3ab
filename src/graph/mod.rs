//! Graph access abstraction
//!
//! The recommender never talks to a database directly. Everything it reads
//! goes through [`GraphQueryPort`]: a named query plus named parameters in,
//! rows of named scalar fields out. Each [`QueryId`] documents the parameters
//! it consumes and the fields it projects, so any store able to answer the
//! same questions (a property graph, a relational schema, an in-memory
//! fixture) can back the recommender.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use crate::error::AppResult;

pub mod neo4j;

pub use neo4j::Neo4jGraph;

/// Parameter names understood by the queries
pub mod params {
    pub const USER_ID: &str = "user_id";
    pub const HISTORY_LIMIT: &str = "history_limit";
    pub const ANCHOR_LIMIT: &str = "anchor_limit";
    pub const MAX_DANCEABILITY_DELTA: &str = "max_danceability_delta";
    pub const MAX_ENERGY_DELTA: &str = "max_energy_delta";
    pub const MAX_VALENCE_DELTA: &str = "max_valence_delta";
    pub const RESULT_CAP: &str = "result_cap";
}

/// Field names projected by the queries
pub mod fields {
    // Candidate rows
    pub const TRACK_ID: &str = "track_id";
    pub const NAME: &str = "name";
    pub const DANCEABILITY: &str = "danceability";
    pub const ENERGY: &str = "energy";
    pub const VALENCE: &str = "valence";
    pub const GENRE: &str = "genre";
    pub const ARTIST: &str = "artist";

    // Profile rows
    pub const USER_ID: &str = "user_id";
    pub const USER_DANCEABILITY: &str = "user_danceability";
    pub const USER_ENERGY: &str = "user_energy";
    pub const USER_VALENCE: &str = "user_valence";
    pub const TEMPO_MIN: &str = "tempo_min";
    pub const TEMPO_MAX: &str = "tempo_max";
    pub const FAVORITE_GENRE: &str = "favorite_genre";
    pub const DISLIKED_GENRE: &str = "disliked_genre";
    pub const FAVORITE_ARTIST: &str = "favorite_artist";
    pub const HISTORY_TRACK_ID: &str = "history_track_id";
    pub const HISTORY_DANCEABILITY: &str = "history_danceability";
    pub const HISTORY_ENERGY: &str = "history_energy";
    pub const HISTORY_VALENCE: &str = "history_valence";
}

const CANDIDATE_FIELDS: &[&str] = &[
    fields::TRACK_ID,
    fields::NAME,
    fields::DANCEABILITY,
    fields::ENERGY,
    fields::VALENCE,
    fields::GENRE,
    fields::ARTIST,
];

const PROFILE_FIELDS: &[&str] = &[
    fields::USER_ID,
    fields::USER_DANCEABILITY,
    fields::USER_ENERGY,
    fields::USER_VALENCE,
    fields::TEMPO_MIN,
    fields::TEMPO_MAX,
    fields::FAVORITE_GENRE,
    fields::DISLIKED_GENRE,
    fields::FAVORITE_ARTIST,
    fields::HISTORY_TRACK_ID,
    fields::HISTORY_DANCEABILITY,
    fields::HISTORY_ENERGY,
    fields::HISTORY_VALENCE,
];

/// Queries the recommender issues against the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryId {
    /// The user node with its optional relationships.
    ///
    /// Params: `user_id`, `history_limit`.
    /// One row per sampled listened track (at most `history_limit`), or a
    /// single row with no `history_*` fields when the user has no history.
    /// Zero rows when the user does not exist. User and preference fields are
    /// repeated on every row.
    UserProfile,
    /// Tracks close to any of the first `anchor_limit` listened tracks.
    ///
    /// Params: `user_id`, `anchor_limit`, the three `max_*_delta`, `result_cap`.
    RecentHistoryAffinity,
    /// Tracks close to any of the first `anchor_limit` tracks created by a
    /// followed artist.
    ///
    /// Params: same as `RecentHistoryAffinity`.
    FavoriteArtistAffinity,
    /// Tracks close to the user's own feature values.
    ///
    /// Params: `user_id`, the three `max_*_delta`, `result_cap`.
    ProfileAffinity,
}

impl QueryId {
    /// Fields a row of this query may carry
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            QueryId::UserProfile => PROFILE_FIELDS,
            QueryId::RecentHistoryAffinity
            | QueryId::FavoriteArtistAffinity
            | QueryId::ProfileAffinity => CANDIDATE_FIELDS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryId::UserProfile => "user_profile",
            QueryId::RecentHistoryAffinity => "recent_history_affinity",
            QueryId::FavoriteArtistAffinity => "favorite_artist_affinity",
            QueryId::ProfileAffinity => "profile_affinity",
        }
    }
}

impl Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scalar value read from or sent to the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl GraphValue {
    /// Numeric view; integers are widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GraphValue::Int(i) => Some(*i as f64),
            GraphValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text view; integer ids are rendered as strings
    pub fn as_string(&self) -> Option<String> {
        match self {
            GraphValue::String(s) => Some(s.clone()),
            GraphValue::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for GraphValue {
    fn from(value: &str) -> Self {
        GraphValue::String(value.to_string())
    }
}

impl From<String> for GraphValue {
    fn from(value: String) -> Self {
        GraphValue::String(value)
    }
}

impl From<f64> for GraphValue {
    fn from(value: f64) -> Self {
        GraphValue::Float(value)
    }
}

impl From<i64> for GraphValue {
    fn from(value: i64) -> Self {
        GraphValue::Int(value)
    }
}

impl From<usize> for GraphValue {
    fn from(value: usize) -> Self {
        GraphValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for GraphValue {
    fn from(value: bool) -> Self {
        GraphValue::Bool(value)
    }
}

/// Named query parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(BTreeMap<String, GraphValue>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: &str, value: impl Into<GraphValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&GraphValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GraphValue)> {
        self.0.iter()
    }
}

/// One result row; null and absent fields are simply not present
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphRow(HashMap<String, GraphValue>);

impl GraphRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<GraphValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<GraphValue>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&GraphValue> {
        self.0.get(field)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(GraphValue::as_f64)
    }

    pub fn get_string(&self, field: &str) -> Option<String> {
        self.get(field).and_then(GraphValue::as_string)
    }
}

/// Executes parameterized graph queries
///
/// Implementations translate each [`QueryId`] into their native query facility.
/// Errors are reported as [`crate::error::AppError::GraphQuery`]; callers decide
/// whether a failure is fatal.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GraphQueryPort: Send + Sync {
    async fn run(&self, query: QueryId, params: &QueryParams) -> AppResult<Vec<GraphRow>>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}
