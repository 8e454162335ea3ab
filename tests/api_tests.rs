use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

use track_recommender::{
    config::RecommendationConfig,
    error::AppResult,
    graph::{fields, params, GraphQueryPort, GraphRow, GraphValue, QueryId, QueryParams},
    models::{FeatureThresholds, FeatureVector},
    routes::{create_router, AppState},
    services::RecommendationService,
};

struct Track {
    id: &'static str,
    features: FeatureVector,
    genre: &'static str,
    artist: &'static str,
}

struct User {
    id: &'static str,
    profile: FeatureVector,
    favorite_genre: &'static str,
    disliked_genre: &'static str,
    follows: &'static str,
    listened: Vec<&'static str>,
}

/// In-memory catalog answering the same questions as the Neo4j queries
struct FakeGraph {
    users: Vec<User>,
    tracks: Vec<Track>,
}

impl FakeGraph {
    fn seeded() -> Self {
        let track = |id, d, e, v, genre, artist| Track {
            id,
            features: FeatureVector::new(d, e, v),
            genre,
            artist,
        };
        Self {
            users: vec![User {
                id: "1",
                profile: FeatureVector::new(0.5, 0.5, 0.5),
                favorite_genre: "Pop",
                disliked_genre: "Metal",
                follows: "A",
                listened: vec!["h1"],
            }],
            tracks: vec![
                track("h1", 0.5, 0.5, 0.5, "Pop", "A"),
                track("near1", 0.51, 0.52, 0.49, "Pop", "A"),
                track("near2", 0.52, 0.5, 0.51, "Metal", "B"),
                track("p1", 0.55, 0.45, 0.5, "Rock", "D"),
                track("far", 0.1, 0.9, 0.2, "Jazz", "C"),
            ],
        }
    }

    fn user(&self, query_params: &QueryParams) -> Option<&User> {
        let id = query_params.get(params::USER_ID)?.as_string()?;
        self.users.iter().find(|u| u.id == id)
    }

    fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    fn thresholds(query_params: &QueryParams) -> FeatureThresholds {
        let delta = |key| {
            query_params
                .get(key)
                .and_then(GraphValue::as_f64)
                .unwrap_or(0.0)
        };
        FeatureThresholds {
            danceability: delta(params::MAX_DANCEABILITY_DELTA),
            energy: delta(params::MAX_ENERGY_DELTA),
            valence: delta(params::MAX_VALENCE_DELTA),
        }
    }

    fn limit(query_params: &QueryParams, key: &str) -> usize {
        query_params
            .get(key)
            .and_then(GraphValue::as_f64)
            .map(|v| v as usize)
            .unwrap_or(usize::MAX)
    }

    fn profile_rows(&self, user: &User, query_params: &QueryParams) -> Vec<GraphRow> {
        let base = GraphRow::new()
            .with(fields::USER_ID, user.id)
            .with(fields::USER_DANCEABILITY, user.profile.danceability)
            .with(fields::USER_ENERGY, user.profile.energy)
            .with(fields::USER_VALENCE, user.profile.valence)
            .with(fields::FAVORITE_GENRE, user.favorite_genre)
            .with(fields::DISLIKED_GENRE, user.disliked_genre)
            .with(fields::FAVORITE_ARTIST, user.follows);

        let history: Vec<GraphRow> = user
            .listened
            .iter()
            .filter_map(|id| self.track(id))
            .take(Self::limit(query_params, params::HISTORY_LIMIT))
            .map(|t| {
                base.clone()
                    .with(fields::HISTORY_TRACK_ID, t.id)
                    .with(fields::HISTORY_DANCEABILITY, t.features.danceability)
                    .with(fields::HISTORY_ENERGY, t.features.energy)
                    .with(fields::HISTORY_VALENCE, t.features.valence)
            })
            .collect();

        if history.is_empty() {
            vec![base]
        } else {
            history
        }
    }

    fn similar_to(&self, anchors: &[&Track], query_params: &QueryParams) -> Vec<GraphRow> {
        let thresholds = Self::thresholds(query_params);
        let anchors = &anchors[..anchors.len().min(Self::limit(query_params, params::ANCHOR_LIMIT))];

        let ids: BTreeSet<&str> = self
            .tracks
            .iter()
            .filter(|t| {
                anchors
                    .iter()
                    .any(|a| a.id != t.id && thresholds.admits(&a.features, &t.features))
            })
            .map(|t| t.id)
            .collect();

        self.candidate_rows(ids, query_params)
    }

    fn candidate_rows(&self, ids: BTreeSet<&str>, query_params: &QueryParams) -> Vec<GraphRow> {
        ids.into_iter()
            .filter_map(|id| self.track(id))
            .take(Self::limit(query_params, params::RESULT_CAP))
            .map(|t| {
                GraphRow::new()
                    .with(fields::TRACK_ID, t.id)
                    .with(fields::NAME, format!("Song {}", t.id))
                    .with(fields::DANCEABILITY, t.features.danceability)
                    .with(fields::ENERGY, t.features.energy)
                    .with(fields::VALENCE, t.features.valence)
                    .with(fields::GENRE, t.genre)
                    .with(fields::ARTIST, t.artist)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl GraphQueryPort for FakeGraph {
    async fn run(&self, query: QueryId, query_params: &QueryParams) -> AppResult<Vec<GraphRow>> {
        let Some(user) = self.user(query_params) else {
            return Ok(vec![]);
        };

        let rows = match query {
            QueryId::UserProfile => self.profile_rows(user, query_params),
            QueryId::RecentHistoryAffinity => {
                let anchors: Vec<&Track> =
                    user.listened.iter().filter_map(|id| self.track(id)).collect();
                self.similar_to(&anchors, query_params)
            }
            QueryId::FavoriteArtistAffinity => {
                let anchors: Vec<&Track> =
                    self.tracks.iter().filter(|t| t.artist == user.follows).collect();
                self.similar_to(&anchors, query_params)
            }
            QueryId::ProfileAffinity => {
                let thresholds = Self::thresholds(query_params);
                let ids = self
                    .tracks
                    .iter()
                    .filter(|t| thresholds.admits(&user.profile, &t.features))
                    .map(|t| t.id)
                    .collect();
                self.candidate_rows(ids, query_params)
            }
        };
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn create_test_server() -> TestServer {
    let config = RecommendationConfig {
        jitter: 0.0,
        ..RecommendationConfig::default()
    };
    let recommender = RecommendationService::new(Arc::new(FakeGraph::seeded()), config);
    let app = create_router(Arc::new(AppState::new(recommender)));
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_recommendations_ranked() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "user_id": "1" }))
        .await;

    response.assert_status_ok();
    let report: Value = response.json();
    let entries = report["entries"].as_array().unwrap();

    let ids: Vec<&str> = entries
        .iter()
        .map(|e| e["track_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 4);
    assert!(!ids.contains(&"far"));

    // Favorite artist and genre, close to both profiles, not yet heard
    assert_eq!(ids[0], "near1");
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[0]["normalized_score"], 10.0);
    // Disliked genre
    assert_eq!(ids[3], "near2");
    assert_eq!(entries[3]["normalized_score"], 0.0);

    assert_eq!(report["user_id"], "1");
    assert_eq!(report["diagnostics"]["pool"]["merged"], 4);
    assert_eq!(report["diagnostics"]["failed_branches"], 0);
    assert_eq!(report["profile"]["favorite_genre"], "Pop");
    assert_eq!(report["profile"]["listened_count"], 1);
    assert!(report["warnings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_recommendations_top_n_override() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "user_id": "1", "top_n": 2, "seed": 5 }))
        .await;

    response.assert_status_ok();
    let report: Value = response.json();
    assert_eq!(report["entries"].as_array().unwrap().len(), 2);
    assert_eq!(report["entries"][0]["track_id"], "near1");
}

#[tokio::test]
async fn test_unknown_user_returns_not_found() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "user_id": "404" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_zero_top_n_is_rejected() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "user_id": "1", "top_n": 0 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let request_id = "7b0e5c8e-7d8a-4c43-9a52-3f1f4f0f2a11";

    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static(request_id),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-request-id"), request_id);
}
