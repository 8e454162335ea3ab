use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    graph::{fields, params, GraphQueryPort, GraphRow, QueryId, QueryParams},
    models::{FeatureVector, TempoRange, UserSnapshot},
};

/// Running per-feature sums that skip missing values
#[derive(Debug, Default)]
struct FeatureMeans {
    sums: [f64; 3],
    counts: [usize; 3],
}

impl FeatureMeans {
    fn observe(&mut self, values: [Option<f64>; 3]) {
        for (idx, value) in values.iter().enumerate() {
            if let Some(v) = value {
                self.sums[idx] += v;
                self.counts[idx] += 1;
            }
        }
    }

    /// Mean of each feature; a feature never observed is 0.0
    fn finish(&self) -> FeatureVector {
        let mean = |idx: usize| {
            if self.counts[idx] == 0 {
                0.0
            } else {
                self.sums[idx] / self.counts[idx] as f64
            }
        };
        FeatureVector::new(mean(0), mean(1), mean(2))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn has_history(row: &GraphRow) -> bool {
    [
        fields::HISTORY_TRACK_ID,
        fields::HISTORY_DANCEABILITY,
        fields::HISTORY_ENERGY,
        fields::HISTORY_VALENCE,
    ]
    .iter()
    .any(|field| row.get(field).is_some())
}

/// Builds the per-run user snapshot from the graph
#[derive(Clone)]
pub struct UserProfileLoader {
    graph: Arc<dyn GraphQueryPort>,
}

impl UserProfileLoader {
    pub fn new(graph: Arc<dyn GraphQueryPort>) -> Self {
        Self { graph }
    }

    /// Loads the snapshot for `user_id`
    ///
    /// The history average covers at most `history_limit` listened tracks in
    /// whatever order the graph returns them; the store gives no recency
    /// guarantee, so this is a sample rather than the most recent tracks.
    pub async fn load(&self, user_id: &str, history_limit: usize) -> AppResult<UserSnapshot> {
        let query_params = QueryParams::new()
            .param(params::USER_ID, user_id)
            .param(params::HISTORY_LIMIT, history_limit);

        let rows = self
            .graph
            .run(QueryId::UserProfile, &query_params)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "User profile query failed");
                e
            })?;

        let Some(user_row) = rows.first() else {
            tracing::warn!(user_id = %user_id, "User not found");
            return Err(AppError::UserNotFound(user_id.to_string()));
        };

        let static_profile = FeatureVector::new(
            user_row.get_f64(fields::USER_DANCEABILITY).unwrap_or(0.0),
            user_row.get_f64(fields::USER_ENERGY).unwrap_or(0.0),
            user_row.get_f64(fields::USER_VALENCE).unwrap_or(0.0),
        );

        let mut means = FeatureMeans::default();
        let mut listened_ids = HashSet::new();
        let mut history_tracks = 0;

        for row in rows.iter().filter(|r| has_history(r)).take(history_limit) {
            history_tracks += 1;
            means.observe([
                row.get_f64(fields::HISTORY_DANCEABILITY),
                row.get_f64(fields::HISTORY_ENERGY),
                row.get_f64(fields::HISTORY_VALENCE),
            ]);
            if let Some(track_id) = row.get_string(fields::HISTORY_TRACK_ID) {
                listened_ids.insert(track_id);
            }
        }

        let snapshot = UserSnapshot {
            user_id: user_id.to_string(),
            avg_history: means.finish(),
            static_profile,
            favorite_genre: non_empty(user_row.get_string(fields::FAVORITE_GENRE)),
            disliked_genre: non_empty(user_row.get_string(fields::DISLIKED_GENRE)),
            favorite_artist: non_empty(user_row.get_string(fields::FAVORITE_ARTIST)),
            tempo_range: TempoRange::from_bounds(
                user_row.get_f64(fields::TEMPO_MIN),
                user_row.get_f64(fields::TEMPO_MAX),
            ),
            listened_ids,
        };

        snapshot.validate()?;

        tracing::info!(
            user_id = %user_id,
            history_tracks,
            listened = snapshot.listened_ids.len(),
            favorite_genre = ?snapshot.favorite_genre,
            favorite_artist = ?snapshot.favorite_artist,
            "Loaded user snapshot"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphValue, MockGraphQueryPort};

    fn user_row() -> GraphRow {
        GraphRow::new()
            .with(fields::USER_ID, "1")
            .with(fields::USER_DANCEABILITY, 0.6)
            .with(fields::USER_ENERGY, 0.7)
            .with(fields::USER_VALENCE, 0.8)
    }

    fn history_row(id: &str, d: Option<f64>, e: Option<f64>, v: Option<f64>) -> GraphRow {
        let mut row = user_row().with(fields::HISTORY_TRACK_ID, id);
        if let Some(d) = d {
            row.insert(fields::HISTORY_DANCEABILITY, d);
        }
        if let Some(e) = e {
            row.insert(fields::HISTORY_ENERGY, e);
        }
        if let Some(v) = v {
            row.insert(fields::HISTORY_VALENCE, v);
        }
        row
    }

    fn loader_returning(rows: Vec<GraphRow>) -> UserProfileLoader {
        let mut mock = MockGraphQueryPort::new();
        mock.expect_run()
            .withf(|query, _| *query == QueryId::UserProfile)
            .times(1)
            .returning(move |_, _| Ok(rows.clone()));
        UserProfileLoader::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let loader = loader_returning(vec![]);
        let err = loader.load("missing", 30).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_passes_user_and_history_limit() {
        let mut mock = MockGraphQueryPort::new();
        mock.expect_run()
            .withf(|query, query_params| {
                *query == QueryId::UserProfile
                    && query_params.get(params::USER_ID) == Some(&GraphValue::from("42"))
                    && query_params.get(params::HISTORY_LIMIT) == Some(&GraphValue::Int(30))
            })
            .times(1)
            .returning(|_, _| Ok(vec![user_row()]));

        let loader = UserProfileLoader::new(Arc::new(mock));
        assert!(loader.load("42", 30).await.is_ok());
    }

    #[tokio::test]
    async fn test_user_without_relationships_survives() {
        let loader = loader_returning(vec![user_row()]);
        let snapshot = loader.load("1", 30).await.unwrap();

        assert_eq!(snapshot.static_profile, FeatureVector::new(0.6, 0.7, 0.8));
        assert_eq!(snapshot.avg_history, FeatureVector::zero());
        assert!(snapshot.listened_ids.is_empty());
        assert_eq!(snapshot.favorite_genre, None);
        assert_eq!(snapshot.favorite_artist, None);
        assert_eq!(snapshot.tempo_range, TempoRange::default());
    }

    #[tokio::test]
    async fn test_history_mean_skips_missing_values() {
        let loader = loader_returning(vec![
            history_row("t1", Some(0.2), Some(0.4), None),
            history_row("t2", Some(0.4), None, None),
            history_row("t3", None, Some(0.8), None),
        ]);
        let snapshot = loader.load("1", 30).await.unwrap();

        assert!((snapshot.avg_history.danceability - 0.3).abs() < 1e-12);
        assert!((snapshot.avg_history.energy - 0.6).abs() < 1e-12);
        // No valence observed at all
        assert_eq!(snapshot.avg_history.valence, 0.0);
        assert_eq!(snapshot.listened_ids.len(), 3);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let rows: Vec<GraphRow> = (0..40)
            .map(|i| history_row(&format!("t{}", i), Some(0.5), Some(0.5), Some(0.5)))
            .collect();
        let loader = loader_returning(rows);

        let snapshot = loader.load("1", 30).await.unwrap();
        assert_eq!(snapshot.listened_ids.len(), 30);
    }

    #[tokio::test]
    async fn test_preferences_and_tempo() {
        let row = history_row("t1", Some(0.5), Some(0.5), Some(0.5))
            .with(fields::FAVORITE_GENRE, "Pop")
            .with(fields::DISLIKED_GENRE, "Metal")
            .with(fields::FAVORITE_ARTIST, "")
            .with(fields::TEMPO_MIN, 90i64);
        let loader = loader_returning(vec![row]);

        let snapshot = loader.load("1", 30).await.unwrap();
        assert_eq!(snapshot.favorite_genre.as_deref(), Some("Pop"));
        assert_eq!(snapshot.disliked_genre.as_deref(), Some("Metal"));
        // Blank artist names never count as a preference
        assert_eq!(snapshot.favorite_artist, None);
        assert_eq!(snapshot.tempo_range, TempoRange { min: 90.0, max: 180.0 });
        assert!(snapshot.has_listened("t1"));
    }

    #[tokio::test]
    async fn test_conflicting_genres_are_rejected() {
        let row = user_row()
            .with(fields::FAVORITE_GENRE, "Pop")
            .with(fields::DISLIKED_GENRE, "Pop");
        let loader = loader_returning(vec![row]);

        let err = loader.load("1", 30).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidProfile(_)));
    }

    #[tokio::test]
    async fn test_graph_failure_propagates() {
        let mut mock = MockGraphQueryPort::new();
        mock.expect_run()
            .returning(|_, _| Err(AppError::GraphQuery("connection refused".to_string())));

        let loader = UserProfileLoader::new(Arc::new(mock));
        let err = loader.load("1", 30).await.unwrap_err();
        assert!(matches!(err, AppError::GraphQuery(_)));
    }
}
