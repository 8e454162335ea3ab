//! Neo4j backend for [`GraphQueryPort`]
//!
//! Each [`QueryId`] maps to one Cypher statement. Parameters are bound by name
//! and every statement projects exactly the fields listed by
//! [`QueryId::fields`]; nulls are dropped from the resulting rows.

use neo4rs::{query, Graph, Query};
use std::sync::Arc;
use std::time::Instant;

use super::{GraphQueryPort, GraphRow, GraphValue, QueryId, QueryParams};
use crate::error::AppResult;

const USER_PROFILE_CYPHER: &str = r#"
    MATCH (u:User {id: $user_id})
    OPTIONAL MATCH (u)-[:LIKES_GENRE]->(liked:Genre)
    OPTIONAL MATCH (u)-[:DISLIKES_GENRE]->(disliked:Genre)
    OPTIONAL MATCH (u)-[:FOLLOWS]->(followed:Artist)
    WITH u,
         head(collect(DISTINCT liked.name)) AS favorite_genre,
         head(collect(DISTINCT disliked.name)) AS disliked_genre,
         head(collect(DISTINCT followed.name)) AS favorite_artist
    OPTIONAL MATCH (u)-[:LISTENED_TO]->(h:Track)
    WITH u, favorite_genre, disliked_genre, favorite_artist, h
    LIMIT $history_limit
    RETURN u.id AS user_id,
           u.danceability AS user_danceability,
           u.energy AS user_energy,
           u.valence AS user_valence,
           u.tempo_min AS tempo_min,
           u.tempo_max AS tempo_max,
           favorite_genre,
           disliked_genre,
           favorite_artist,
           h.id AS history_track_id,
           h.danceability AS history_danceability,
           h.energy AS history_energy,
           h.valence AS history_valence
"#;

const RECENT_HISTORY_CYPHER: &str = r#"
    MATCH (:User {id: $user_id})-[:LISTENED_TO]->(anchor:Track)
    WITH anchor LIMIT $anchor_limit
    MATCH (a:Artist)-[:CREATED]->(t:Track)-[:IN_PLAYLIST]->(:Playlist)-[:HAS_GENRE]->(g:Genre)
    WHERE t <> anchor
      AND abs(anchor.danceability - t.danceability) < $max_danceability_delta
      AND abs(anchor.energy - t.energy) < $max_energy_delta
      AND abs(anchor.valence - t.valence) < $max_valence_delta
    WITH t, head(collect(DISTINCT g.name)) AS genre, head(collect(DISTINCT a.name)) AS artist
    RETURN t.id AS track_id, t.name AS name,
           t.danceability AS danceability, t.energy AS energy, t.valence AS valence,
           genre, artist
    ORDER BY track_id
    LIMIT $result_cap
"#;

const FAVORITE_ARTIST_CYPHER: &str = r#"
    MATCH (:User {id: $user_id})-[:FOLLOWS]->(:Artist)-[:CREATED]->(anchor:Track)
    WITH anchor LIMIT $anchor_limit
    MATCH (a:Artist)-[:CREATED]->(t:Track)-[:IN_PLAYLIST]->(:Playlist)-[:HAS_GENRE]->(g:Genre)
    WHERE t <> anchor
      AND abs(anchor.danceability - t.danceability) < $max_danceability_delta
      AND abs(anchor.energy - t.energy) < $max_energy_delta
      AND abs(anchor.valence - t.valence) < $max_valence_delta
    WITH t, head(collect(DISTINCT g.name)) AS genre, head(collect(DISTINCT a.name)) AS artist
    RETURN t.id AS track_id, t.name AS name,
           t.danceability AS danceability, t.energy AS energy, t.valence AS valence,
           genre, artist
    ORDER BY track_id
    LIMIT $result_cap
"#;

const PROFILE_CYPHER: &str = r#"
    MATCH (u:User {id: $user_id})
    MATCH (a:Artist)-[:CREATED]->(t:Track)-[:IN_PLAYLIST]->(:Playlist)-[:HAS_GENRE]->(g:Genre)
    WHERE abs(t.danceability - u.danceability) < $max_danceability_delta
      AND abs(t.energy - u.energy) < $max_energy_delta
      AND abs(t.valence - u.valence) < $max_valence_delta
    WITH t, head(collect(DISTINCT g.name)) AS genre, head(collect(DISTINCT a.name)) AS artist
    RETURN t.id AS track_id, t.name AS name,
           t.danceability AS danceability, t.energy AS energy, t.valence AS valence,
           genre, artist
    ORDER BY track_id
    LIMIT $result_cap
"#;

fn cypher_for(query_id: QueryId) -> &'static str {
    match query_id {
        QueryId::UserProfile => USER_PROFILE_CYPHER,
        QueryId::RecentHistoryAffinity => RECENT_HISTORY_CYPHER,
        QueryId::FavoriteArtistAffinity => FAVORITE_ARTIST_CYPHER,
        QueryId::ProfileAffinity => PROFILE_CYPHER,
    }
}

fn bind(mut statement: Query, params: &QueryParams) -> Query {
    for (key, value) in params.iter() {
        statement = match value {
            GraphValue::Bool(b) => statement.param(key, *b),
            GraphValue::Int(i) => statement.param(key, *i),
            GraphValue::Float(f) => statement.param(key, *f),
            GraphValue::String(s) => statement.param(key, s.clone()),
        };
    }
    statement
}

/// Graph backend over a Neo4j connection pool
#[derive(Clone)]
pub struct Neo4jGraph {
    graph: Arc<Graph>,
}

impl Neo4jGraph {
    /// Connects to Neo4j
    pub async fn connect(uri: &str, user: &str, password: &str) -> AppResult<Self> {
        let graph = Graph::new(uri, user, password).await?;
        tracing::info!(uri = %uri, "Connected to Neo4j");

        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    /// Health check - verify the connection answers a trivial query
    pub async fn health_check(&self) -> AppResult<bool> {
        let mut result = self.graph.execute(query("RETURN 1 AS health")).await?;

        if let Some(row) = result.next().await? {
            let health: i64 = row.get("health").unwrap_or(0);
            Ok(health == 1)
        } else {
            Ok(false)
        }
    }
}

#[async_trait::async_trait]
impl GraphQueryPort for Neo4jGraph {
    async fn run(&self, query_id: QueryId, params: &QueryParams) -> AppResult<Vec<GraphRow>> {
        let start = Instant::now();
        let statement = bind(query(cypher_for(query_id)), params);

        let mut result = self.graph.execute(statement).await?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            let mut graph_row = GraphRow::new();
            for field in query_id.fields() {
                // Nulls and values of unsupported types are left out of the row
                if let Ok(Some(value)) = row.get::<Option<GraphValue>>(field) {
                    graph_row.insert(field, value);
                }
            }
            rows.push(graph_row);
        }

        tracing::debug!(
            query = %query_id,
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Graph query completed"
        );

        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "neo4j"
    }
}
