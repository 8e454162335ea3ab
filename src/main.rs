use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use track_recommender::{
    config::Config,
    graph::Neo4jGraph,
    routes::{create_router, AppState},
    services::RecommendationService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "track_recommender=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let recommendation_config = config.recommendation_config()?;

    tracing::info!(uri = %config.neo4j_uri, "Connecting to Neo4j");
    let graph = Neo4jGraph::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password).await?;
    if !graph.health_check().await? {
        anyhow::bail!("Neo4j health check failed");
    }

    let recommender = RecommendationService::new(Arc::new(graph), recommendation_config);
    let app = create_router(Arc::new(AppState::new(recommender)));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
