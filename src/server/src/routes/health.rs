use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

use crate::state::ServerState;
use crate::utils::with_state;

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    timestamp: i64,
    version: String,
    scheduler_interval_secs: u64,
}

async fn health_check(state: Arc<ServerState>) -> Result<impl Reply, Rejection> {
    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        scheduler_interval_secs: state.config().scheduler_interval.as_secs(),
    };
    Ok(warp::reply::json(&response))
}

pub fn routes(state: Arc<ServerState>) -> warp::filters::BoxedFilter<(impl Reply,)> {
    warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .and_then(|state: Arc<ServerState>| async move { health_check(state).await })
        .boxed()
}
