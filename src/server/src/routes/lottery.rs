//! 公共抽奖接口：统计、最近中奖者、参与

use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

use crate::errors::reject;
use crate::state::ServerState;
use crate::types::{ApiResponse, ParticipateRequest};
use crate::utils::{maintenance_gate, with_state};

async fn lottery_stats(state: Arc<ServerState>) -> Result<impl Reply, Rejection> {
    let stats = state.participation.current_stats().await.map_err(reject)?;
    Ok(warp::reply::json(&ApiResponse::success(stats)))
}

async fn lottery_winners(state: Arc<ServerState>) -> Result<impl Reply, Rejection> {
    let winners = state.participation.recent_winners().await.map_err(reject)?;
    Ok(warp::reply::json(&ApiResponse::success(winners)))
}

async fn lottery_participate(state: Arc<ServerState>, req: ParticipateRequest) -> Result<impl Reply, Rejection> {
    let ticket = state.participation.participate(req.user_id.trim()).await.map_err(reject)?;
    Ok(warp::reply::json(&ApiResponse::success(ticket)))
}

pub fn routes(state: Arc<ServerState>) -> warp::filters::BoxedFilter<(impl Reply,)> {
    let gate = maintenance_gate(Arc::clone(&state));

    let stats_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "lottery" / "stats")
            .and(warp::get())
            .and(gate.clone())
            .and(with_state(state))
            .and_then(|state: Arc<ServerState>| async move { lottery_stats(state).await })
            .boxed()
    };
    let winners_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "lottery" / "winners")
            .and(warp::get())
            .and(gate.clone())
            .and(with_state(state))
            .and_then(|state: Arc<ServerState>| async move { lottery_winners(state).await })
            .boxed()
    };
    let participate_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "lottery" / "participate")
            .and(warp::post())
            .and(gate.clone())
            .and(warp::body::content_length_limit(16 * 1024))
            .and(warp::body::json())
            .and(with_state(state))
            .and_then(|req: ParticipateRequest, state: Arc<ServerState>| async move { lottery_participate(state, req).await })
            .boxed()
    };

    stats_route
        .or(winners_route)
        .or(participate_route)
        .boxed()
}
