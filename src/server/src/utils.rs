use std::convert::Infallible;
use std::sync::Arc;
use warp::http::HeaderMap;
use warp::{Filter, Rejection};

use crate::errors::ServerError;
use crate::state::ServerState;

pub fn with_state(state: Arc<ServerState>) -> impl Filter<Extract = (Arc<ServerState>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

/// 校验 X-Admin-Token
pub fn require_admin(state: Arc<ServerState>) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::headers_cloned()
        .and(with_state(state))
        .and_then(|headers: HeaderMap, state: Arc<ServerState>| async move {
            if state.is_admin(&headers) {
                Ok(())
            } else {
                Err(warp::reject::custom(ServerError::Unauthorized))
            }
        })
        .untuple_one()
}

/// 维护模式下只放行管理员
pub fn maintenance_gate(state: Arc<ServerState>) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::headers_cloned()
        .and(with_state(state))
        .and_then(|headers: HeaderMap, state: Arc<ServerState>| async move {
            match state.settings().maintenance().await {
                Some(message) if !state.is_admin(&headers) => Err(warp::reject::custom(ServerError::Maintenance(message))),
                _ => Ok(()),
            }
        })
        .untuple_one()
}
