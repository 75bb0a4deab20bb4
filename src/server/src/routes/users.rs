//! 用户注册与个人资料（身份认证不在本服务范围内）
//!
//! 注册不受维护模式限制，但受 registrationEnabled 开关控制

use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::core::models::User;
use crate::core::store::UserStore;
use crate::errors::{reject, LotteryError};
use crate::state::ServerState;
use crate::types::{validate_registration, ApiResponse, RegisterUserRequest};
use crate::utils::{maintenance_gate, with_state};

async fn register_user(state: Arc<ServerState>, req: RegisterUserRequest) -> Result<impl Reply, Rejection> {
    state.settings().check_registration_open().await.map_err(reject)?;
    validate_registration(&req).map_err(|e| reject(LotteryError::InvalidInput(e)))?;
    let user = User::new(req.full_name.trim().to_string(), req.email.trim().to_lowercase());
    let user = state.store.insert_user(user).await.map_err(reject)?;
    tracing::info!("用户注册成功: {}", user.id);
    Ok(warp::reply::with_status(warp::reply::json(&ApiResponse::success(user)), StatusCode::CREATED))
}

async fn user_profile(state: Arc<ServerState>, user_id: String) -> Result<impl Reply, Rejection> {
    let user = state
        .store
        .find_user(&user_id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(LotteryError::UserNotFound(user_id.clone())))?;
    Ok(warp::reply::json(&ApiResponse::success(user)))
}

pub fn routes(state: Arc<ServerState>) -> warp::filters::BoxedFilter<(impl Reply,)> {
    let gate = maintenance_gate(Arc::clone(&state));

    let register_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "users")
            .and(warp::post())
            .and(warp::body::content_length_limit(16 * 1024))
            .and(warp::body::json())
            .and(with_state(state))
            .and_then(|req: RegisterUserRequest, state: Arc<ServerState>| async move { register_user(state, req).await })
            .boxed()
    };
    let profile_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "users" / String)
            .and(warp::get())
            .and(gate.clone())
            .and(with_state(state))
            .and_then(|user_id: String, state: Arc<ServerState>| async move { user_profile(state, user_id).await })
            .boxed()
    };

    register_route
        .or(profile_route)
        .boxed()
}
