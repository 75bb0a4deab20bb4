//! 路由模块

use std::sync::Arc;
use warp::{Filter, Reply};

use crate::errors::handle_rejection;
use crate::state::ServerState;

pub mod health;
pub mod lottery;
pub mod users;
pub mod admin;

/// 组装全部路由；管理接口在前，避免维护模式拦截管理员请求
pub fn create_routes(state: Arc<ServerState>) -> warp::filters::BoxedFilter<(impl Reply,)> {
    let app = health::routes(Arc::clone(&state))
        .or(admin::routes(Arc::clone(&state)))
        .or(lottery::routes(Arc::clone(&state)))
        .or(users::routes(state))
        .boxed();

    app.recover(handle_rejection)
        .with(warp::cors().allow_any_origin().allow_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"]).allow_headers(vec!["content-type", "x-admin-token"]))
        .boxed()
}
