//! 管理接口（需 X-Admin-Token）
//!
//! 用户管理、抽奖管理、手动开奖、付款流水、公告、设置、对账

use std::sync::Arc;
use chrono::Utc;
use serde::Serialize;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};
use tracing::info;

use crate::core::closer::{CloseOutcome, ClosedLottery};
use crate::core::ledger::payment_ledger;
use crate::core::models::{Announcement, Lottery, UserStatus};
use crate::core::reconcile::reconcile_winnings;
use crate::core::settings::SettingsUpdate;
use crate::core::store::{AnnouncementStore, AnnouncementUpdate, LotteryStore, LotteryUpdate, UserStore};
use crate::errors::{reject, LotteryError};
use crate::state::ServerState;
use crate::types::{
    AdminStatsResponse, ApiResponse, CreateAnnouncementRequest, CreateLotteryRequest, UpdateUserStatusRequest,
};
use crate::utils::{require_admin, with_state};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SelectWinnersResponse {
    message: String,
    #[serde(flatten)]
    closed: ClosedLottery,
}

async fn admin_stats(state: Arc<ServerState>) -> Result<impl Reply, Rejection> {
    let users = state.store.list_users().await.map_err(reject)?;
    let lotteries = state.store.list_lotteries().await.map_err(reject)?;
    let stats = AdminStatsResponse {
        total_users: users.len(),
        active_users: users.iter().filter(|u| u.status == UserStatus::Active).count(),
        banned_users: users.iter().filter(|u| u.status == UserStatus::Banned).count(),
        total_lotteries: lotteries.len(),
        active_lottery: lotteries.iter().any(|l| l.is_active()),
        total_revenue: lotteries
            .iter()
            .map(|l| (l.participants.len() as u64).saturating_mul(l.ticket_price))
            .fold(0u64, |acc, v| acc.saturating_add(v)),
    };
    Ok(warp::reply::json(&ApiResponse::success(stats)))
}

async fn list_users(state: Arc<ServerState>) -> Result<impl Reply, Rejection> {
    let users = state.store.list_users().await.map_err(reject)?;
    Ok(warp::reply::json(&ApiResponse::success(users)))
}

async fn update_user_status(state: Arc<ServerState>, user_id: String, req: UpdateUserStatusRequest) -> Result<impl Reply, Rejection> {
    let user = state.store.set_user_status(&user_id, req.status).await.map_err(reject)?;
    info!("用户状态更新: user={}, status={:?}", user_id, req.status);
    Ok(warp::reply::json(&ApiResponse::success(user)))
}

async fn delete_user(state: Arc<ServerState>, user_id: String) -> Result<impl Reply, Rejection> {
    state.store.delete_user(&user_id).await.map_err(reject)?;
    info!("用户已删除: {}", user_id);
    Ok(warp::reply::json(&ApiResponse::success(())))
}

async fn list_lotteries(state: Arc<ServerState>) -> Result<impl Reply, Rejection> {
    let lotteries = state.store.list_lotteries().await.map_err(reject)?;
    Ok(warp::reply::json(&ApiResponse::success(lotteries)))
}

async fn create_lottery(state: Arc<ServerState>, req: CreateLotteryRequest) -> Result<impl Reply, Rejection> {
    if req.max_participants == 0 {
        return Err(reject(LotteryError::InvalidInput("maxParticipants must be positive".into())));
    }
    state.settings().check_ticket_price(req.ticket_price).await.map_err(reject)?;
    if req.draw_date <= Utc::now() {
        tracing::warn!("新抽奖的开奖时间已过，将在下一轮调度时关闭: {}", req.draw_date);
    }
    let lottery = state
        .store
        .create_active(Lottery::new(req.ticket_price, req.max_participants, req.draw_date))
        .await
        .map_err(reject)?;
    info!("管理员创建抽奖: {}", lottery.id);
    Ok(warp::reply::with_status(warp::reply::json(&ApiResponse::success(lottery)), StatusCode::CREATED))
}

/// 只改票价、人数上限、开奖时间；状态与中奖记录只能经由开奖/取消变化
async fn update_lottery(state: Arc<ServerState>, lottery_id: String, update: LotteryUpdate) -> Result<impl Reply, Rejection> {
    if let Some(price) = update.ticket_price {
        state.settings().check_ticket_price(price).await.map_err(reject)?;
    }
    let lottery = state.store.update_lottery(&lottery_id, update).await.map_err(reject)?;
    info!("抽奖已更新: {}", lottery_id);
    Ok(warp::reply::json(&ApiResponse::success(lottery)))
}

async fn delete_lottery(state: Arc<ServerState>, lottery_id: String) -> Result<impl Reply, Rejection> {
    state.store.delete_lottery(&lottery_id).await.map_err(reject)?;
    info!("抽奖已删除: {}", lottery_id);
    Ok(warp::reply::json(&ApiResponse::success(())))
}

async fn cancel_lottery(state: Arc<ServerState>, lottery_id: String) -> Result<impl Reply, Rejection> {
    let lottery = state.store.cancel(&lottery_id).await.map_err(reject)?;
    info!("抽奖已取消: {}", lottery_id);
    Ok(warp::reply::json(&ApiResponse::success(lottery)))
}

/// 手动开奖，与定时任务共用同一关闭逻辑
async fn select_winners(state: Arc<ServerState>, lottery_id: String) -> Result<impl Reply, Rejection> {
    match state.closer.close(&lottery_id).await.map_err(reject)? {
        CloseOutcome::Closed(closed) => {
            let response = SelectWinnersResponse {
                message: format!("{} winner(s) selected", closed.winners.len()),
                closed,
            };
            Ok(warp::reply::json(&ApiResponse::success(response)))
        }
        CloseOutcome::NoOp(lottery) => Err(reject(LotteryError::NotActive(lottery.id))),
    }
}

async fn list_payments(state: Arc<ServerState>) -> Result<impl Reply, Rejection> {
    let payments = payment_ledger(state.store.as_ref()).await.map_err(reject)?;
    Ok(warp::reply::json(&ApiResponse::success(payments)))
}

async fn list_announcements(state: Arc<ServerState>) -> Result<impl Reply, Rejection> {
    let list = state.store.list_announcements().await.map_err(reject)?;
    Ok(warp::reply::json(&ApiResponse::success(list)))
}

async fn create_announcement(state: Arc<ServerState>, req: CreateAnnouncementRequest) -> Result<impl Reply, Rejection> {
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return Err(reject(LotteryError::InvalidInput("title and content are required".into())));
    }
    let announcement = state
        .store
        .insert_announcement(Announcement::new(req.title.trim().to_string(), req.content, req.kind))
        .await
        .map_err(reject)?;
    info!("公告已发布: {}", announcement.id);
    Ok(warp::reply::with_status(warp::reply::json(&ApiResponse::success(announcement)), StatusCode::CREATED))
}

async fn update_announcement(state: Arc<ServerState>, id: String, update: AnnouncementUpdate) -> Result<impl Reply, Rejection> {
    let announcement = state.store.update_announcement(&id, update).await.map_err(reject)?;
    Ok(warp::reply::json(&ApiResponse::success(announcement)))
}

async fn toggle_announcement(state: Arc<ServerState>, id: String) -> Result<impl Reply, Rejection> {
    let announcement = state.store.toggle_announcement(&id).await.map_err(reject)?;
    info!("公告状态切换: id={}, active={}", id, announcement.is_active);
    Ok(warp::reply::json(&ApiResponse::success(announcement)))
}

async fn delete_announcement(state: Arc<ServerState>, id: String) -> Result<impl Reply, Rejection> {
    state.store.delete_announcement(&id).await.map_err(reject)?;
    info!("公告已删除: {}", id);
    Ok(warp::reply::json(&ApiResponse::success(())))
}

async fn get_settings(state: Arc<ServerState>) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&ApiResponse::success(state.settings().get().await)))
}

async fn update_settings(state: Arc<ServerState>, update: SettingsUpdate) -> Result<impl Reply, Rejection> {
    let settings = state.settings().update(update).await.map_err(reject)?;
    Ok(warp::reply::json(&ApiResponse::success(settings)))
}

async fn reconcile(state: Arc<ServerState>) -> Result<impl Reply, Rejection> {
    let report = reconcile_winnings(state.store.as_ref()).await.map_err(reject)?;
    Ok(warp::reply::json(&ApiResponse::success(report)))
}

pub fn routes(state: Arc<ServerState>) -> warp::filters::BoxedFilter<(impl Reply,)> {
    let admin = require_admin(Arc::clone(&state));
    let body_limit = warp::body::content_length_limit(16 * 1024);

    let stats_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "stats")
            .and(warp::get())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|state: Arc<ServerState>| async move { admin_stats(state).await })
            .boxed()
    };

    // 用户管理
    let users_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "users")
            .and(warp::get())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|state: Arc<ServerState>| async move { list_users(state).await })
            .boxed()
    };
    let user_status_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "users" / String / "status")
            .and(warp::put())
            .and(admin.clone())
            .and(body_limit)
            .and(warp::body::json())
            .and(with_state(state))
            .and_then(|user_id: String, req: UpdateUserStatusRequest, state: Arc<ServerState>| async move {
                update_user_status(state, user_id, req).await
            })
            .boxed()
    };
    let user_delete_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "users" / String)
            .and(warp::delete())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|user_id: String, state: Arc<ServerState>| async move { delete_user(state, user_id).await })
            .boxed()
    };

    // 抽奖管理
    let lotteries_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "lotteries")
            .and(warp::get())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|state: Arc<ServerState>| async move { list_lotteries(state).await })
            .boxed()
    };
    let lottery_create_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "lotteries")
            .and(warp::post())
            .and(admin.clone())
            .and(body_limit)
            .and(warp::body::json())
            .and(with_state(state))
            .and_then(|req: CreateLotteryRequest, state: Arc<ServerState>| async move { create_lottery(state, req).await })
            .boxed()
    };
    let lottery_update_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "lotteries" / String)
            .and(warp::put())
            .and(admin.clone())
            .and(body_limit)
            .and(warp::body::json())
            .and(with_state(state))
            .and_then(|lottery_id: String, update: LotteryUpdate, state: Arc<ServerState>| async move {
                update_lottery(state, lottery_id, update).await
            })
            .boxed()
    };
    let lottery_delete_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "lotteries" / String)
            .and(warp::delete())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|lottery_id: String, state: Arc<ServerState>| async move { delete_lottery(state, lottery_id).await })
            .boxed()
    };
    let lottery_cancel_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "lotteries" / String / "cancel")
            .and(warp::post())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|lottery_id: String, state: Arc<ServerState>| async move { cancel_lottery(state, lottery_id).await })
            .boxed()
    };
    let select_winners_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "lotteries" / String / "select-winners")
            .and(warp::post())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|lottery_id: String, state: Arc<ServerState>| async move { select_winners(state, lottery_id).await })
            .boxed()
    };

    let payments_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "payments")
            .and(warp::get())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|state: Arc<ServerState>| async move { list_payments(state).await })
            .boxed()
    };

    // 公告
    let announcements_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "announcements")
            .and(warp::get())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|state: Arc<ServerState>| async move { list_announcements(state).await })
            .boxed()
    };
    let announcement_create_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "announcements")
            .and(warp::post())
            .and(admin.clone())
            .and(body_limit)
            .and(warp::body::json())
            .and(with_state(state))
            .and_then(|req: CreateAnnouncementRequest, state: Arc<ServerState>| async move {
                create_announcement(state, req).await
            })
            .boxed()
    };
    let announcement_update_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "announcements" / String)
            .and(warp::put())
            .and(admin.clone())
            .and(body_limit)
            .and(warp::body::json())
            .and(with_state(state))
            .and_then(|id: String, update: AnnouncementUpdate, state: Arc<ServerState>| async move {
                update_announcement(state, id, update).await
            })
            .boxed()
    };
    let announcement_toggle_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "announcements" / String / "toggle")
            .and(warp::put())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|id: String, state: Arc<ServerState>| async move { toggle_announcement(state, id).await })
            .boxed()
    };
    let announcement_delete_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "announcements" / String)
            .and(warp::delete())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|id: String, state: Arc<ServerState>| async move { delete_announcement(state, id).await })
            .boxed()
    };

    // 设置与对账
    let settings_get_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "settings")
            .and(warp::get())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|state: Arc<ServerState>| async move { get_settings(state).await })
            .boxed()
    };
    let settings_put_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "settings")
            .and(warp::put())
            .and(admin.clone())
            .and(body_limit)
            .and(warp::body::json())
            .and(with_state(state))
            .and_then(|update: SettingsUpdate, state: Arc<ServerState>| async move { update_settings(state, update).await })
            .boxed()
    };
    let reconcile_route = {
        let state = Arc::clone(&state);
        warp::path!("api" / "admin" / "reconcile")
            .and(warp::post())
            .and(admin.clone())
            .and(with_state(state))
            .and_then(|state: Arc<ServerState>| async move { reconcile(state).await })
            .boxed()
    };

    let user_group = users_route
        .or(user_status_route)
        .or(user_delete_route)
        .boxed();
    let lottery_group = lotteries_route
        .or(lottery_create_route)
        .or(lottery_update_route)
        .or(lottery_delete_route)
        .or(lottery_cancel_route)
        .or(select_winners_route)
        .boxed();

    let announcement_group = announcements_route
        .or(announcement_create_route)
        .or(announcement_update_route)
        .or(announcement_toggle_route)
        .or(announcement_delete_route)
        .boxed();

    stats_route
        .or(user_group)
        .or(lottery_group)
        .or(payments_route)
        .or(announcement_group)
        .or(settings_get_route)
        .or(settings_put_route)
        .or(reconcile_route)
        .boxed()
}
