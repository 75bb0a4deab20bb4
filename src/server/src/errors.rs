use std::convert::Infallible;
use serde::Serialize;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};
use tracing::{error, warn};

use crate::types::ApiResponse;

/// 业务与存储错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LotteryError {
    #[error("Lottery not found: {0}")]
    NotFound(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("An active lottery already exists: {0}")]
    ActiveLotteryExists(String),
    #[error("User already participates in this lottery")]
    AlreadyParticipated,
    #[error("Lottery has reached its participant limit")]
    LotteryFull,
    #[error("Lottery is not active: {0}")]
    NotActive(String),
    #[error("Lottery is past its draw date and no longer accepts entries: {0}")]
    EntriesClosed(String),
    #[error("User is banned")]
    UserBanned,
    #[error("Registration is currently disabled")]
    RegistrationDisabled,
    #[error("Announcement not found: {0}")]
    AnnouncementNotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LotteryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LotteryError::NotFound(_)
            | LotteryError::UserNotFound(_)
            | LotteryError::AnnouncementNotFound(_) => StatusCode::NOT_FOUND,
            LotteryError::ActiveLotteryExists(_)
            | LotteryError::NotActive(_)
            | LotteryError::EntriesClosed(_) => StatusCode::CONFLICT,
            LotteryError::AlreadyParticipated
            | LotteryError::LotteryFull
            | LotteryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LotteryError::UserBanned | LotteryError::RegistrationDisabled => StatusCode::FORBIDDEN,
            LotteryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub enum ServerError {
    Lottery(LotteryError),
    Unauthorized,
    Maintenance(String),
}

impl Reject for ServerError {}

/// 把业务错误转为 warp 拒绝
pub fn reject(e: LotteryError) -> Rejection {
    warp::reject::custom(ServerError::Lottery(e))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MaintenanceResponse {
    success: bool,
    error: String,
    maintenance_mode: bool,
    maintenance_message: String,
}

pub async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    if let Some(ServerError::Maintenance(message)) = err.find::<ServerError>() {
        let body = MaintenanceResponse {
            success: false,
            error: "Service under maintenance".to_string(),
            maintenance_mode: true,
            maintenance_message: message.clone(),
        };
        return Ok(warp::reply::with_status(warp::reply::json(&body), StatusCode::SERVICE_UNAVAILABLE).into_response());
    }

    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(server_err) = err.find::<ServerError>() {
        match server_err {
            ServerError::Lottery(e) => {
                if let LotteryError::Storage(_) = e {
                    error!("存储错误: {}", e);
                } else {
                    warn!("请求失败: {}", e);
                }
                (e.status_code(), e.to_string())
            }
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ServerError::Maintenance(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
        }
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid body: {}", e))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::BAD_REQUEST, "Payload too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else if err.find::<warp::reject::MissingHeader>().is_some() {
        (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
    } else {
        error!("未处理的错误: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    };
    let response = ApiResponse::<()>::error(message);
    Ok(warp::reply::with_status(warp::reply::json(&response), code).into_response())
}
