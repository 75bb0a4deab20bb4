use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warp::http::HeaderMap;

use crate::core::models::{AnnouncementKind, UserStatus};

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
    pub fn error(err: String) -> Self {
        Self { success: false, data: None, error: Some(err) }
    }
}

// 参与相关类型
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipateRequest {
    pub user_id: String,
}

// 用户相关类型
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateUserStatusRequest {
    pub status: UserStatus,
}

// 管理相关类型
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLotteryRequest {
    pub ticket_price: u64,
    pub max_participants: u32,
    pub draw_date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: AnnouncementKind,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsResponse {
    pub total_users: usize,
    pub active_users: usize,
    pub banned_users: usize,
    pub total_lotteries: usize,
    pub active_lottery: bool,
    /// Σ 参与人数 × 票价
    pub total_revenue: u64,
}

pub fn header_admin_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

// 简单的用户字段校验
pub fn validate_registration(req: &RegisterUserRequest) -> Result<(), String> {
    if req.full_name.trim().is_empty() { return Err("fullName is required".to_string()); }
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') { return Err("a valid email is required".to_string()); }
    Ok(())
}
