//! 抽奖与用户数据模型
//!
//! 字段名保持 camelCase 序列化，与既有存储数据结构兼容。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 抽奖状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LotteryStatus {
    Active,
    Completed,
    Cancelled,
}

impl std::fmt::Display for LotteryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LotteryStatus::Active => "active",
            LotteryStatus::Completed => "completed",
            LotteryStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// 中奖记录（写入抽奖）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    pub user_id: String,
    pub amount: u64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Lottery {
    pub id: String,
    pub ticket_price: u64,
    pub max_participants: u32,
    /// 参与者按加入顺序排列，同一用户只出现一次
    pub participants: Vec<String>,
    pub status: LotteryStatus,
    pub draw_date: DateTime<Utc>,
    /// 开奖后才是权威值
    pub total_amount: u64,
    pub winners: Vec<WinnerRecord>,
    pub created_at: DateTime<Utc>,
}

impl Lottery {
    pub fn new(ticket_price: u64, max_participants: u32, draw_date: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ticket_price,
            max_participants,
            participants: Vec::new(),
            status: LotteryStatus::Active,
            draw_date,
            total_amount: 0,
            winners: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == LotteryStatus::Active
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.draw_date <= now
    }

    /// 到达开奖时间后不再接受参与，保证开奖时参与者集合稳定
    pub fn accepts_entries(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.draw_date > now
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants as usize
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Banned,
}

/// 参与记录（ticketNumber 为随机码，不保证全局唯一）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participation {
    pub lottery_id: String,
    pub ticket_number: String,
    pub date: DateTime<Utc>,
}

/// 用户中奖记录，只追加
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Winning {
    pub lottery_id: String,
    pub amount: u64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    pub status: UserStatus,
    #[serde(default)]
    pub participations: Vec<Participation>,
    #[serde(default)]
    pub winnings: Vec<Winning>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(full_name: String, email: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            full_name,
            email,
            is_admin: false,
            status: UserStatus::Active,
            participations: Vec::new(),
            winnings: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_winning_for(&self, lottery_id: &str) -> bool {
        self.winnings.iter().any(|w| w.lottery_id == lottery_id)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    #[default]
    Info,
    Warning,
    Success,
    Alert,
}

/// 平台公告
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: AnnouncementKind,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Announcement {
    pub fn new(title: String, content: String, kind: AnnouncementKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            content,
            kind,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
