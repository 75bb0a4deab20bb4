//! 抽奖与用户存储
//!
//! - `LotteryStore` / `UserStore` / `AnnouncementStore` 为存储接口
//! - 跨记录操作（创建当前抽奖、参与、开奖入账）都是单次原子操作
//! - `MemoryStore` 将所有记录放在同一把锁下，可选 JSON 快照落盘

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::core::models::{
    Announcement, AnnouncementKind, Lottery, LotteryStatus, Participation, User, UserStatus, WinnerRecord, Winning,
};
use crate::errors::LotteryError;

/// 开奖结果（待写入）
#[derive(Debug, Clone)]
pub struct CompletedDraw {
    pub total_amount: u64,
    pub winners: Vec<WinnerRecord>,
}

/// 条件开奖写入的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommit {
    /// 已完成；`uncredited` 为找不到用户记录、未能入账的中奖者
    Completed { lottery: Lottery, uncredited: Vec<String> },
    /// 抽奖已不是 active（被其他调用方抢先关闭或取消）
    NotActive(LotteryStatus),
    /// 读取快照后又有人加入，需重新抽取
    ParticipantsChanged,
}

/// 管理员修改抽奖，只允许改参数，不涉及状态和中奖记录
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryUpdate {
    pub ticket_price: Option<u64>,
    pub max_participants: Option<u32>,
    pub draw_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<AnnouncementKind>,
}

pub trait LotteryStore: Send + Sync + 'static {
    fn find_active(&self) -> impl Future<Output = Result<Option<Lottery>, LotteryError>> + Send;

    fn find_by_id(&self, id: &str) -> impl Future<Output = Result<Option<Lottery>, LotteryError>> + Send;

    /// status=active 且 drawDate <= now
    fn find_expired_active(&self, now: DateTime<Utc>) -> impl Future<Output = Result<Vec<Lottery>, LotteryError>> + Send;

    /// 按创建时间倒序
    fn list_lotteries(&self) -> impl Future<Output = Result<Vec<Lottery>, LotteryError>> + Send;

    fn save(&self, lottery: Lottery) -> impl Future<Output = Result<(), LotteryError>> + Send;

    /// 仅当不存在 active 抽奖时插入
    fn create_active(&self, lottery: Lottery) -> impl Future<Output = Result<Lottery, LotteryError>> + Send;

    /// 返回当前 active 抽奖，没有则原子地以 `template` 创建
    fn active_or_create(&self, template: Lottery) -> impl Future<Output = Result<Lottery, LotteryError>> + Send;

    /// 原子加入：追加参与者、累加 totalAmount、写用户参与记录
    fn add_participant(
        &self,
        lottery_id: &str,
        user_id: &str,
        participation: Participation,
    ) -> impl Future<Output = Result<Lottery, LotteryError>> + Send;

    /// 条件开奖：仍为 active 且参与人数等于 `expected_participants` 时，
    /// 先写抽奖记录，再给每个中奖者追加 winnings，整体在同一临界区内完成
    fn complete_draw(
        &self,
        lottery_id: &str,
        expected_participants: usize,
        draw: CompletedDraw,
    ) -> impl Future<Output = Result<DrawCommit, LotteryError>> + Send;

    /// 仅 active 抽奖可修改；已有参与者时票价不可变，人数上限不得低于当前人数
    fn update_lottery(
        &self,
        lottery_id: &str,
        update: LotteryUpdate,
    ) -> impl Future<Output = Result<Lottery, LotteryError>> + Send;

    /// active -> cancelled
    fn cancel(&self, lottery_id: &str) -> impl Future<Output = Result<Lottery, LotteryError>> + Send;

    fn delete_lottery(&self, lottery_id: &str) -> impl Future<Output = Result<(), LotteryError>> + Send;
}

pub trait UserStore: Send + Sync + 'static {
    fn find_user(&self, id: &str) -> impl Future<Output = Result<Option<User>, LotteryError>> + Send;

    fn insert_user(&self, user: User) -> impl Future<Output = Result<User, LotteryError>> + Send;

    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, LotteryError>> + Send;

    fn set_user_status(&self, id: &str, status: UserStatus) -> impl Future<Output = Result<User, LotteryError>> + Send;

    fn delete_user(&self, id: &str) -> impl Future<Output = Result<(), LotteryError>> + Send;

    /// 只追加，不去重
    fn append_winnings(&self, user_id: &str, winning: Winning) -> impl Future<Output = Result<(), LotteryError>> + Send;

    /// 用户还没有该抽奖的中奖记录时才追加，判断与写入在同一原子操作内；返回是否写入
    fn append_winning_if_missing(
        &self,
        user_id: &str,
        winning: Winning,
    ) -> impl Future<Output = Result<bool, LotteryError>> + Send;
}

pub trait AnnouncementStore: Send + Sync + 'static {
    /// 按创建时间倒序
    fn list_announcements(&self) -> impl Future<Output = Result<Vec<Announcement>, LotteryError>> + Send;

    fn insert_announcement(&self, announcement: Announcement) -> impl Future<Output = Result<Announcement, LotteryError>> + Send;

    fn update_announcement(
        &self,
        id: &str,
        update: AnnouncementUpdate,
    ) -> impl Future<Output = Result<Announcement, LotteryError>> + Send;

    /// 切换 isActive
    fn toggle_announcement(&self, id: &str) -> impl Future<Output = Result<Announcement, LotteryError>> + Send;

    fn delete_announcement(&self, id: &str) -> impl Future<Output = Result<(), LotteryError>> + Send;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    lotteries: HashMap<String, Lottery>,
    users: HashMap<String, User>,
    #[serde(default)]
    announcements: HashMap<String, Announcement>,
}

/// 内存存储，可选快照文件
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Snapshot>>,
    data_file: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从快照文件加载；文件不存在时从空数据开始
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, LotteryError> {
        let path = path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes)
                .map_err(|e| LotteryError::Storage(format!("快照解析失败 {}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("快照文件不存在，使用空存储: {}", path.display());
                Snapshot::default()
            }
            Err(e) => return Err(LotteryError::Storage(format!("读取快照失败 {}: {}", path.display(), e))),
        };
        info!(
            "存储已加载: lotteries={}, users={}",
            snapshot.lotteries.len(),
            snapshot.users.len()
        );
        Ok(Self { inner: Arc::new(RwLock::new(snapshot)), data_file: Some(path) })
    }

    /// 在写锁内执行修改；配置了快照文件时先落盘成功再替换内存状态
    async fn mutate<T, F>(&self, f: F) -> Result<T, LotteryError>
    where
        F: FnOnce(&mut Snapshot) -> Result<T, LotteryError> + Send,
        T: Send,
    {
        let mut guard = self.inner.write().await;
        match &self.data_file {
            None => f(&mut *guard),
            Some(path) => {
                let mut next = guard.clone();
                let out = f(&mut next)?;
                write_snapshot(path, &next).await?;
                *guard = next;
                Ok(out)
            }
        }
    }
}

async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), LotteryError> {
    let bytes = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| LotteryError::Storage(format!("快照序列化失败: {}", e)))?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| LotteryError::Storage(format!("写入快照失败 {}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| LotteryError::Storage(format!("替换快照失败 {}: {}", path.display(), e)))
}

fn active_of(s: &Snapshot) -> Option<&Lottery> {
    s.lotteries.values().find(|l| l.is_active())
}

impl LotteryStore for MemoryStore {
    async fn find_active(&self) -> Result<Option<Lottery>, LotteryError> {
        Ok(active_of(&*self.inner.read().await).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Lottery>, LotteryError> {
        Ok(self.inner.read().await.lotteries.get(id).cloned())
    }

    async fn find_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Lottery>, LotteryError> {
        let g = self.inner.read().await;
        let mut list: Vec<Lottery> = g.lotteries.values().filter(|l| l.is_due(now)).cloned().collect();
        list.sort_by_key(|l| l.draw_date);
        Ok(list)
    }

    async fn list_lotteries(&self) -> Result<Vec<Lottery>, LotteryError> {
        let g = self.inner.read().await;
        let mut list: Vec<Lottery> = g.lotteries.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn save(&self, lottery: Lottery) -> Result<(), LotteryError> {
        self.mutate(move |s| {
            s.lotteries.insert(lottery.id.clone(), lottery);
            Ok(())
        })
        .await
    }

    async fn create_active(&self, lottery: Lottery) -> Result<Lottery, LotteryError> {
        self.mutate(move |s| {
            if let Some(existing) = active_of(s) {
                return Err(LotteryError::ActiveLotteryExists(existing.id.clone()));
            }
            s.lotteries.insert(lottery.id.clone(), lottery.clone());
            Ok(lottery)
        })
        .await
    }

    async fn active_or_create(&self, template: Lottery) -> Result<Lottery, LotteryError> {
        self.mutate(move |s| {
            if let Some(existing) = active_of(s) {
                return Ok(existing.clone());
            }
            info!("创建新的抽奖: {}", template.id);
            s.lotteries.insert(template.id.clone(), template.clone());
            Ok(template)
        })
        .await
    }

    async fn add_participant(
        &self,
        lottery_id: &str,
        user_id: &str,
        participation: Participation,
    ) -> Result<Lottery, LotteryError> {
        self.mutate(move |s| {
            if !s.users.contains_key(user_id) {
                return Err(LotteryError::UserNotFound(user_id.to_string()));
            }
            let lottery = s
                .lotteries
                .get_mut(lottery_id)
                .ok_or_else(|| LotteryError::NotFound(lottery_id.to_string()))?;
            if !lottery.is_active() {
                return Err(LotteryError::NotActive(lottery_id.to_string()));
            }
            if !lottery.accepts_entries(Utc::now()) {
                return Err(LotteryError::EntriesClosed(lottery_id.to_string()));
            }
            if lottery.has_participant(user_id) {
                return Err(LotteryError::AlreadyParticipated);
            }
            if lottery.is_full() {
                return Err(LotteryError::LotteryFull);
            }
            lottery.participants.push(user_id.to_string());
            lottery.total_amount = lottery.total_amount.saturating_add(lottery.ticket_price);
            let updated = lottery.clone();
            if let Some(user) = s.users.get_mut(user_id) {
                user.participations.push(participation);
            }
            Ok(updated)
        })
        .await
    }

    async fn complete_draw(
        &self,
        lottery_id: &str,
        expected_participants: usize,
        draw: CompletedDraw,
    ) -> Result<DrawCommit, LotteryError> {
        self.mutate(move |s| {
            let lottery = s
                .lotteries
                .get_mut(lottery_id)
                .ok_or_else(|| LotteryError::NotFound(lottery_id.to_string()))?;
            if !lottery.is_active() {
                return Ok(DrawCommit::NotActive(lottery.status));
            }
            if lottery.participants.len() != expected_participants {
                return Ok(DrawCommit::ParticipantsChanged);
            }
            lottery.status = LotteryStatus::Completed;
            lottery.total_amount = draw.total_amount;
            lottery.winners = draw.winners;
            let closed = lottery.clone();

            let mut uncredited = Vec::new();
            for w in &closed.winners {
                match s.users.get_mut(&w.user_id) {
                    Some(user) => user.winnings.push(Winning {
                        lottery_id: closed.id.clone(),
                        amount: w.amount,
                        date: w.date,
                    }),
                    None => {
                        warn!("中奖用户不存在，跳过入账: lottery={}, user={}", closed.id, w.user_id);
                        uncredited.push(w.user_id.clone());
                    }
                }
            }
            Ok(DrawCommit::Completed { lottery: closed, uncredited })
        })
        .await
    }

    async fn update_lottery(&self, lottery_id: &str, update: LotteryUpdate) -> Result<Lottery, LotteryError> {
        self.mutate(move |s| {
            let lottery = s
                .lotteries
                .get_mut(lottery_id)
                .ok_or_else(|| LotteryError::NotFound(lottery_id.to_string()))?;
            if !lottery.is_active() {
                return Err(LotteryError::NotActive(lottery_id.to_string()));
            }
            if let Some(price) = update.ticket_price {
                if price != lottery.ticket_price && !lottery.participants.is_empty() {
                    return Err(LotteryError::InvalidInput(
                        "ticket price cannot change once participants have joined".into(),
                    ));
                }
            }
            if let Some(max) = update.max_participants {
                if max == 0 || (max as usize) < lottery.participants.len() {
                    return Err(LotteryError::InvalidInput(
                        "maxParticipants cannot be below the current participant count".into(),
                    ));
                }
            }
            if let Some(price) = update.ticket_price { lottery.ticket_price = price; }
            if let Some(max) = update.max_participants { lottery.max_participants = max; }
            if let Some(date) = update.draw_date { lottery.draw_date = date; }
            Ok(lottery.clone())
        })
        .await
    }

    async fn cancel(&self, lottery_id: &str) -> Result<Lottery, LotteryError> {
        self.mutate(move |s| {
            let lottery = s
                .lotteries
                .get_mut(lottery_id)
                .ok_or_else(|| LotteryError::NotFound(lottery_id.to_string()))?;
            if !lottery.is_active() {
                return Err(LotteryError::NotActive(lottery_id.to_string()));
            }
            lottery.status = LotteryStatus::Cancelled;
            Ok(lottery.clone())
        })
        .await
    }

    async fn delete_lottery(&self, lottery_id: &str) -> Result<(), LotteryError> {
        self.mutate(move |s| {
            let lottery = s
                .lotteries
                .get(lottery_id)
                .ok_or_else(|| LotteryError::NotFound(lottery_id.to_string()))?;
            if !lottery.participants.is_empty() {
                return Err(LotteryError::InvalidInput("cannot delete a lottery with participants".into()));
            }
            s.lotteries.remove(lottery_id);
            Ok(())
        })
        .await
    }
}

impl UserStore for MemoryStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>, LotteryError> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<User, LotteryError> {
        self.mutate(move |s| {
            if s.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
                return Err(LotteryError::InvalidInput("email already registered".into()));
            }
            s.users.insert(user.id.clone(), user.clone());
            Ok(user)
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<User>, LotteryError> {
        let g = self.inner.read().await;
        let mut list: Vec<User> = g.users.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn set_user_status(&self, id: &str, status: UserStatus) -> Result<User, LotteryError> {
        self.mutate(move |s| {
            let user = s.users.get_mut(id).ok_or_else(|| LotteryError::UserNotFound(id.to_string()))?;
            user.status = status;
            Ok(user.clone())
        })
        .await
    }

    async fn delete_user(&self, id: &str) -> Result<(), LotteryError> {
        self.mutate(move |s| {
            let user = s.users.get(id).ok_or_else(|| LotteryError::UserNotFound(id.to_string()))?;
            if user.is_admin {
                return Err(LotteryError::InvalidInput("admin users cannot be deleted".into()));
            }
            s.users.remove(id);
            Ok(())
        })
        .await
    }

    async fn append_winnings(&self, user_id: &str, winning: Winning) -> Result<(), LotteryError> {
        self.mutate(move |s| {
            let user = s
                .users
                .get_mut(user_id)
                .ok_or_else(|| LotteryError::UserNotFound(user_id.to_string()))?;
            user.winnings.push(winning);
            Ok(())
        })
        .await
    }

    async fn append_winning_if_missing(&self, user_id: &str, winning: Winning) -> Result<bool, LotteryError> {
        self.mutate(move |s| {
            let user = s
                .users
                .get_mut(user_id)
                .ok_or_else(|| LotteryError::UserNotFound(user_id.to_string()))?;
            if user.has_winning_for(&winning.lottery_id) {
                return Ok(false);
            }
            user.winnings.push(winning);
            Ok(true)
        })
        .await
    }
}

impl AnnouncementStore for MemoryStore {
    async fn list_announcements(&self) -> Result<Vec<Announcement>, LotteryError> {
        let g = self.inner.read().await;
        let mut list: Vec<Announcement> = g.announcements.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn insert_announcement(&self, announcement: Announcement) -> Result<Announcement, LotteryError> {
        self.mutate(move |s| {
            s.announcements.insert(announcement.id.clone(), announcement.clone());
            Ok(announcement)
        })
        .await
    }

    async fn update_announcement(&self, id: &str, update: AnnouncementUpdate) -> Result<Announcement, LotteryError> {
        self.mutate(move |s| {
            let a = s
                .announcements
                .get_mut(id)
                .ok_or_else(|| LotteryError::AnnouncementNotFound(id.to_string()))?;
            if let Some(v) = update.title { a.title = v; }
            if let Some(v) = update.content { a.content = v; }
            if let Some(v) = update.kind { a.kind = v; }
            Ok(a.clone())
        })
        .await
    }

    async fn toggle_announcement(&self, id: &str) -> Result<Announcement, LotteryError> {
        self.mutate(move |s| {
            let a = s
                .announcements
                .get_mut(id)
                .ok_or_else(|| LotteryError::AnnouncementNotFound(id.to_string()))?;
            a.is_active = !a.is_active;
            Ok(a.clone())
        })
        .await
    }

    async fn delete_announcement(&self, id: &str) -> Result<(), LotteryError> {
        self.mutate(move |s| {
            s.announcements
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| LotteryError::AnnouncementNotFound(id.to_string()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn participation(lottery_id: &str) -> Participation {
        Participation { lottery_id: lottery_id.to_string(), ticket_number: "ABCD1234".into(), date: Utc::now() }
    }

    #[tokio::test]
    async fn test_create_active_rejects_second_active() {
        let store = MemoryStore::new();
        let first = store.create_active(Lottery::new(100, 10, Utc::now())).await.unwrap();
        let err = store.create_active(Lottery::new(100, 10, Utc::now())).await.unwrap_err();
        assert_eq!(err, LotteryError::ActiveLotteryExists(first.id));
    }

    #[tokio::test]
    async fn test_concurrent_active_or_create_yields_single_lottery() {
        let store = MemoryStore::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.active_or_create(Lottery::new(100, 10, Utc::now())).await.unwrap().id
            }));
        }
        let ids: Vec<String> = futures::future::join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();
        assert!(ids.iter().all(|id| id == &ids[0]));
        assert_eq!(store.list_lotteries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_participant_rules() {
        let store = MemoryStore::new();
        let u1 = store.insert_user(User::new("A".into(), "a@x.io".into())).await.unwrap();
        let u2 = store.insert_user(User::new("B".into(), "b@x.io".into())).await.unwrap();
        let lottery = store.create_active(Lottery::new(100, 1, Utc::now() + Duration::hours(1))).await.unwrap();

        let updated = store.add_participant(&lottery.id, &u1.id, participation(&lottery.id)).await.unwrap();
        assert_eq!(updated.participants, vec![u1.id.clone()]);
        assert_eq!(updated.total_amount, 100);

        let dup = store.add_participant(&lottery.id, &u1.id, participation(&lottery.id)).await;
        assert_eq!(dup.unwrap_err(), LotteryError::AlreadyParticipated);
        let full = store.add_participant(&lottery.id, &u2.id, participation(&lottery.id)).await;
        assert_eq!(full.unwrap_err(), LotteryError::LotteryFull);

        let user = store.find_user(&u1.id).await.unwrap().unwrap();
        assert_eq!(user.participations.len(), 1);
    }

    #[tokio::test]
    async fn test_complete_draw_is_conditional() {
        let store = MemoryStore::new();
        let u = store.insert_user(User::new("A".into(), "a@x.io".into())).await.unwrap();
        let lottery = store.create_active(Lottery::new(100, 10, Utc::now() + Duration::hours(1))).await.unwrap();
        store.add_participant(&lottery.id, &u.id, participation(&lottery.id)).await.unwrap();

        let draw = CompletedDraw {
            total_amount: 100,
            winners: vec![WinnerRecord { user_id: u.id.clone(), amount: 100, date: Utc::now() }],
        };
        let stale = store.complete_draw(&lottery.id, 0, draw.clone()).await.unwrap();
        assert_eq!(stale, DrawCommit::ParticipantsChanged);

        let done = store.complete_draw(&lottery.id, 1, draw.clone()).await.unwrap();
        assert!(matches!(done, DrawCommit::Completed { ref uncredited, .. } if uncredited.is_empty()));
        let again = store.complete_draw(&lottery.id, 1, draw).await.unwrap();
        assert_eq!(again, DrawCommit::NotActive(LotteryStatus::Completed));

        let user = store.find_user(&u.id).await.unwrap().unwrap();
        assert_eq!(user.winnings.len(), 1);
    }

    #[tokio::test]
    async fn test_entries_rejected_after_draw_date() {
        let store = MemoryStore::new();
        let u = store.insert_user(User::new("A".into(), "a@x.io".into())).await.unwrap();
        let lottery = store.create_active(Lottery::new(100, 10, Utc::now() - Duration::seconds(1))).await.unwrap();
        let err = store.add_participant(&lottery.id, &u.id, participation(&lottery.id)).await.unwrap_err();
        assert_eq!(err, LotteryError::EntriesClosed(lottery.id.clone()));
        let stored = store.find_by_id(&lottery.id).await.unwrap().unwrap();
        assert!(stored.participants.is_empty());
        assert!(store.find_user(&u.id).await.unwrap().unwrap().participations.is_empty());
    }

    #[tokio::test]
    async fn test_update_lottery_rules() {
        let store = MemoryStore::new();
        let u = store.insert_user(User::new("A".into(), "a@x.io".into())).await.unwrap();
        let lottery = store.create_active(Lottery::new(100, 10, Utc::now() + Duration::hours(1))).await.unwrap();

        let new_date = Utc::now() + Duration::hours(5);
        let updated = store
            .update_lottery(&lottery.id, LotteryUpdate { ticket_price: Some(50), draw_date: Some(new_date), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.ticket_price, 50);
        assert_eq!(updated.draw_date, new_date);
        assert_eq!(updated.status, LotteryStatus::Active);

        store.add_participant(&lottery.id, &u.id, participation(&lottery.id)).await.unwrap();
        let price = store
            .update_lottery(&lottery.id, LotteryUpdate { ticket_price: Some(70), ..Default::default() })
            .await;
        assert!(matches!(price, Err(LotteryError::InvalidInput(_))));
        let shrink = store
            .update_lottery(&lottery.id, LotteryUpdate { max_participants: Some(0), ..Default::default() })
            .await;
        assert!(matches!(shrink, Err(LotteryError::InvalidInput(_))));

        store.cancel(&lottery.id).await.unwrap();
        let closed = store
            .update_lottery(&lottery.id, LotteryUpdate { max_participants: Some(20), ..Default::default() })
            .await;
        assert_eq!(closed.unwrap_err(), LotteryError::NotActive(lottery.id.clone()));
    }

    #[tokio::test]
    async fn test_append_winning_if_missing_only_once() {
        let store = MemoryStore::new();
        let u = store.insert_user(User::new("A".into(), "a@x.io".into())).await.unwrap();
        let winning = Winning { lottery_id: "L1".into(), amount: 10, date: Utc::now() };
        assert!(store.append_winning_if_missing(&u.id, winning.clone()).await.unwrap());
        assert!(!store.append_winning_if_missing(&u.id, winning.clone()).await.unwrap());
        assert_eq!(store.find_user(&u.id).await.unwrap().unwrap().winnings.len(), 1);
        let missing = store.append_winning_if_missing("nobody", winning).await.unwrap_err();
        assert_eq!(missing, LotteryError::UserNotFound("nobody".into()));
    }

    #[tokio::test]
    async fn test_announcement_lifecycle() {
        let store = MemoryStore::new();
        let a = store
            .insert_announcement(Announcement::new("Bakım".into(), "Gece 2'de".into(), AnnouncementKind::Info))
            .await
            .unwrap();
        let updated = store
            .update_announcement(&a.id, AnnouncementUpdate { kind: Some(AnnouncementKind::Alert), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.kind, AnnouncementKind::Alert);
        assert_eq!(updated.title, "Bakım");
        assert!(!store.toggle_announcement(&a.id).await.unwrap().is_active);
        store.delete_announcement(&a.id).await.unwrap();
        assert!(store.list_announcements().await.unwrap().is_empty());
        assert_eq!(
            store.toggle_announcement(&a.id).await.unwrap_err(),
            LotteryError::AnnouncementNotFound(a.id.clone())
        );
    }

    #[tokio::test]
    async fn test_find_expired_active() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let past = Lottery::new(100, 10, now - Duration::hours(1));
        let future = Lottery::new(100, 10, now + Duration::hours(1));
        store.save(past.clone()).await.unwrap();
        store.save(future).await.unwrap();
        let expired = store.find_expired_active(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, past.id);
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_through_file() {
        let path = std::env::temp_dir().join(format!("lottery-store-{}.json", uuid::Uuid::new_v4()));
        {
            let store = MemoryStore::open(&path).await.unwrap();
            store.insert_user(User::new("A".into(), "a@x.io".into())).await.unwrap();
            store.create_active(Lottery::new(100, 10, Utc::now())).await.unwrap();
        }
        let reopened = MemoryStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_users().await.unwrap().len(), 1);
        assert!(reopened.find_active().await.unwrap().is_some());
        let _ = tokio::fs::remove_file(&path).await;
    }
}
