//! 用户参与抽奖
//!
//! - 没有 active 抽奖时按默认参数原子创建
//! - 生成 8 位票号（0-9A-Z）
//! - 当前抽奖统计、最近中奖者查询

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::models::{Lottery, LotteryStatus, Participation, UserStatus};
use crate::core::store::{LotteryStore, UserStore};
use crate::errors::LotteryError;

const TICKET_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const TICKET_LEN: usize = 8;
/// 最近中奖者取最近几期已完成抽奖
const RECENT_LOTTERIES: usize = 5;

/// 自动创建抽奖时使用的参数
#[derive(Debug, Clone)]
pub struct LotteryDefaults {
    pub ticket_price: u64,
    pub max_participants: u32,
    pub duration: Duration,
}

impl Default for LotteryDefaults {
    fn default() -> Self {
        Self { ticket_price: 100, max_participants: 10_000, duration: Duration::hours(24) }
    }
}

impl LotteryDefaults {
    pub fn template(&self, now: DateTime<Utc>) -> Lottery {
        Lottery::new(self.ticket_price, self.max_participants, now + self.duration)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub lottery_id: String,
    pub ticket_number: String,
    pub draw_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LotteryStats {
    pub participants: usize,
    pub total_amount: u64,
    pub ticket_price: u64,
    pub draw_date: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecentWinner {
    pub lottery_id: String,
    pub user_id: String,
    pub user_name: String,
    pub amount: u64,
    pub date: DateTime<Utc>,
}

pub fn generate_ticket_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..TICKET_LEN)
        .map(|_| TICKET_CHARSET[rng.gen_range(0..TICKET_CHARSET.len())] as char)
        .collect()
}

pub struct ParticipationService<S> {
    store: Arc<S>,
    defaults: LotteryDefaults,
}

impl<S: LotteryStore + UserStore> ParticipationService<S> {
    pub fn new(store: Arc<S>, defaults: LotteryDefaults) -> Self {
        Self { store, defaults }
    }

    pub async fn participate(&self, user_id: &str) -> Result<Ticket, LotteryError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| LotteryError::UserNotFound(user_id.to_string()))?;
        if user.status == UserStatus::Banned {
            return Err(LotteryError::UserBanned);
        }

        // 取到的抽奖可能在加入前被关闭，此时换到新的当前抽奖再试一次
        let mut last_err = None;
        for _ in 0..2 {
            let lottery = self.store.active_or_create(self.defaults.template(Utc::now())).await?;
            let ticket_number = generate_ticket_number(&mut rand::thread_rng());
            let participation = Participation {
                lottery_id: lottery.id.clone(),
                ticket_number: ticket_number.clone(),
                date: Utc::now(),
            };
            match self.store.add_participant(&lottery.id, user_id, participation).await {
                Ok(updated) => {
                    info!("用户参与成功: user={}, lottery={}, ticket={}", user_id, updated.id, ticket_number);
                    return Ok(Ticket { lottery_id: updated.id, ticket_number, draw_date: updated.draw_date });
                }
                Err(LotteryError::NotActive(id)) => {
                    warn!("抽奖在参与前已关闭，重试: lottery={}", id);
                    last_err = Some(LotteryError::NotActive(id));
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| LotteryError::Storage("participation retry exhausted".into())))
    }

    /// 当前抽奖统计；没有 active 抽奖时返回默认值
    pub async fn current_stats(&self) -> Result<LotteryStats, LotteryError> {
        let stats = match self.store.find_active().await? {
            Some(l) => LotteryStats {
                participants: l.participants.len(),
                total_amount: l.total_amount,
                ticket_price: l.ticket_price,
                draw_date: l.draw_date,
                active: true,
            },
            None => LotteryStats {
                participants: 0,
                total_amount: 0,
                ticket_price: self.defaults.ticket_price,
                draw_date: Utc::now() + self.defaults.duration,
                active: false,
            },
        };
        Ok(stats)
    }

    pub async fn recent_winners(&self) -> Result<Vec<RecentWinner>, LotteryError> {
        let completed: Vec<Lottery> = self
            .store
            .list_lotteries()
            .await?
            .into_iter()
            .filter(|l| l.status == LotteryStatus::Completed)
            .take(RECENT_LOTTERIES)
            .collect();

        let mut out = Vec::new();
        for lottery in &completed {
            for w in &lottery.winners {
                let user_name = match self.store.find_user(&w.user_id).await? {
                    Some(u) => u.full_name,
                    None => "Unknown user".to_string(),
                };
                out.push(RecentWinner {
                    lottery_id: lottery.id.clone(),
                    user_id: w.user_id.clone(),
                    user_name,
                    amount: w.amount,
                    date: w.date,
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::User;
    use crate::core::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn service() -> (Arc<MemoryStore>, ParticipationService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Arc::clone(&store), ParticipationService::new(store, LotteryDefaults::default()))
    }

    #[test]
    fn test_ticket_number_format() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let t = generate_ticket_number(&mut rng);
            assert_eq!(t.len(), 8);
            assert!(t.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[tokio::test]
    async fn test_first_participation_creates_lottery() {
        let (store, svc) = service();
        let u = store.insert_user(User::new("A".into(), "a@x.io".into())).await.unwrap();
        assert!(store.find_active().await.unwrap().is_none());

        let ticket = svc.participate(&u.id).await.unwrap();
        let active = store.find_active().await.unwrap().unwrap();
        assert_eq!(active.id, ticket.lottery_id);
        assert_eq!(active.participants, vec![u.id.clone()]);
        assert_eq!(active.total_amount, 100);

        let user = store.find_user(&u.id).await.unwrap().unwrap();
        assert_eq!(user.participations[0].ticket_number, ticket.ticket_number);

        let err = svc.participate(&u.id).await.unwrap_err();
        assert_eq!(err, LotteryError::AlreadyParticipated);
    }

    #[tokio::test]
    async fn test_banned_and_unknown_users_rejected() {
        let (store, svc) = service();
        let u = store.insert_user(User::new("A".into(), "a@x.io".into())).await.unwrap();
        store.set_user_status(&u.id, UserStatus::Banned).await.unwrap();
        assert_eq!(svc.participate(&u.id).await.unwrap_err(), LotteryError::UserBanned);
        assert_eq!(svc.participate("nobody").await.unwrap_err(), LotteryError::UserNotFound("nobody".into()));
    }

    #[tokio::test]
    async fn test_due_lottery_stops_taking_entries() {
        let (store, svc) = service();
        let u = store.insert_user(User::new("A".into(), "a@x.io".into())).await.unwrap();
        let due = store
            .create_active(Lottery::new(100, 10, Utc::now() - Duration::seconds(1)))
            .await
            .unwrap();
        assert_eq!(svc.participate(&u.id).await.unwrap_err(), LotteryError::EntriesClosed(due.id.clone()));
        assert!(store.find_by_id(&due.id).await.unwrap().unwrap().participants.is_empty());
    }

    #[tokio::test]
    async fn test_stats_default_without_active_lottery() {
        let (_, svc) = service();
        let stats = svc.current_stats().await.unwrap();
        assert!(!stats.active);
        assert_eq!(stats.participants, 0);
        assert_eq!(stats.total_amount, 0);
    }
}
