//! 抽奖关闭（开奖）
//!
//! active -> completed 的单向转换。定时任务与管理员手动开奖共用此入口，
//! 并发安全依赖存储层的条件写入：只有一个调用方能完成转换，其余为 NoOp。

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::models::{Lottery, WinnerRecord};
use crate::core::selection::{select_winners, SelectionResult};
use crate::core::store::{CompletedDraw, DrawCommit, LotteryStore, UserStore};
use crate::errors::LotteryError;

/// 参与者变化导致条件写入失败时的重试次数
const MAX_DRAW_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedLottery {
    pub lottery: Lottery,
    pub total_prize: u64,
    pub prize_per_winner: u64,
    pub winners: Vec<WinnerRecord>,
    /// 找不到用户记录而未入账的中奖者
    pub uncredited: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum CloseOutcome {
    Closed(ClosedLottery),
    /// 抽奖已不是 active，未做任何修改
    NoOp(Lottery),
}

impl CloseOutcome {
    pub fn is_closed(&self) -> bool {
        matches!(self, CloseOutcome::Closed(_))
    }
}

pub struct LotteryCloser<S> {
    store: Arc<S>,
}

impl<S> Clone for LotteryCloser<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: LotteryStore + UserStore> LotteryCloser<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn close(&self, lottery_id: &str) -> Result<CloseOutcome, LotteryError> {
        info!("开始开奖: lottery={}", lottery_id);

        for attempt in 1..=MAX_DRAW_ATTEMPTS {
            let lottery = self
                .store
                .find_by_id(lottery_id)
                .await?
                .ok_or_else(|| LotteryError::NotFound(lottery_id.to_string()))?;

            if !lottery.is_active() {
                info!("抽奖非 active，跳过: lottery={}, status={}", lottery_id, lottery.status);
                return Ok(CloseOutcome::NoOp(lottery));
            }

            let selection = select_winners(&lottery.participants, lottery.ticket_price);
            let draw = to_draw(&selection);

            match self.store.complete_draw(lottery_id, lottery.participants.len(), draw).await? {
                DrawCommit::Completed { lottery, uncredited } => {
                    info!(
                        "开奖完成: lottery={}, participants={}, winners={}, total_prize={}, prize_per_winner={}, undistributed={}",
                        lottery.id,
                        lottery.participants.len(),
                        lottery.winners.len(),
                        selection.total_prize,
                        selection.prize_per_winner(),
                        selection.undistributed()
                    );
                    return Ok(CloseOutcome::Closed(ClosedLottery {
                        total_prize: selection.total_prize,
                        prize_per_winner: selection.prize_per_winner(),
                        winners: lottery.winners.clone(),
                        lottery,
                        uncredited,
                    }));
                }
                DrawCommit::NotActive(status) => {
                    info!("开奖时抽奖已被关闭，跳过: lottery={}, status={}", lottery_id, status);
                    let current = self
                        .store
                        .find_by_id(lottery_id)
                        .await?
                        .ok_or_else(|| LotteryError::NotFound(lottery_id.to_string()))?;
                    return Ok(CloseOutcome::NoOp(current));
                }
                DrawCommit::ParticipantsChanged => {
                    warn!("开奖期间参与者变化，重新抽取: lottery={}, attempt={}", lottery_id, attempt);
                }
            }
        }

        Err(LotteryError::Storage(format!(
            "participants kept changing while closing lottery {}",
            lottery_id
        )))
    }
}

fn to_draw(selection: &SelectionResult) -> CompletedDraw {
    let now = Utc::now();
    CompletedDraw {
        total_amount: selection.total_prize,
        winners: selection
            .winners
            .iter()
            .map(|w| WinnerRecord { user_id: w.id.clone(), amount: w.amount, date: now })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{LotteryStatus, Participation, User};
    use crate::core::store::MemoryStore;

    async fn seeded(n: usize, ticket_price: u64) -> (Arc<MemoryStore>, Lottery, Vec<User>) {
        let store = Arc::new(MemoryStore::new());
        let lottery = store
            .create_active(Lottery::new(ticket_price, 100, Utc::now() + chrono::Duration::hours(1)))
            .await
            .unwrap();
        let mut users = Vec::new();
        for i in 0..n {
            let u = store.insert_user(User::new(format!("U{}", i), format!("u{}@x.io", i))).await.unwrap();
            let p = Participation { lottery_id: lottery.id.clone(), ticket_number: format!("T{}", i), date: Utc::now() };
            store.add_participant(&lottery.id, &u.id, p).await.unwrap();
            users.push(u);
        }
        (store, lottery, users)
    }

    #[tokio::test]
    async fn test_close_unknown_lottery_is_not_found() {
        let closer = LotteryCloser::new(Arc::new(MemoryStore::new()));
        let err = closer.close("missing").await.unwrap_err();
        assert_eq!(err, LotteryError::NotFound("missing".into()));
    }

    #[tokio::test]
    async fn test_close_without_participants_completes_empty() {
        let (store, lottery, _) = seeded(0, 100).await;
        let closer = LotteryCloser::new(Arc::clone(&store));
        let outcome = closer.close(&lottery.id).await.unwrap();
        let CloseOutcome::Closed(closed) = outcome else { panic!("expected closed") };
        assert_eq!(closed.lottery.status, LotteryStatus::Completed);
        assert_eq!(closed.lottery.total_amount, 0);
        assert!(closed.lottery.winners.is_empty());
        assert!(store.find_active().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_credits_each_winner_once() {
        let (store, lottery, users) = seeded(5, 100).await;
        let closer = LotteryCloser::new(Arc::clone(&store));
        let CloseOutcome::Closed(closed) = closer.close(&lottery.id).await.unwrap() else { panic!("expected closed") };
        assert_eq!(closed.total_prize, 500);
        assert_eq!(closed.prize_per_winner, 125);
        assert_eq!(closed.winners.len(), 4);

        let mut credited = 0;
        for u in &users {
            let user = store.find_user(&u.id).await.unwrap().unwrap();
            let won = closed.winners.iter().any(|w| w.user_id == u.id);
            assert_eq!(user.winnings.len(), usize::from(won));
            if won {
                assert_eq!(user.winnings[0].amount, 125);
                assert_eq!(user.winnings[0].lottery_id, lottery.id);
                credited += 1;
            }
        }
        assert_eq!(credited, 4);
    }

    #[tokio::test]
    async fn test_second_close_is_noop() {
        let (store, lottery, _) = seeded(2, 50).await;
        let closer = LotteryCloser::new(Arc::clone(&store));
        assert!(closer.close(&lottery.id).await.unwrap().is_closed());
        let before = store.find_by_id(&lottery.id).await.unwrap().unwrap();
        let CloseOutcome::NoOp(after) = closer.close(&lottery.id).await.unwrap() else { panic!("expected noop") };
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_cancelled_lottery_is_noop() {
        let (store, lottery, _) = seeded(1, 50).await;
        store.cancel(&lottery.id).await.unwrap();
        let closer = LotteryCloser::new(Arc::clone(&store));
        let outcome = closer.close(&lottery.id).await.unwrap();
        assert!(matches!(outcome, CloseOutcome::NoOp(ref l) if l.status == LotteryStatus::Cancelled));
    }
}
