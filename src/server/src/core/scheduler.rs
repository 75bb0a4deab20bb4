//! 定时开奖调度
//!
//! 启动时立即执行一次，此后按固定间隔扫描到期的 active 抽奖并逐个关闭。
//! 单个抽奖失败只记录日志，不影响同一轮的其他抽奖；失败的抽奖保持 active，下一轮自动重试。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::core::closer::{CloseOutcome, LotteryCloser};
use crate::core::reconcile::reconcile_winnings;
use crate::core::store::{LotteryStore, UserStore};

/// 默认扫描间隔
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub closed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub repaired: usize,
}

pub struct LotteryScheduler<S> {
    store: Arc<S>,
    closer: LotteryCloser<S>,
    interval: Duration,
}

impl<S: LotteryStore + UserStore> LotteryScheduler<S> {
    pub fn new(store: Arc<S>, interval: Duration) -> Self {
        Self {
            closer: LotteryCloser::new(Arc::clone(&store)),
            store,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// 执行一轮扫描；到期抽奖顺序处理
    pub async fn run_once(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        let expired = match self.store.find_expired_active(now).await {
            Ok(list) => list,
            Err(e) => {
                error!("查询到期抽奖失败: {}", e);
                return report;
            }
        };
        if !expired.is_empty() {
            info!("发现 {} 个到期抽奖", expired.len());
        }

        for lottery in expired {
            match self.closer.close(&lottery.id).await {
                Ok(CloseOutcome::Closed(_)) => report.closed.push(lottery.id),
                Ok(CloseOutcome::NoOp(_)) => report.skipped.push(lottery.id),
                Err(e) => {
                    error!("关闭抽奖失败，下轮重试: lottery={}, error={}", lottery.id, e);
                    report.failed.push(lottery.id);
                }
            }
        }

        match reconcile_winnings(self.store.as_ref()).await {
            Ok(r) => report.repaired = r.repaired,
            Err(e) => error!("中奖入账对账失败: {}", e),
        }

        report
    }

    /// 运行直到 `shutdown` 变为 true；关闭信号只在两轮之间生效，进行中的开奖会完整执行
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("定时开奖已启动，间隔 {:?}", self.interval);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                // interval 的第一次 tick 立即触发，覆盖停机期间到期的抽奖
                _ = ticker.tick() => {
                    self.run_once(Utc::now()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("定时开奖已停止");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Lottery, LotteryStatus};
    use crate::core::store::MemoryStore;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_tick_closes_only_expired() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let a = Lottery::new(100, 10, now - ChronoDuration::minutes(5));
        let b = Lottery::new(100, 10, now - ChronoDuration::seconds(1));
        let c = Lottery::new(100, 10, now + ChronoDuration::hours(1));
        for l in [&a, &b, &c] {
            store.save(l.clone()).await.unwrap();
        }

        let scheduler = LotteryScheduler::new(Arc::clone(&store), DEFAULT_INTERVAL);
        let report = scheduler.run_once(now).await;
        assert_eq!(report.closed.len(), 2);
        assert!(report.closed.contains(&a.id) && report.closed.contains(&b.id));
        assert!(report.failed.is_empty());

        let c_after = store.find_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(c_after.status, LotteryStatus::Active);
        assert_eq!(c_after, c);
    }

    #[tokio::test]
    async fn test_run_ticks_on_start_and_stops_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let expired = Lottery::new(100, 10, Utc::now() - ChronoDuration::minutes(1));
        store.save(expired.clone()).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = LotteryScheduler::new(Arc::clone(&store), Duration::from_secs(3600)).spawn(rx);

        // 启动后立即执行的一轮应关闭已到期的抽奖
        let mut closed = false;
        for _ in 0..50 {
            if store.find_by_id(&expired.id).await.unwrap().unwrap().status == LotteryStatus::Completed {
                closed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(closed);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
