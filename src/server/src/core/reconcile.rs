//! 中奖入账对账
//!
//! 对比已完成抽奖的 winners 与用户 winnings，补写缺失的入账记录。
//! 判断与补写由存储层在一次原子操作内完成，多个对账并发执行也不会重复入账。

use serde::Serialize;
use tracing::{info, warn};

use crate::core::models::{LotteryStatus, Winning};
use crate::core::store::{LotteryStore, UserStore};
use crate::errors::LotteryError;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub lotteries_checked: usize,
    pub repaired: usize,
    /// 用户记录已不存在
    pub orphaned: usize,
}

pub async fn reconcile_winnings<S: LotteryStore + UserStore>(store: &S) -> Result<ReconcileReport, LotteryError> {
    let mut report = ReconcileReport::default();
    let lotteries = store.list_lotteries().await?;

    for lottery in lotteries.iter().filter(|l| l.status == LotteryStatus::Completed) {
        report.lotteries_checked += 1;
        for w in &lottery.winners {
            let winning = Winning { lottery_id: lottery.id.clone(), amount: w.amount, date: w.date };
            match store.append_winning_if_missing(&w.user_id, winning).await {
                Ok(true) => {
                    warn!("发现缺失的中奖入账，已补写: lottery={}, user={}, amount={}", lottery.id, w.user_id, w.amount);
                    report.repaired += 1;
                }
                Ok(false) => {}
                Err(LotteryError::UserNotFound(_)) => report.orphaned += 1,
                Err(e) => return Err(e),
            }
        }
    }

    if report.repaired > 0 {
        info!("对账完成: checked={}, repaired={}", report.lotteries_checked, report.repaired);
    }
    Ok(report)
}
