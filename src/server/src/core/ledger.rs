//! 付款流水
//!
//! 没有独立的支付记录，由用户的参与记录和对应抽奖的票价汇总得出。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::store::{LotteryStore, UserStore};
use crate::errors::LotteryError;

/// 每条参与记录对应一张票
const TICKETS_PER_PARTICIPATION: u64 = 1;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub lottery_id: String,
    pub amount: u64,
    pub ticket_count: u64,
    pub total_amount: u64,
    pub date: DateTime<Utc>,
}

/// 按时间倒序；抽奖已被删除的参与记录不计入
pub async fn payment_ledger<S: LotteryStore + UserStore>(store: &S) -> Result<Vec<PaymentRecord>, LotteryError> {
    let prices: HashMap<String, u64> = store
        .list_lotteries()
        .await?
        .into_iter()
        .map(|l| (l.id, l.ticket_price))
        .collect();

    let mut payments = Vec::new();
    for user in store.list_users().await? {
        for p in &user.participations {
            let Some(&price) = prices.get(&p.lottery_id) else {
                continue;
            };
            payments.push(PaymentRecord {
                user_id: user.id.clone(),
                user_name: user.full_name.clone(),
                user_email: user.email.clone(),
                lottery_id: p.lottery_id.clone(),
                amount: price,
                ticket_count: TICKETS_PER_PARTICIPATION,
                total_amount: price.saturating_mul(TICKETS_PER_PARTICIPATION),
                date: p.date,
            });
        }
    }
    payments.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(payments)
}
