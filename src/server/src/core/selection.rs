//! 中奖者选择
//!
//! 对参与者做 Fisher–Yates 洗牌（`SliceRandom::shuffle`），取前 N 位为中奖者。
//! 奖池 = 参与人数 × 票价，由中奖者平分，整除余数不分配。

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 单期最多中奖人数
pub const MAX_WINNERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedWinner {
    pub id: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    /// 按抽中顺序
    pub winners: Vec<SelectedWinner>,
    pub total_prize: u64,
}

impl SelectionResult {
    pub fn prize_per_winner(&self) -> u64 {
        self.winners.first().map(|w| w.amount).unwrap_or(0)
    }

    pub fn distributed(&self) -> u64 {
        self.winners.iter().map(|w| w.amount).sum()
    }

    /// 整除后未分配的余数
    pub fn undistributed(&self) -> u64 {
        self.total_prize.saturating_sub(self.distributed())
    }
}

/// 使用线程本地 CSPRNG 抽取
pub fn select_winners(participant_ids: &[String], ticket_price: u64) -> SelectionResult {
    select_winners_with_rng(participant_ids, ticket_price, &mut rand::thread_rng())
}

pub fn select_winners_with_rng<R: Rng + ?Sized>(
    participant_ids: &[String],
    ticket_price: u64,
    rng: &mut R,
) -> SelectionResult {
    let total_prize = (participant_ids.len() as u64).saturating_mul(ticket_price);

    // 正常数据中参与者唯一；这里仍按首次出现去重，保证同一人不会中奖两次
    let mut seen = HashSet::with_capacity(participant_ids.len());
    let mut pool: Vec<&String> = participant_ids.iter().filter(|id| seen.insert(id.as_str())).collect();

    let winner_count = MAX_WINNERS.min(pool.len());
    if winner_count == 0 {
        return SelectionResult { winners: Vec::new(), total_prize };
    }

    pool.shuffle(rng);
    let prize_per_winner = total_prize / winner_count as u64;
    let winners = pool
        .into_iter()
        .take(winner_count)
        .map(|id| SelectedWinner { id: id.clone(), amount: prize_per_winner })
        .collect();

    SelectionResult { winners, total_prize }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("user-{}", i)).collect()
    }

    #[test]
    fn test_empty_participants_is_valid() {
        let r = select_winners(&[], 100);
        assert!(r.winners.is_empty());
        assert_eq!(r.total_prize, 0);
        assert_eq!(r.prize_per_winner(), 0);
    }

    #[test]
    fn test_single_participant_takes_all() {
        let r = select_winners(&ids(1), 100);
        assert_eq!(r.total_prize, 100);
        assert_eq!(r.winners, vec![SelectedWinner { id: "user-0".into(), amount: 100 }]);
    }

    #[test]
    fn test_five_participants_four_winners() {
        let participants = ids(5);
        let r = select_winners(&participants, 100);
        assert_eq!(r.total_prize, 500);
        assert_eq!(r.winners.len(), 4);
        assert!(r.winners.iter().all(|w| w.amount == 125));
        assert_eq!(r.undistributed(), 0);
        let unique: HashSet<&str> = r.winners.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(unique.len(), 4);
        assert!(r.winners.iter().all(|w| participants.contains(&w.id)));
    }

    #[test]
    fn test_floor_division_remainder_is_retained() {
        let r = select_winners(&ids(6), 33);
        assert_eq!(r.total_prize, 198);
        assert_eq!(r.prize_per_winner(), 49);
        assert_eq!(r.distributed(), 196);
        assert_eq!(r.undistributed(), 2);
    }

    #[test]
    fn test_properties_over_many_sizes() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 0..40 {
            for price in [0u64, 1, 33, 100] {
                let r = select_winners_with_rng(&ids(n), price, &mut rng);
                assert_eq!(r.winners.len(), MAX_WINNERS.min(n));
                assert_eq!(r.total_prize, n as u64 * price);
                assert!(r.distributed() <= r.total_prize);
                let unique: HashSet<&str> = r.winners.iter().map(|w| w.id.as_str()).collect();
                assert_eq!(unique.len(), r.winners.len());
            }
        }
    }

    #[test]
    fn test_duplicate_ids_never_win_twice() {
        let participants = vec!["a".to_string(), "a".to_string(), "b".to_string()];
        let r = select_winners(&participants, 10);
        assert_eq!(r.total_prize, 30);
        assert_eq!(r.winners.len(), 2);
        assert_ne!(r.winners[0].id, r.winners[1].id);
    }

    #[test]
    fn test_selection_is_roughly_uniform() {
        // 5 人选 4 人，每人中奖概率 0.8
        let mut rng = StdRng::seed_from_u64(42);
        let participants = ids(5);
        let mut hits = [0u32; 5];
        let rounds = 20_000;
        for _ in 0..rounds {
            let r = select_winners_with_rng(&participants, 1, &mut rng);
            for w in &r.winners {
                let idx: usize = w.id.trim_start_matches("user-").parse().unwrap();
                hits[idx] += 1;
            }
        }
        for h in hits {
            let p = h as f64 / rounds as f64;
            assert!((p - 0.8).abs() < 0.02, "p = {}", p);
        }
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let participants = ids(10);
        let a = select_winners_with_rng(&participants, 5, &mut StdRng::seed_from_u64(1));
        let b = select_winners_with_rng(&participants, 5, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }
}
