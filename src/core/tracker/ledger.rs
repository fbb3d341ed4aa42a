//! 剩余牌计数

use super::label::Rank;
use super::stabilizer::FrameRead;
use log::warn;
use std::collections::BTreeMap;

/// 点数 → 未出现张数，初始为整副 54 张，只减不加（重置除外）
///
/// 上游重复识别时计数可能变为负数。这里不截断，负数保留下来作为识别异常的信号，
/// 由 [`InventoryLedger::deficits`] 查询。
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryLedger {
    counts: BTreeMap<Rank, i32>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self {
            counts: full_deck(),
        }
    }

    pub fn count(&self, rank: Rank) -> i32 {
        self.counts.get(&rank).copied().unwrap_or(0)
    }

    pub fn total(&self) -> i32 {
        self.counts.values().sum()
    }

    pub fn decrement(&mut self, read: &FrameRead) {
        for &rank in read.ranks() {
            let count = self.counts.entry(rank).or_insert(0);
            *count -= 1;
            if *count < 0 {
                warn!("⚠️ 剩余牌计数为负: {} = {}", rank, count);
            }
        }
    }

    /// 计数为负的点数
    pub fn deficits(&self) -> Vec<(Rank, i32)> {
        self.counts
            .iter()
            .filter(|(_, c)| **c < 0)
            .map(|(&r, &c)| (r, c))
            .collect()
    }

    pub fn snapshot(&self) -> BTreeMap<Rank, i32> {
        self.counts.clone()
    }

    pub fn reset(&mut self) {
        self.counts = full_deck();
    }
}

impl Default for InventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn full_deck() -> BTreeMap<Rank, i32> {
    Rank::ALL.iter().map(|&r| (r, r.deck_count())).collect()
}
