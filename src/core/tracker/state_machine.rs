use super::history::{PlayHistory, Seat};
use super::region::RegionKind;
use super::stabilizer::{FrameRead, FrameStabilizer};
use log::info;
use serde::{Deserialize, Serialize};

/// 牌局阶段，只能前进，重置后回到 AwaitingDeal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// 等待发牌（地主底牌未出现）
    #[default]
    AwaitingDeal,
    /// 底牌已亮，等待手牌稳定
    HandRevealed,
    /// 开始记牌
    Tracking,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhaseAction {
    DealCompleted,
    /// 自己的手牌稳定，从剩余牌中扣除一次
    HandCounted(FrameRead),
    /// 某个座位出了新牌
    SeatPlayed {
        seat: Seat,
        read: FrameRead,
        decrement: bool,
    },
}

impl GamePhase {
    /// 单步转移：返回下一阶段与触发的动作，阶段不变时动作为 None
    pub fn transition(&self, stabilizer: &FrameStabilizer) -> (GamePhase, Option<PhaseAction>) {
        match self {
            GamePhase::AwaitingDeal => {
                if stabilizer.is_stable(RegionKind::LandlordExtra) {
                    (GamePhase::HandRevealed, Some(PhaseAction::DealCompleted))
                } else {
                    (GamePhase::AwaitingDeal, None)
                }
            }

            GamePhase::HandRevealed => match stabilizer.stable_read(RegionKind::SelfHand) {
                Some(hand) => (
                    GamePhase::Tracking,
                    Some(PhaseAction::HandCounted(hand.clone())),
                ),
                None => (GamePhase::HandRevealed, None),
            },

            GamePhase::Tracking => (GamePhase::Tracking, None),
        }
    }
}

const SEAT_REGIONS: [RegionKind; 3] = [
    RegionKind::OpponentLeft,
    RegionKind::OpponentRight,
    RegionKind::SelfPlayed,
];

pub struct PhaseMachine {
    phase: GamePhase,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            phase: GamePhase::AwaitingDeal,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// 每轮评估一次，同一轮内可以连续前进多个阶段
    pub fn advance(
        &mut self,
        stabilizer: &FrameStabilizer,
        history: &PlayHistory,
    ) -> Vec<PhaseAction> {
        let mut actions = Vec::new();

        loop {
            let (next, action) = self.phase.transition(stabilizer);
            if let Some(action) = action {
                actions.push(action);
            }
            if next == self.phase {
                break;
            }
            info!("🃏 阶段切换: {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }

        if self.phase == GamePhase::Tracking {
            for region in SEAT_REGIONS {
                if let Some(action) = Self::seat_action(region, stabilizer, history) {
                    actions.push(action);
                }
            }
        }

        actions
    }

    fn seat_action(
        region: RegionKind,
        stabilizer: &FrameStabilizer,
        history: &PlayHistory,
    ) -> Option<PhaseAction> {
        let seat = region.seat()?;
        let read = stabilizer.stable_read(region)?;
        if history.last(seat) == Some(read) {
            return None;
        }
        Some(PhaseAction::SeatPlayed {
            seat,
            read: read.clone(),
            decrement: region.tracks_inventory(),
        })
    }

    pub fn reset(&mut self) {
        self.phase = GamePhase::AwaitingDeal;
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}
