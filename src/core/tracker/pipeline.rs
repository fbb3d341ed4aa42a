use crate::core::tracker::config::{LayoutPreset, TrackerConfig, MAX_CYCLE_INTERVAL};
use crate::core::tracker::detector::{Card, CardDetector, DetectorOutput};
use crate::core::tracker::error::TrackerError;
use crate::core::tracker::history::{PlayHistory, Seat};
use crate::core::tracker::idle::IdleResetter;
use crate::core::tracker::label::{translate_label, Rank};
use crate::core::tracker::ledger::InventoryLedger;
use crate::core::tracker::region::{RegionBuckets, RegionKind, RegionMapper};
use crate::core::tracker::stabilizer::{FrameRead, FrameStabilizer};
use crate::core::tracker::state_machine::{GamePhase, PhaseAction, PhaseMachine};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// 每轮输出给界面的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    pub phase: GamePhase,
    pub remaining: BTreeMap<Rank, i32>,
    pub left: Vec<FrameRead>,
    pub own: Vec<FrameRead>,
    pub right: Vec<FrameRead>,
    pub cycle: u64,
}

pub struct CardTracker {
    config: TrackerConfig,
    layout_name: String,
    mapper: RegionMapper,
    stabilizer: FrameStabilizer,
    machine: PhaseMachine,
    ledger: InventoryLedger,
    history: PlayHistory,
    idle: IdleResetter,
    cycle_counter: u64,
}

impl CardTracker {
    pub fn new(preset: &LayoutPreset, config: TrackerConfig, now: Instant) -> Self {
        let config = config.validated();
        info!("🃏 CardTracker: layout = {}", preset.name);
        Self {
            layout_name: preset.name.clone(),
            mapper: RegionMapper::new(
                preset.layout.clone(),
                config.max_rows,
                config.row_tolerance_ratio,
            ),
            stabilizer: FrameStabilizer::new(config.frame_length),
            machine: PhaseMachine::new(),
            ledger: InventoryLedger::new(),
            history: PlayHistory::new(),
            idle: IdleResetter::new(config.idle_reset(), now),
            cycle_counter: 0,
            config,
        }
    }

    /// 执行一轮：检测 + 折叠
    pub fn run_cycle(&mut self, detector: &dyn CardDetector, now: Instant) -> TrackerSnapshot {
        let result = detector.detect();
        self.fold(result, now)
    }

    /// 把一轮检测结果并入牌局状态；检测失败按空帧处理
    pub fn fold(
        &mut self,
        result: Result<DetectorOutput, TrackerError>,
        now: Instant,
    ) -> TrackerSnapshot {
        self.cycle_counter += 1;

        let buckets = match result {
            Ok(output) => self.read_regions(output),
            Err(e) => {
                debug!("📭 cycle {}: {}", self.cycle_counter, e);
                RegionKind::ALL.iter().map(|&k| (k, Vec::new())).collect()
            }
        };

        let extra_seen = buckets
            .get(&RegionKind::LandlordExtra)
            .is_some_and(|cards| !cards.is_empty());
        if extra_seen {
            self.idle.touch(now);
        }

        if extra_seen || !self.config.require_extra_for_fold {
            for (region, cards) in buckets {
                let read = FrameRead::new(cards.iter().map(|c| c.rank).collect());
                debug!("cycle {} {}: {:?}", self.cycle_counter, region.name(), read.ranks());
                self.stabilizer.push(region, read);
            }
        }

        let actions = self.machine.advance(&self.stabilizer, &self.history);
        for action in actions {
            self.apply(action);
        }

        if self.idle.is_expired(now) {
            if self.machine.phase() != GamePhase::AwaitingDeal || !self.history.is_empty() {
                info!(
                    "⏱️ {:.1}s 未检测到底牌，重置记牌器",
                    self.config.idle_reset_secs
                );
            }
            self.reset_session();
            self.idle.rearm(now);
        }

        self.snapshot()
    }

    fn read_regions(&self, output: DetectorOutput) -> RegionBuckets {
        let cards: Vec<Card> = output
            .detections
            .into_iter()
            .filter_map(|det| match translate_label(&det.label) {
                Ok(rank) => Some(Card {
                    bbox: det.bbox,
                    rank,
                }),
                Err(e) => {
                    warn!("⚠️ {}，丢弃该检测框", e);
                    None
                }
            })
            .collect();

        self.mapper.map_and_sort(cards, output.width, output.height)
    }

    fn apply(&mut self, action: PhaseAction) {
        match action {
            PhaseAction::DealCompleted => {
                info!("🂠 底牌已稳定，等待手牌");
            }
            PhaseAction::HandCounted(hand) => {
                info!("✋ 手牌稳定 ({} 张)，开始记牌", hand.len());
                self.ledger.decrement(&hand);
            }
            PhaseAction::SeatPlayed {
                seat,
                read,
                decrement,
            } => {
                debug!("{:?} 出牌: {:?}", seat, read.ranks());
                if decrement {
                    self.ledger.decrement(&read);
                }
                self.history.record(seat, read);
            }
        }
    }

    fn reset_session(&mut self) {
        self.machine.reset();
        self.ledger.reset();
        self.history.clear();
        self.stabilizer.clear();
    }

    /// 手动重置，任何时候调用都安全
    pub fn reset(&mut self) {
        info!("🔄 CardTracker: reset");
        self.reset_session();
    }

    /// 切换布局：重建区域映射并重置整局
    pub fn set_layout(&mut self, preset: &LayoutPreset) {
        info!("🗺️ 切换布局: {} -> {}", self.layout_name, preset.name);
        self.layout_name = preset.name.clone();
        self.mapper = RegionMapper::new(
            preset.layout.clone(),
            self.config.max_rows,
            self.config.row_tolerance_ratio,
        );
        self.reset_session();
    }

    pub fn set_frame_length(&mut self, frame_length: usize) {
        self.config.frame_length = frame_length.max(1);
        self.stabilizer.set_frame_length(self.config.frame_length);
    }

    pub fn set_idle_reset(&mut self, threshold: Duration) {
        self.config.idle_reset_secs = threshold.as_secs_f64();
        self.idle.set_threshold(threshold);
    }

    pub fn set_cycle_interval(&mut self, interval: Duration) {
        self.config.cycle_interval_secs = interval.min(MAX_CYCLE_INTERVAL).as_secs_f64();
    }

    /// 暂停后恢复：重新开始超时计时，牌局状态保持不变
    pub fn resume(&mut self, now: Instant) {
        info!("▶️ CardTracker: resume");
        self.idle.rearm(now);
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn layout_name(&self) -> &str {
        &self.layout_name
    }

    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn history(&self) -> &PlayHistory {
        &self.history
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            phase: self.machine.phase(),
            remaining: self.ledger.snapshot(),
            left: self.history.plays(Seat::Left).to_vec(),
            own: self.history.plays(Seat::Own).to_vec(),
            right: self.history.plays(Seat::Right).to_vec(),
            cycle: self.cycle_counter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tracker::config::LayoutPresets;
    use crate::core::tracker::detector::{BoundingBox, Detection, MockCardDetector};

    const W: u32 = 1000;
    const H: u32 = 1000;
    const TICK: Duration = Duration::from_millis(200);

    fn preset() -> LayoutPreset {
        LayoutPresets::builtin().presets()[0].clone()
    }

    /// 在区域中心一行排开的检测框
    fn dets_in(region: RegionKind, labels: &[&str]) -> Vec<Detection> {
        let rect = preset().layout.rect(region);
        let cy = (rect.y1 + rect.y2) / 2.0 * H as f32;
        let x0 = rect.x1 * W as f32 + 10.0;
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let x = x0 + i as f32 * 12.0;
                Detection::new(BoundingBox::new(x, cy - 10.0, x + 10.0, cy + 10.0), *label)
            })
            .collect()
    }

    fn output(parts: &[(RegionKind, &[&str])]) -> DetectorOutput {
        let detections = parts
            .iter()
            .flat_map(|(region, labels)| dets_in(*region, labels))
            .collect();
        DetectorOutput::new(W, H, detections)
    }

    struct Harness {
        tracker: CardTracker,
        now: Instant,
    }

    impl Harness {
        fn new(config: TrackerConfig) -> Self {
            let now = Instant::now();
            Self {
                tracker: CardTracker::new(&preset(), config, now),
                now,
            }
        }

        fn cycle(&mut self, parts: &[(RegionKind, &[&str])]) -> TrackerSnapshot {
            self.now += TICK;
            self.tracker.fold(Ok(output(parts)), self.now)
        }

        fn cycles(&mut self, n: usize, parts: &[(RegionKind, &[&str])]) -> TrackerSnapshot {
            let mut last = None;
            for _ in 0..n {
                last = Some(self.cycle(parts));
            }
            last.unwrap()
        }
    }

    fn read(ranks: &[Rank]) -> FrameRead {
        FrameRead::new(ranks.to_vec())
    }

    #[test]
    fn test_end_to_end_ace_scenario() {
        let mut h = Harness::new(TrackerConfig::default());
        assert_eq!(h.tracker.ledger().count(Rank::Ace), 4);

        let extra: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["A"]);
        h.cycle(&[extra]);
        h.cycle(&[extra]);
        assert_eq!(h.tracker.phase(), GamePhase::AwaitingDeal);
        let snap = h.cycle(&[extra]);
        assert_eq!(snap.phase, GamePhase::HandRevealed);

        // 之后几轮只有手牌区和左家出牌区有牌
        let hand: (RegionKind, &[&str]) = (RegionKind::SelfHand, &["A", "A"]);
        h.cycle(&[hand]);
        h.cycle(&[hand]);
        let snap = h.cycle(&[hand]);
        assert_eq!(snap.phase, GamePhase::Tracking);
        assert_eq!(snap.remaining[&Rank::Ace], 2);

        let left: (RegionKind, &[&str]) = (RegionKind::OpponentLeft, &["A"]);
        let snap = h.cycles(3, &[left]);
        assert_eq!(snap.left, vec![read(&[Rank::Ace])]);
        assert_eq!(snap.remaining[&Rank::Ace], 1);

        // 同一手牌持续显示不会重复记录
        let snap = h.cycles(3, &[left]);
        assert_eq!(snap.left.len(), 1);
        assert_eq!(snap.remaining[&Rank::Ace], 1);
    }

    #[test]
    fn test_self_played_not_double_counted() {
        let mut h = Harness::new(TrackerConfig::default());
        let extra: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["K"]);
        h.cycles(3, &[extra]);

        let hand: (RegionKind, &[&str]) = (RegionKind::SelfHand, &["three", "three", "four"]);
        let snap = h.cycles(3, &[extra, hand]);
        assert_eq!(snap.remaining[&Rank::Three], 2);

        let played: (RegionKind, &[&str]) = (RegionKind::SelfPlayed, &["three", "three"]);
        let snap = h.cycles(3, &[extra, played]);
        assert_eq!(snap.own, vec![read(&[Rank::Three, Rank::Three])]);
        assert_eq!(snap.remaining[&Rank::Three], 2);
    }

    #[test]
    fn test_noisy_frame_delays_deal() {
        let mut h = Harness::new(TrackerConfig::default());
        let extra: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["A", "2"]);
        let noisy: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["A"]);

        h.cycle(&[extra]);
        h.cycle(&[noisy]);
        h.cycle(&[extra]);
        h.cycle(&[extra]);
        assert_eq!(h.tracker.phase(), GamePhase::AwaitingDeal);
        h.cycle(&[extra]);
        assert_eq!(h.tracker.phase(), GamePhase::HandRevealed);
    }

    #[test]
    fn test_idle_timeout_resets_everything() {
        let mut h = Harness::new(TrackerConfig::default());
        let extra: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["A"]);
        let hand: (RegionKind, &[&str]) = (RegionKind::SelfHand, &["5"]);
        let right: (RegionKind, &[&str]) = (RegionKind::OpponentRight, &["6"]);
        h.cycles(3, &[extra]);
        h.cycles(3, &[extra, hand]);
        let snap = h.cycles(3, &[extra, right]);
        assert_eq!(snap.phase, GamePhase::Tracking);
        assert_eq!(snap.right.len(), 1);

        // 底牌消失后 2.5s 内保持状态
        let snap = h.cycles(10, &[right]);
        assert_eq!(snap.phase, GamePhase::Tracking);

        h.now += Duration::from_secs(3);
        let snap = h.tracker.fold(Ok(output(&[right])), h.now);
        assert_eq!(snap.phase, GamePhase::AwaitingDeal);
        assert!(snap.left.is_empty() && snap.own.is_empty() && snap.right.is_empty());
        assert_eq!(snap.remaining.values().sum::<i32>(), 54);
    }

    #[test]
    fn test_resume_after_long_pause_keeps_session() {
        let mut h = Harness::new(TrackerConfig::default());
        let extra: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["A"]);
        let hand: (RegionKind, &[&str]) = (RegionKind::SelfHand, &["7", "7"]);
        let left: (RegionKind, &[&str]) = (RegionKind::OpponentLeft, &["8"]);
        h.cycles(3, &[extra]);
        h.cycles(3, &[extra, hand]);
        h.cycles(3, &[extra, left]);
        assert_eq!(h.tracker.phase(), GamePhase::Tracking);

        // 暂停远超超时阈值
        h.now += Duration::from_secs(30);
        h.tracker.resume(h.now);

        let snap = h.cycle(&[left]);
        assert_eq!(snap.phase, GamePhase::Tracking);
        assert_eq!(snap.left, vec![read(&[Rank::Eight])]);
        assert_eq!(snap.remaining[&Rank::Seven], 2);
        assert_eq!(snap.remaining[&Rank::Eight], 3);
    }

    #[test]
    fn test_detector_failure_is_empty_cycle() {
        let mut h = Harness::new(TrackerConfig::default());
        let extra: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["A"]);
        h.cycle(&[extra]);
        h.cycle(&[extra]);

        h.now += TICK;
        let snap = h.tracker.fold(
            Err(TrackerError::DetectorUnavailable("capture failed".to_string())),
            h.now,
        );
        assert_eq!(snap.phase, GamePhase::AwaitingDeal);

        // 空帧进入窗口，需要重新攒满三帧
        h.cycle(&[extra]);
        h.cycle(&[extra]);
        assert_eq!(h.tracker.phase(), GamePhase::AwaitingDeal);
        h.cycle(&[extra]);
        assert_eq!(h.tracker.phase(), GamePhase::HandRevealed);
    }

    #[test]
    fn test_unknown_label_dropped() {
        let mut h = Harness::new(TrackerConfig::default());
        let extra: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["A", "eleven"]);
        let snap = h.cycles(3, &[extra]);
        assert_eq!(snap.phase, GamePhase::HandRevealed);
    }

    #[test]
    fn test_require_extra_for_fold() {
        let config = TrackerConfig {
            require_extra_for_fold: true,
            ..Default::default()
        };
        let mut h = Harness::new(config);
        let extra: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["Q"]);
        let hand: (RegionKind, &[&str]) = (RegionKind::SelfHand, &["Q"]);
        h.cycles(3, &[extra]);

        // 没有底牌的帧不计入窗口
        h.cycles(3, &[hand]);
        assert_eq!(h.tracker.phase(), GamePhase::HandRevealed);

        let snap = h.cycles(3, &[extra, hand]);
        assert_eq!(snap.phase, GamePhase::Tracking);
        assert_eq!(snap.remaining[&Rank::Queen], 3);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut h = Harness::new(TrackerConfig::default());
        let extra: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["A"]);
        let hand: (RegionKind, &[&str]) = (RegionKind::SelfHand, &["9", "9"]);
        h.cycles(3, &[extra]);
        h.cycles(3, &[extra, hand]);
        assert_eq!(h.tracker.ledger().count(Rank::Nine), 2);

        h.tracker.reset();
        let first = h.tracker.snapshot();
        h.tracker.reset();
        assert_eq!(first, h.tracker.snapshot());
        assert_eq!(first.phase, GamePhase::AwaitingDeal);
        assert_eq!(first.remaining[&Rank::Nine], 4);

        // 窗口也被清空，需要重新攒满
        h.cycle(&[extra]);
        assert_eq!(h.tracker.phase(), GamePhase::AwaitingDeal);
    }

    #[test]
    fn test_set_layout_resets_session() {
        let mut h = Harness::new(TrackerConfig::default());
        let extra: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["A"]);
        h.cycles(3, &[extra]);
        assert_eq!(h.tracker.phase(), GamePhase::HandRevealed);

        let mut other = preset();
        other.name = "other".to_string();
        h.tracker.set_layout(&other);
        assert_eq!(h.tracker.phase(), GamePhase::AwaitingDeal);
        assert_eq!(h.tracker.layout_name(), "other");
    }

    #[test]
    fn test_hot_reload_frame_length() {
        let mut h = Harness::new(TrackerConfig::default());
        h.tracker.set_frame_length(1);
        let extra: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["A"]);
        h.cycle(&[extra]);
        assert_eq!(h.tracker.phase(), GamePhase::HandRevealed);
        assert_eq!(h.tracker.config().frame_length, 1);
    }

    #[test]
    fn test_run_cycle_with_mock_detector() {
        let jokers: (RegionKind, &[&str]) = (RegionKind::LandlordExtra, &["joker", "JOKER"]);
        let detector = MockCardDetector::with_fixed_output(output(&[jokers]));
        let mut tracker = CardTracker::new(&preset(), TrackerConfig::default(), Instant::now());
        let now = Instant::now();
        for _ in 0..3 {
            tracker.run_cycle(&detector, now);
        }
        assert_eq!(tracker.phase(), GamePhase::HandRevealed);
        assert_eq!(tracker.snapshot().cycle, 3);
    }
}
