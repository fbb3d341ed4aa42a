//! 后台执行记牌：检测在后台线程运行，同一时间最多一轮在途
//!
//! - 忙碌标志：上一轮未结束时新的请求直接丢弃，不排队
//! - 所有状态修改都在 tracker 锁内完成，手动重置与折叠串行
//! - 重置会递增 epoch，检测期间发生过重置的那一轮结果被丢弃
//! - 暂停期间不发起也不折叠任何一轮，恢复时重新开始超时计时

use super::config::DEFAULT_CYCLE_INTERVAL;
use super::detector::{CardDetector, DetectorOutput};
use super::error::TrackerError;
use super::pipeline::{CardTracker, TrackerSnapshot};
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// 离开作用域时释放忙碌标志
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct TrackerWorker {
    tracker: Arc<Mutex<CardTracker>>,
    detector: Option<Arc<dyn CardDetector>>,
    busy: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    epoch: Arc<AtomicU64>,
    latest: Arc<Mutex<Option<TrackerSnapshot>>>,
}

impl TrackerWorker {
    /// 由调用方推送检测结果（见 [`TrackerWorker::fold_output`]）
    pub fn new(tracker: CardTracker) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(tracker)),
            detector: None,
            busy: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            epoch: Arc::new(AtomicU64::new(0)),
            latest: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_detector(tracker: CardTracker, detector: Arc<dyn CardDetector>) -> Self {
        Self {
            detector: Some(detector),
            ..Self::new(tracker)
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// 请求一轮后台检测；已有一轮在途时返回 None
    pub fn request_cycle(&self) -> Option<JoinHandle<()>> {
        if self.is_paused() {
            return None;
        }
        let detector = self.detector.clone()?;
        let Some(guard) = BusyGuard::acquire(&self.busy) else {
            debug!("⏭️ 上一轮尚未结束，丢弃本次检测请求");
            return None;
        };

        let worker = self.clone();
        Some(thread::spawn(move || {
            let _guard = guard;
            let epoch = worker.epoch.load(Ordering::Acquire);
            let result = detector.detect();
            worker.fold_at_epoch(result, epoch);
        }))
    }

    /// 调用方已完成推理时同步折叠；与后台轮次共用忙碌标志
    pub fn fold_output(
        &self,
        result: Result<DetectorOutput, TrackerError>,
    ) -> Option<TrackerSnapshot> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let epoch = self.epoch.load(Ordering::Acquire);
        self.fold_at_epoch(result, epoch)
    }

    fn fold_at_epoch(
        &self,
        result: Result<DetectorOutput, TrackerError>,
        epoch: u64,
    ) -> Option<TrackerSnapshot> {
        let mut tracker = self.lock_tracker()?;
        if self.is_paused() {
            debug!("⏸️ 已暂停，忽略本轮结果");
            return None;
        }
        if self.epoch.load(Ordering::Acquire) != epoch {
            info!("🗑️ 检测期间发生重置，丢弃本轮结果");
            return None;
        }
        let snapshot = tracker.fold(result, Instant::now());
        drop(tracker);

        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(snapshot.clone());
        }
        Some(snapshot)
    }

    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if let Some(mut tracker) = self.lock_tracker() {
            tracker.reset();
            let snapshot = tracker.snapshot();
            drop(tracker);
            if let Ok(mut latest) = self.latest.lock() {
                *latest = Some(snapshot);
            }
        }
    }

    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::AcqRel) {
            info!("⏸️ TrackerWorker: paused");
        }
    }

    /// 恢复后从当前时刻重新计算超时，避免暂停期间被判定为离开牌桌
    pub fn resume(&self) {
        if let Some(mut tracker) = self.lock_tracker() {
            tracker.resume(Instant::now());
        }
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// 最近一轮的结果
    pub fn latest(&self) -> Option<TrackerSnapshot> {
        self.latest.lock().ok().and_then(|l| l.clone())
    }

    /// 在锁内访问 tracker（修改配置、切换布局等）
    pub fn with_tracker<R>(&self, f: impl FnOnce(&mut CardTracker) -> R) -> Option<R> {
        self.lock_tracker().map(|mut t| f(&mut t))
    }

    fn lock_tracker(&self) -> Option<MutexGuard<'_, CardTracker>> {
        match self.tracker.lock() {
            Ok(guard) => Some(guard),
            Err(e) => {
                error!("❌ tracker 锁已中毒: {}", e);
                None
            }
        }
    }

    /// 按配置的间隔定时触发检测，每次 tick 重新读取间隔以支持热更新
    pub fn spawn_ticker(&self) -> TickerHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let worker = self.clone();
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            info!("⏰ ticker started");
            while !stop_flag.load(Ordering::Acquire) {
                worker.request_cycle();
                let interval = worker
                    .with_tracker(|t| t.config().cycle_interval())
                    .unwrap_or(DEFAULT_CYCLE_INTERVAL);
                thread::sleep(interval);
            }
            info!("⏰ ticker stopped");
        });

        TickerHandle {
            stop,
            handle: Some(handle),
        }
    }
}

pub struct TickerHandle {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TickerHandle {
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("❌ ticker thread panicked");
            }
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tracker::config::{LayoutPresets, TrackerConfig};
    use crate::core::tracker::detector::{BoundingBox, Detection, MockCardDetector};
    use crate::core::tracker::label::Rank;
    use crate::core::tracker::state_machine::GamePhase;
    use std::sync::mpsc;

    fn tracker() -> CardTracker {
        let preset = LayoutPresets::builtin().presets()[0].clone();
        CardTracker::new(&preset, TrackerConfig::default(), Instant::now())
    }

    fn extra_output() -> DetectorOutput {
        // 内置布局底牌区 (350-450, 80-150)
        DetectorOutput::new(
            1000,
            1000,
            vec![Detection::new(BoundingBox::new(390.0, 100.0, 410.0, 130.0), "A")],
        )
    }

    /// 阻塞在 detect 内，直到测试放行
    struct GatedDetector {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl CardDetector for GatedDetector {
        fn detect(&self) -> Result<DetectorOutput, TrackerError> {
            if let Ok(tx) = self.entered.lock() {
                let _ = tx.send(());
            }
            if let Ok(rx) = self.release.lock() {
                let _ = rx.recv();
            }
            Ok(extra_output())
        }
    }

    fn gated() -> (Arc<GatedDetector>, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let detector = Arc::new(GatedDetector {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        (detector, entered_rx, release_tx)
    }

    #[test]
    fn test_busy_guard_drops_overlapping_requests() {
        let (detector, entered, release) = gated();
        let worker = TrackerWorker::with_detector(tracker(), detector);

        let handle = worker.request_cycle().expect("first request runs");
        entered.recv().unwrap();
        assert!(worker.is_busy());
        assert!(worker.request_cycle().is_none());
        assert!(worker.fold_output(Ok(extra_output())).is_none());

        release.send(()).unwrap();
        handle.join().unwrap();
        assert!(!worker.is_busy());
        assert_eq!(worker.latest().unwrap().cycle, 1);
    }

    #[test]
    fn test_reset_during_detection_discards_cycle() {
        let (detector, entered, release) = gated();
        let worker = TrackerWorker::with_detector(tracker(), detector);

        let handle = worker.request_cycle().unwrap();
        entered.recv().unwrap();
        worker.reset();
        release.send(()).unwrap();
        handle.join().unwrap();

        let snap = worker.latest().unwrap();
        assert_eq!(snap.cycle, 0);
        assert_eq!(snap.phase, GamePhase::AwaitingDeal);
    }

    #[test]
    fn test_sequential_cycles_advance_phase() {
        let detector = Arc::new(MockCardDetector::with_fixed_output(extra_output()));
        let worker = TrackerWorker::with_detector(tracker(), detector);

        for _ in 0..3 {
            worker.request_cycle().unwrap().join().unwrap();
        }
        assert_eq!(worker.latest().unwrap().phase, GamePhase::HandRevealed);

        worker.reset();
        assert_eq!(worker.latest().unwrap().phase, GamePhase::AwaitingDeal);
    }

    #[test]
    fn test_fold_output_sync() {
        let worker = TrackerWorker::new(tracker());
        assert!(worker.request_cycle().is_none());
        let snap = worker.fold_output(Ok(extra_output())).unwrap();
        assert_eq!(snap.cycle, 1);
        assert_eq!(
            worker.with_tracker(|t| t.config().frame_length),
            Some(3)
        );
    }

    #[test]
    fn test_resume_after_long_pause_keeps_tracking() {
        let worker = TrackerWorker::new(tracker());
        worker.with_tracker(|t| {
            t.set_frame_length(1);
            t.set_idle_reset(Duration::from_millis(200));
        });

        // 内置布局手牌区 (40-960, 700-850)
        let hand = Detection::new(BoundingBox::new(100.0, 760.0, 120.0, 790.0), "9");
        let mut output = extra_output();
        output.detections.push(hand.clone());
        let snap = worker.fold_output(Ok(output)).unwrap();
        assert_eq!(snap.phase, GamePhase::Tracking);

        worker.pause();
        thread::sleep(Duration::from_millis(400));
        let hand_only = DetectorOutput::new(1000, 1000, vec![hand]);
        assert!(worker.fold_output(Ok(hand_only.clone())).is_none());

        worker.resume();
        let snap = worker.fold_output(Ok(hand_only)).unwrap();
        assert_eq!(snap.phase, GamePhase::Tracking);
        assert_eq!(snap.remaining[&Rank::Nine], 3);
    }

    #[test]
    fn test_paused_worker_skips_requests() {
        let detector = Arc::new(MockCardDetector::with_fixed_output(extra_output()));
        let worker = TrackerWorker::with_detector(tracker(), detector.clone());
        worker.pause();
        assert!(worker.request_cycle().is_none());
        assert_eq!(detector.cycles(), 0);

        worker.resume();
        worker.request_cycle().unwrap().join().unwrap();
        assert_eq!(detector.cycles(), 1);
    }

    #[test]
    fn test_ticker_runs_and_stops() {
        let detector = Arc::new(MockCardDetector::with_fixed_output(extra_output()));
        let worker = TrackerWorker::with_detector(tracker(), detector.clone());
        worker.with_tracker(|t| t.set_cycle_interval(Duration::from_millis(5)));

        let mut ticker = worker.spawn_ticker();
        thread::sleep(Duration::from_millis(100));
        ticker.stop();

        assert!(detector.cycles() > 0);
    }
}
