//! 记牌器 - Dart 侧截图推理后推送检测框，这里维护牌局状态

use crate::api::models::tracker::{CounterSnapshot, DetectionInput};
use crate::core::tracker::config::duration_from_secs;
use crate::core::tracker::{
    CardTracker, DetectorOutput, LayoutPresets, TrackerError, TrackerSettings, TrackerWorker,
};
use flutter_rust_bridge::frb;
use log::{info, warn};
use std::time::Instant;

/// 斗地主记牌器
///
/// ```dart
/// final counter = CardCounter.create(settingsJson5: null, layoutName: "JJ斗地主");
/// final snapshot = counter.submitDetections(width: w, height: h, detections: boxes);
/// counter.reset();
/// ```
#[frb(opaque)]
pub struct CardCounter {
    worker: TrackerWorker,
    presets: LayoutPresets,
}

impl CardCounter {
    /// 创建记牌器；settings_json5 为空时使用默认参数与内置布局
    #[frb(sync)]
    pub fn create(
        settings_json5: Option<String>,
        layout_name: Option<String>,
    ) -> Result<Self, TrackerError> {
        crate::init_logging();

        let settings = match settings_json5 {
            Some(text) => TrackerSettings::from_json5(&text)?,
            None => TrackerSettings::default(),
        };
        let presets = settings.layout_presets()?;
        let wanted = layout_name.or_else(|| settings.layout.clone());
        let preset = presets.resolve(wanted.as_deref())?;

        let tracker = CardTracker::new(preset, settings.tracker.clone(), Instant::now());
        info!("🎴 CardCounter: created with layout {}", preset.name);
        Ok(Self {
            worker: TrackerWorker::new(tracker),
            presets,
        })
    }

    /// 提交一轮检测结果；上一轮仍在处理时本次被丢弃，返回最近一次结果
    #[frb]
    pub fn submit_detections(
        &self,
        width: u32,
        height: u32,
        detections: Vec<DetectionInput>,
    ) -> CounterSnapshot {
        let output = DetectorOutput::new(
            width,
            height,
            detections.into_iter().map(Into::into).collect(),
        );
        match self.worker.fold_output(Ok(output)) {
            Some(snapshot) => CounterSnapshot::from_snapshot(&snapshot),
            None => self.snapshot(),
        }
    }

    /// 本轮截图或推理失败，按空帧计入（仍参与超时重置）
    #[frb]
    pub fn submit_failure(&self, reason: String) -> CounterSnapshot {
        match self
            .worker
            .fold_output(Err(TrackerError::DetectorUnavailable(reason)))
        {
            Some(snapshot) => CounterSnapshot::from_snapshot(&snapshot),
            None => self.snapshot(),
        }
    }

    #[frb(sync)]
    pub fn snapshot(&self) -> CounterSnapshot {
        let snapshot = self
            .worker
            .latest()
            .or_else(|| self.worker.with_tracker(|t| t.snapshot()));
        snapshot
            .map(|s| CounterSnapshot::from_snapshot(&s))
            .unwrap_or_default()
    }

    #[frb(sync)]
    pub fn reset(&self) {
        self.worker.reset();
    }

    #[frb(sync, getter)]
    pub fn phase(&self) -> String {
        self.snapshot().phase
    }

    #[frb(sync, getter)]
    pub fn layout_names(&self) -> Vec<String> {
        self.presets.names()
    }

    /// 切换布局，找不到时退回第一项；切换后整局重置
    #[frb(sync)]
    pub fn set_layout(&self, name: String) -> Result<String, TrackerError> {
        let preset = self.presets.resolve(Some(&name))?.clone();
        self.worker.reset();
        self.worker.with_tracker(|t| t.set_layout(&preset));
        Ok(preset.name)
    }

    #[frb(sync)]
    pub fn set_frame_length(&self, frame_length: u32) {
        self.worker
            .with_tracker(|t| t.set_frame_length(frame_length as usize));
    }

    #[frb(sync)]
    pub fn set_idle_reset_secs(&self, secs: f64) {
        match duration_from_secs(secs) {
            Some(threshold) => {
                self.worker.with_tracker(|t| t.set_idle_reset(threshold));
            }
            None => warn!("⚠️ 忽略无效的 idle_reset_secs: {}", secs),
        }
    }

    #[frb(sync)]
    pub fn set_cycle_interval_secs(&self, secs: f64) {
        match duration_from_secs(secs) {
            Some(interval) => {
                self.worker.with_tracker(|t| t.set_cycle_interval(interval));
            }
            None => warn!("⚠️ 忽略无效的 cycle_interval_secs: {}", secs),
        }
    }

    /// 暂停记牌：暂停期间提交的检测结果被忽略
    #[frb(sync)]
    pub fn pause(&self) {
        self.worker.pause();
    }

    /// 恢复记牌；超时计时从恢复时刻重新开始，暂停再久也不会清空牌局
    #[frb(sync)]
    pub fn resume(&self) {
        self.worker.resume();
    }

    #[frb(sync, getter)]
    pub fn is_paused(&self) -> bool {
        self.worker.is_paused()
    }

    #[frb(sync, getter)]
    pub fn cycle_interval_secs(&self) -> f64 {
        self.worker
            .with_tracker(|t| t.config().cycle_interval_secs)
            .unwrap_or_default()
    }
}

impl Drop for CardCounter {
    fn drop(&mut self) {
        info!("🗑️ CardCounter: released");
    }
}
