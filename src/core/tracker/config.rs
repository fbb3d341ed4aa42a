//! 记牌器配置：阈值参数 + 各软件的区域布局预设
//!
//! 配置文件使用 JSON5，缺省字段取默认值：
//!
//! ```json5
//! {
//!   tracker: { frame_length: 3, idle_reset_secs: 2.5 },
//!   layout: "JJ斗地主",
//!   presets: [
//!     { name: "JJ斗地主", window_title: "JJ斗地主", layout: { player_hand: { x1: 0.04, ... }, ... } },
//!   ],
//! }
//! ```

use super::error::TrackerError;
use super::idle::DEFAULT_IDLE_RESET;
use super::region::{NormRect, RegionLayout};
use super::sorter::{DEFAULT_MAX_ROWS, DEFAULT_TOLERANCE_RATIO};
use super::stabilizer::DEFAULT_FRAME_LENGTH;
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// 连续多少帧内容相同才算稳定
    pub frame_length: usize,
    /// 多少秒识别不到底牌后重置
    pub idle_reset_secs: f64,
    /// 检测间隔（秒）
    pub cycle_interval_secs: f64,
    pub max_rows: usize,
    pub row_tolerance_ratio: f32,
    /// 为 true 时，没有底牌检测的帧不进入去抖窗口
    pub require_extra_for_fold: bool,
}

pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_millis(150);
/// 检测间隔上限，定时线程每次最多休眠这么久
pub const MAX_CYCLE_INTERVAL: Duration = Duration::from_secs(60);

/// 秒数转 Duration；非正数、NaN、无穷大或超出 Duration 范围时返回 None
pub fn duration_from_secs(secs: f64) -> Option<Duration> {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frame_length: DEFAULT_FRAME_LENGTH,
            idle_reset_secs: DEFAULT_IDLE_RESET.as_secs_f64(),
            cycle_interval_secs: DEFAULT_CYCLE_INTERVAL.as_secs_f64(),
            max_rows: DEFAULT_MAX_ROWS,
            row_tolerance_ratio: DEFAULT_TOLERANCE_RATIO,
            require_extra_for_fold: false,
        }
    }
}

impl TrackerConfig {
    pub fn idle_reset(&self) -> Duration {
        duration_from_secs(self.idle_reset_secs).unwrap_or(DEFAULT_IDLE_RESET)
    }

    pub fn cycle_interval(&self) -> Duration {
        duration_from_secs(self.cycle_interval_secs)
            .map_or(DEFAULT_CYCLE_INTERVAL, |d| d.min(MAX_CYCLE_INTERVAL))
    }

    /// 修正越界参数
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.frame_length == 0 {
            warn!("⚠️ frame_length 不能为 0，使用 1");
            self.frame_length = 1;
        }
        if duration_from_secs(self.idle_reset_secs).is_none() {
            warn!(
                "⚠️ idle_reset_secs 无效 ({})，使用默认值 {}",
                self.idle_reset_secs, defaults.idle_reset_secs
            );
            self.idle_reset_secs = defaults.idle_reset_secs;
        }
        if duration_from_secs(self.cycle_interval_secs).is_none() {
            warn!(
                "⚠️ cycle_interval_secs 无效 ({})，使用默认值 {}",
                self.cycle_interval_secs, defaults.cycle_interval_secs
            );
            self.cycle_interval_secs = defaults.cycle_interval_secs;
        } else if self.cycle_interval_secs > MAX_CYCLE_INTERVAL.as_secs_f64() {
            warn!(
                "⚠️ cycle_interval_secs 过大 ({})，限制为 {}",
                self.cycle_interval_secs,
                MAX_CYCLE_INTERVAL.as_secs_f64()
            );
            self.cycle_interval_secs = MAX_CYCLE_INTERVAL.as_secs_f64();
        }
        if !self.row_tolerance_ratio.is_finite() || self.row_tolerance_ratio <= 0.0 {
            warn!(
                "⚠️ row_tolerance_ratio 无效 ({})，使用默认值 {}",
                self.row_tolerance_ratio, defaults.row_tolerance_ratio
            );
            self.row_tolerance_ratio = defaults.row_tolerance_ratio;
        }
        self
    }
}

/// 某个软件的窗口布局
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPreset {
    pub name: String,
    #[serde(default)]
    pub window_title: Option<String>,
    pub layout: RegionLayout,
}

/// 有序的布局预设列表，第一项为默认布局
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutPresets {
    presets: Vec<LayoutPreset>,
}

impl LayoutPresets {
    pub fn new(presets: Vec<LayoutPreset>) -> Result<Self, TrackerError> {
        for preset in &presets {
            preset.layout.validate()?;
        }
        Ok(Self { presets })
    }

    /// 内置的 JJ斗地主（带控件）布局
    pub fn builtin() -> Self {
        Self {
            presets: vec![LayoutPreset {
                name: "JJ斗地主".to_string(),
                window_title: Some("JJ斗地主".to_string()),
                layout: RegionLayout {
                    self_hand: NormRect::new(0.04, 0.70, 0.96, 0.85),
                    self_played: NormRect::new(0.04, 0.50, 0.96, 0.60),
                    opponent_left: NormRect::new(0.20, 0.32, 0.455, 0.49),
                    opponent_right: NormRect::new(0.46, 0.32, 0.80, 0.49),
                    landlord_extra: NormRect::new(0.35, 0.08, 0.45, 0.15),
                },
            }],
        }
    }

    pub fn presets(&self) -> &[LayoutPreset] {
        &self.presets
    }

    pub fn names(&self) -> Vec<String> {
        self.presets.iter().map(|p| p.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&LayoutPreset> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// 按名称查找布局，找不到（或未指定）时退回第一项
    pub fn resolve(&self, name: Option<&str>) -> Result<&LayoutPreset, TrackerError> {
        let found = match name {
            Some(name) => self
                .get(name)
                .ok_or_else(|| TrackerError::LayoutMissing(name.to_string())),
            None => Err(TrackerError::LayoutMissing("<未指定>".to_string())),
        };

        match found {
            Ok(preset) => Ok(preset),
            Err(e) => {
                let fallback = self.presets.first().ok_or(TrackerError::NoLayouts)?;
                if name.is_some() {
                    warn!("⚠️ {}，使用默认配置: {}", e, fallback.name);
                }
                Ok(fallback)
            }
        }
    }
}

/// 完整配置文件
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub tracker: TrackerConfig,
    pub layout: Option<String>,
    pub presets: Vec<LayoutPreset>,
}

impl TrackerSettings {
    pub fn from_json5(text: &str) -> Result<Self, TrackerError> {
        let mut settings: TrackerSettings =
            json5::from_str(text).map_err(|e| TrackerError::Settings(e.to_string()))?;
        settings.tracker = settings.tracker.validated();
        Ok(settings)
    }

    /// 未配置任何预设时使用内置布局
    pub fn layout_presets(&self) -> Result<LayoutPresets, TrackerError> {
        if self.presets.is_empty() {
            Ok(LayoutPresets::builtin())
        } else {
            LayoutPresets::new(self.presets.clone())
        }
    }
}
