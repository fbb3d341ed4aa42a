use super::label::Rank;
use super::region::RegionKind;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

pub const DEFAULT_FRAME_LENGTH: usize = 3;

/// 单个区域在一轮中的识别结果（已排序的点数序列）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameRead(Vec<Rank>);

impl FrameRead {
    pub fn new(ranks: Vec<Rank>) -> Self {
        Self(ranks)
    }

    pub fn ranks(&self) -> &[Rank] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<Rank>> for FrameRead {
    fn from(ranks: Vec<Rank>) -> Self {
        Self(ranks)
    }
}

/// 多帧去抖：每个区域保存最近 `frame_length` 帧，全部相同才算稳定
pub struct FrameStabilizer {
    frame_length: usize,
    windows: BTreeMap<RegionKind, VecDeque<FrameRead>>,
}

impl FrameStabilizer {
    pub fn new(frame_length: usize) -> Self {
        let frame_length = frame_length.max(1);
        Self {
            frame_length,
            windows: RegionKind::ALL
                .iter()
                .map(|&k| (k, VecDeque::with_capacity(frame_length)))
                .collect(),
        }
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn push(&mut self, region: RegionKind, read: FrameRead) {
        let frame_length = self.frame_length;
        let window = self.windows.entry(region).or_default();
        while window.len() >= frame_length {
            window.pop_front();
        }
        window.push_back(read);
    }

    pub fn is_stable(&self, region: RegionKind) -> bool {
        let Some(window) = self.windows.get(&region) else {
            return false;
        };
        if window.len() != self.frame_length {
            return false;
        }
        match window.back() {
            Some(latest) if !latest.is_empty() => window.iter().all(|r| r == latest),
            _ => false,
        }
    }

    pub fn stable_read(&self, region: RegionKind) -> Option<&FrameRead> {
        if self.is_stable(region) {
            self.latest(region)
        } else {
            None
        }
    }

    pub fn latest(&self, region: RegionKind) -> Option<&FrameRead> {
        self.windows.get(&region).and_then(|w| w.back())
    }

    pub fn window_len(&self, region: RegionKind) -> usize {
        self.windows.get(&region).map_or(0, |w| w.len())
    }

    /// 热更新帧数，丢弃超出的最旧帧
    pub fn set_frame_length(&mut self, frame_length: usize) {
        let frame_length = frame_length.max(1);
        debug!("🔧 frame_length: {} -> {}", self.frame_length, frame_length);
        self.frame_length = frame_length;
        for window in self.windows.values_mut() {
            while window.len() > frame_length {
                window.pop_front();
            }
        }
    }

    pub fn clear(&mut self) {
        for window in self.windows.values_mut() {
            window.clear();
        }
    }
}

impl Default for FrameStabilizer {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_LENGTH)
    }
}
