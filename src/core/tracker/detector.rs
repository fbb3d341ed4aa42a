use super::error::TrackerError;
use super::label::Rank;
use std::sync::atomic::{AtomicU64, Ordering};

/// 像素坐标框 (x1, y1, x2, y2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }
}

/// 检测器原始输出：框 + 模型标签
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label: String,
}

impl Detection {
    pub fn new(bbox: BoundingBox, label: impl Into<String>) -> Self {
        Self {
            bbox,
            label: label.into(),
        }
    }
}

/// 标签翻译后的单张牌
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Card {
    pub bbox: BoundingBox,
    pub rank: Rank,
}

/// 一次检测的结果，已经过检测器自身的置信度/IoU 过滤
#[derive(Debug, Clone, Default)]
pub struct DetectorOutput {
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
}

impl DetectorOutput {
    pub fn new(width: u32, height: u32, detections: Vec<Detection>) -> Self {
        Self {
            width,
            height,
            detections,
        }
    }
}

pub trait CardDetector: Send + Sync {
    /// 截图并识别一帧；失败时整轮按空帧处理
    fn detect(&self) -> Result<DetectorOutput, TrackerError>;
}

pub struct MockCardDetector {
    // 按轮次编号返回预设的检测结果
    pattern: Box<dyn Fn(u64) -> Option<DetectorOutput> + Send + Sync>,
    cycle: AtomicU64,
}

impl MockCardDetector {
    pub fn new() -> Self {
        Self::with_pattern(|_| None)
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u64) -> Option<DetectorOutput> + Send + Sync + 'static,
    {
        Self {
            pattern: Box::new(pattern),
            cycle: AtomicU64::new(0),
        }
    }

    /// 每轮都返回同一结果
    pub fn with_fixed_output(output: DetectorOutput) -> Self {
        Self::with_pattern(move |_| Some(output.clone()))
    }

    pub fn cycles(&self) -> u64 {
        self.cycle.load(Ordering::SeqCst)
    }
}

impl Default for MockCardDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CardDetector for MockCardDetector {
    fn detect(&self) -> Result<DetectorOutput, TrackerError> {
        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        (self.pattern)(cycle)
            .ok_or_else(|| TrackerError::DetectorUnavailable(format!("mock cycle {}", cycle)))
    }
}
