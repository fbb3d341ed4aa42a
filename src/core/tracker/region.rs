//! 区域划分：按中心点把每张牌归入桌面上五个固定区域之一

use super::detector::Card;
use super::error::TrackerError;
use super::history::Seat;
use super::sorter::sort_rowwise;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 桌面区域，声明顺序即归属优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    SelfHand,
    SelfPlayed,
    OpponentLeft,
    OpponentRight,
    LandlordExtra,
}

impl RegionKind {
    pub const ALL: [RegionKind; 5] = [
        RegionKind::SelfHand,
        RegionKind::SelfPlayed,
        RegionKind::OpponentLeft,
        RegionKind::OpponentRight,
        RegionKind::LandlordExtra,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RegionKind::SelfHand => "self_hand",
            RegionKind::SelfPlayed => "self_played",
            RegionKind::OpponentLeft => "opponent_left",
            RegionKind::OpponentRight => "opponent_right",
            RegionKind::LandlordExtra => "landlord_extra",
        }
    }

    /// 出牌区对应的座位
    pub fn seat(self) -> Option<Seat> {
        match self {
            RegionKind::SelfPlayed => Some(Seat::Own),
            RegionKind::OpponentLeft => Some(Seat::Left),
            RegionKind::OpponentRight => Some(Seat::Right),
            RegionKind::SelfHand | RegionKind::LandlordExtra => None,
        }
    }

    /// 该区域稳定出牌后是否从剩余牌中扣除
    ///
    /// 自己出的牌在亮手牌时已经扣过，只有对手出牌区参与扣减。
    pub fn tracks_inventory(self) -> bool {
        matches!(self, RegionKind::OpponentLeft | RegionKind::OpponentRight)
    }
}

/// 归一化矩形 (x1, y1, x2, y2)，取值 0-1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl NormRect {
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn validate(&self, name: &str) -> Result<(), TrackerError> {
        let in_unit = [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| (0.0..=1.0).contains(v));
        if !in_unit {
            return Err(TrackerError::InvalidRegion {
                name: name.to_string(),
                reason: "坐标必须在 0-1 之间".to_string(),
            });
        }
        if self.x1 > self.x2 || self.y1 > self.y2 {
            return Err(TrackerError::InvalidRegion {
                name: name.to_string(),
                reason: "左上角必须在右下角之前".to_string(),
            });
        }
        Ok(())
    }

    fn to_pixels(self, width: u32, height: u32) -> PixelRect {
        let w = width as f32;
        let h = height as f32;
        PixelRect {
            x1: (self.x1 * w).floor(),
            y1: (self.y1 * h).floor(),
            x2: (self.x2 * w).floor(),
            y2: (self.y2 * h).floor(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PixelRect {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl PixelRect {
    fn contains(&self, x: f32, y: f32) -> bool {
        self.x1 <= x && x <= self.x2 && self.y1 <= y && y <= self.y2
    }
}

/// 一套软件布局的五个区域
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionLayout {
    #[serde(alias = "player_hand")]
    pub self_hand: NormRect,
    #[serde(alias = "player_played")]
    pub self_played: NormRect,
    pub opponent_left: NormRect,
    pub opponent_right: NormRect,
    #[serde(alias = "landlord_cards")]
    pub landlord_extra: NormRect,
}

impl RegionLayout {
    pub fn rect(&self, kind: RegionKind) -> NormRect {
        match kind {
            RegionKind::SelfHand => self.self_hand,
            RegionKind::SelfPlayed => self.self_played,
            RegionKind::OpponentLeft => self.opponent_left,
            RegionKind::OpponentRight => self.opponent_right,
            RegionKind::LandlordExtra => self.landlord_extra,
        }
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        RegionKind::ALL
            .iter()
            .try_for_each(|&kind| self.rect(kind).validate(kind.name()))
    }
}

/// 每个区域的牌，已按阅读顺序排好
pub type RegionBuckets = BTreeMap<RegionKind, Vec<Card>>;

#[derive(Debug, Clone)]
pub struct RegionMapper {
    layout: RegionLayout,
    max_rows: usize,
    tolerance_ratio: f32,
}

impl RegionMapper {
    pub fn new(layout: RegionLayout, max_rows: usize, tolerance_ratio: f32) -> Self {
        Self {
            layout,
            max_rows,
            tolerance_ratio,
        }
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    /// 按中心点归入第一个包含它的区域，不在任何区域内的直接丢弃（不排序）
    pub fn assign(&self, cards: Vec<Card>, width: u32, height: u32) -> RegionBuckets {
        let rects: Vec<(RegionKind, PixelRect)> = RegionKind::ALL
            .iter()
            .map(|&kind| (kind, self.layout.rect(kind).to_pixels(width, height)))
            .collect();

        let mut buckets: RegionBuckets = RegionKind::ALL.iter().map(|&k| (k, Vec::new())).collect();
        for card in cards {
            let (cx, cy) = card.bbox.center();
            if let Some((kind, _)) = rects.iter().find(|(_, r)| r.contains(cx, cy)) {
                if let Some(bucket) = buckets.get_mut(kind) {
                    bucket.push(card);
                }
            }
        }
        buckets
    }

    /// 归类并对每个区域做按行排序
    pub fn map_and_sort(&self, cards: Vec<Card>, width: u32, height: u32) -> RegionBuckets {
        let mut buckets = self.assign(cards, width, height);
        buckets.par_iter_mut().for_each(|(_, cards)| {
            *cards = sort_rowwise(std::mem::take(cards), self.max_rows, self.tolerance_ratio);
        });
        buckets
    }
}
