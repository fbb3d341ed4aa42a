//! 斗地主记牌器 - 把每轮带噪声的检测框整理成稳定的牌局状态
//!
//! 处理流程：
//! 1. 标签翻译 - 检测模型类别名 → 牌面点数
//! 2. 区域划分 - 按中心点归入五个桌面区域，区域内按行排序
//! 3. 多帧去抖 - 连续 frame_length 帧相同才算稳定
//! 4. 阶段状态机 - 等待发牌 → 底牌已亮 → 记牌中
//! 5. 剩余牌扣减 + 各座位出牌记录
//! 6. 长时间无底牌自动重置

pub mod config;
pub mod detector;
pub mod error;
pub mod history;
pub mod idle;
pub mod label;
pub mod ledger;
pub mod pipeline;
pub mod region;
pub mod sorter;
pub mod stabilizer;
pub mod state_machine;
pub mod worker;

pub use config::{LayoutPreset, LayoutPresets, TrackerConfig, TrackerSettings};
pub use detector::{BoundingBox, Card, CardDetector, Detection, DetectorOutput, MockCardDetector};
pub use error::TrackerError;
pub use history::{PlayHistory, Seat};
pub use idle::IdleResetter;
pub use label::{translate_label, Rank};
pub use ledger::InventoryLedger;
pub use pipeline::{CardTracker, TrackerSnapshot};
pub use region::{NormRect, RegionKind, RegionLayout, RegionMapper};
pub use sorter::sort_rowwise;
pub use stabilizer::{FrameRead, FrameStabilizer};
pub use state_machine::{GamePhase, PhaseAction, PhaseMachine};
pub use worker::{TickerHandle, TrackerWorker};
