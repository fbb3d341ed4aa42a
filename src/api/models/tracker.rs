use crate::core::tracker::{
    BoundingBox, Detection, FrameRead, GamePhase, TrackerError, TrackerSnapshot,
};
use serde::{Deserialize, Serialize};

/// Dart 侧推理得到的单个检测框（像素坐标）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionInput {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub label: String,
}

impl From<DetectionInput> for Detection {
    fn from(input: DetectionInput) -> Self {
        Detection::new(
            BoundingBox::new(input.x1, input.y1, input.x2, input.y2),
            input.label,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankCount {
    pub rank: String,
    pub count: i32,
}

/// 界面显示用的记牌结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// awaiting_deal / hand_revealed / tracking
    pub phase: String,
    /// 按牌面大小排列
    pub remaining: Vec<RankCount>,
    pub left: Vec<Vec<String>>,
    #[serde(rename = "self")]
    pub own: Vec<Vec<String>>,
    pub right: Vec<Vec<String>>,
}

impl CounterSnapshot {
    pub fn from_snapshot(snapshot: &TrackerSnapshot) -> Self {
        Self {
            phase: phase_name(snapshot.phase).to_string(),
            remaining: snapshot
                .remaining
                .iter()
                .map(|(rank, &count)| RankCount {
                    rank: rank.token().to_string(),
                    count,
                })
                .collect(),
            left: plays_to_tokens(&snapshot.left),
            own: plays_to_tokens(&snapshot.own),
            right: plays_to_tokens(&snapshot.right),
        }
    }

    pub fn to_json(&self) -> Result<String, TrackerError> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn phase_name(phase: GamePhase) -> &'static str {
    match phase {
        GamePhase::AwaitingDeal => "awaiting_deal",
        GamePhase::HandRevealed => "hand_revealed",
        GamePhase::Tracking => "tracking",
    }
}

fn plays_to_tokens(plays: &[FrameRead]) -> Vec<Vec<String>> {
    plays
        .iter()
        .map(|p| p.ranks().iter().map(|r| r.token().to_string()).collect())
        .collect()
}

/// 一手牌的显示文本，大小王显示为扑克符号
pub fn format_play(play: &FrameRead) -> String {
    play.ranks().iter().map(|r| r.glyph()).collect()
}

/// 一个座位全部出牌的显示文本，每手之间用五个空格分隔
pub fn format_history(plays: &[FrameRead]) -> String {
    plays.iter().map(|p| format_play(p) + "     ").collect()
}
