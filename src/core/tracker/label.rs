//! 检测标签 → 牌面点数

use super::error::TrackerError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 牌面点数，按斗地主大小排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    /// 小王
    #[serde(rename = "jok")]
    LittleJoker,
    /// 大王
    #[serde(rename = "JOK")]
    BigJoker,
}

impl Rank {
    pub const ALL: [Rank; 15] = [
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
        Rank::Two,
        Rank::LittleJoker,
        Rank::BigJoker,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::LittleJoker => "jok",
            Rank::BigJoker => "JOK",
        }
    }

    pub fn from_token(token: &str) -> Option<Rank> {
        Rank::ALL.iter().copied().find(|r| r.token() == token)
    }

    /// 一副牌中该点数的张数
    pub fn deck_count(self) -> i32 {
        match self {
            Rank::LittleJoker | Rank::BigJoker => 1,
            _ => 4,
        }
    }

    /// 界面显示用字符，大小王用扑克符号
    pub fn glyph(self) -> &'static str {
        match self {
            Rank::LittleJoker => "🃟",
            Rank::BigJoker => "🃏",
            other => other.token(),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// 检测模型类别名 → 点数
static LABEL_TABLE: Lazy<HashMap<&'static str, Rank>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert("two", Rank::Two);
    table.insert("three", Rank::Three);
    table.insert("four", Rank::Four);
    table.insert("five", Rank::Five);
    table.insert("six", Rank::Six);
    table.insert("seven", Rank::Seven);
    table.insert("eight", Rank::Eight);
    table.insert("nine", Rank::Nine);
    table.insert("ten", Rank::Ten);
    table.insert("J", Rank::Jack);
    table.insert("Q", Rank::Queen);
    table.insert("K", Rank::King);
    table.insert("A", Rank::Ace);
    table.insert("joker", Rank::LittleJoker);
    table.insert("JOKER", Rank::BigJoker);
    table
});

/// 将检测器输出的原始标签翻译为点数
///
/// 同时接受规范点数写法（"3"、"jok" 等），便于上游直接输出点数。
pub fn translate_label(raw: &str) -> Result<Rank, TrackerError> {
    LABEL_TABLE
        .get(raw)
        .copied()
        .or_else(|| Rank::from_token(raw))
        .ok_or_else(|| TrackerError::UnknownLabel(raw.to_string()))
}
