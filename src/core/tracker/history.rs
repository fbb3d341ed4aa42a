use super::stabilizer::FrameRead;
use serde::{Deserialize, Serialize};

/// 记录出牌的三个座位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    Left,
    /// 自己
    Own,
    Right,
}

/// 每个座位的出牌记录，只追加
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayHistory {
    left: Vec<FrameRead>,
    own: Vec<FrameRead>,
    right: Vec<FrameRead>,
}

impl PlayHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn seat_mut(&mut self, seat: Seat) -> &mut Vec<FrameRead> {
        match seat {
            Seat::Left => &mut self.left,
            Seat::Own => &mut self.own,
            Seat::Right => &mut self.right,
        }
    }

    pub fn plays(&self, seat: Seat) -> &[FrameRead] {
        match seat {
            Seat::Left => &self.left,
            Seat::Own => &self.own,
            Seat::Right => &self.right,
        }
    }

    pub fn last(&self, seat: Seat) -> Option<&FrameRead> {
        self.plays(seat).last()
    }

    /// 追加一手出牌，空牌不记录；返回是否追加
    pub fn record(&mut self, seat: Seat, read: FrameRead) -> bool {
        if read.is_empty() {
            return false;
        }
        self.seat_mut(seat).push(read);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.own.is_empty() && self.right.is_empty()
    }

    pub fn clear(&mut self) {
        self.left.clear();
        self.own.clear();
        self.right.clear();
    }
}
