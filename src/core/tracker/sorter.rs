//! 按行排序：检测器输出按置信度排列，需要整理成从上到下、从左到右的阅读顺序
//!
//! 排序特征取每张牌的右上角 (x2, y1)：
//! 1. 按 top_y 升序粗排
//! 2. 行容差 tol = 中位高度 × ratio，与行锚点（行内 top_y 均值）差距不超过 tol 归为同一行
//! 3. 行数超过 max_rows 时，多余的行并入锚点最近的保留行
//! 4. 行内按 right_x 升序，行间按锚点升序拼接

use super::detector::Card;

pub const DEFAULT_MAX_ROWS: usize = 3;
pub const DEFAULT_TOLERANCE_RATIO: f32 = 0.55;

#[derive(Debug, Clone, Copy)]
struct Feature {
    top_y: f32,
    right_x: f32,
    idx: usize,
}

#[derive(Debug)]
struct Row {
    anchor_y: f32,
    items: Vec<Feature>,
}

impl Row {
    fn recompute_anchor(&mut self) {
        let sum: f32 = self.items.iter().map(|f| f.top_y).sum();
        self.anchor_y = sum / self.items.len() as f32;
    }
}

fn median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

/// 将同一区域的牌整理成阅读顺序；`max_rows == 0` 表示不限制行数
pub fn sort_rowwise(cards: Vec<Card>, max_rows: usize, tolerance_ratio: f32) -> Vec<Card> {
    if cards.is_empty() {
        return cards;
    }

    let mut heights: Vec<f32> = cards
        .iter()
        .map(|c| (c.bbox.y2 - c.bbox.y1).max(1.0))
        .collect();
    let tol = median(&mut heights) * tolerance_ratio;

    let mut feats: Vec<Feature> = cards
        .iter()
        .enumerate()
        .map(|(idx, c)| Feature {
            top_y: c.bbox.y1,
            right_x: c.bbox.x2,
            idx,
        })
        .collect();
    feats.sort_by(|a, b| a.top_y.total_cmp(&b.top_y));

    let mut rows: Vec<Row> = Vec::new();
    for feat in feats {
        match rows
            .iter_mut()
            .find(|row| (feat.top_y - row.anchor_y).abs() <= tol)
        {
            Some(row) => {
                row.items.push(feat);
                let n = row.items.len() as f32;
                row.anchor_y = (row.anchor_y * (n - 1.0) + feat.top_y) / n;
            }
            None => rows.push(Row {
                anchor_y: feat.top_y,
                items: vec![feat],
            }),
        }
    }
    rows.sort_by(|a, b| a.anchor_y.total_cmp(&b.anchor_y));

    if max_rows > 0 && rows.len() > max_rows {
        let extra = rows.split_off(max_rows);
        for er in extra {
            // 距离相同时取排序靠前的行
            let nearest = rows.iter_mut().min_by(|a, b| {
                (er.anchor_y - a.anchor_y)
                    .abs()
                    .total_cmp(&(er.anchor_y - b.anchor_y).abs())
            });
            if let Some(target) = nearest {
                target.items.extend(er.items);
                target.recompute_anchor();
            }
        }
        rows.sort_by(|a, b| a.anchor_y.total_cmp(&b.anchor_y));
    }

    let mut order = Vec::with_capacity(cards.len());
    for row in rows.iter_mut() {
        row.items.sort_by(|a, b| a.right_x.total_cmp(&b.right_x));
        order.extend(row.items.iter().map(|f| f.idx));
    }

    order.into_iter().map(|i| cards[i]).collect()
}
