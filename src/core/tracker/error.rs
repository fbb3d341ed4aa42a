use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("未知的检测标签: {0}")]
    UnknownLabel(String),
    #[error("检测器不可用: {0}")]
    DetectorUnavailable(String),
    #[error("布局配置不存在: {0}")]
    LayoutMissing(String),
    #[error("没有可用的布局配置")]
    NoLayouts,
    #[error("区域 {name} 坐标无效: {reason}")]
    InvalidRegion { name: String, reason: String },
    #[error("配置解析失败: {0}")]
    Settings(String),
    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}
