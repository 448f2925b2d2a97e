//! 结果文件与合并结果
//!
//! `ResultFile` 由结果收集器产出、合并器一次性消费；
//! `CombinedResult` 是派生实体，可随时由结果文件重新计算。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::task::TaskId;

/// 单张图片的检测结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionImage {
    /// 图片标识（请求清单中的路径）
    pub file: String,
    /// 检测框列表
    #[serde(default)]
    pub detections: Value,
    /// 远端附带的其他字段原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 结果文件的持久化格式：`{"images": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultPayload {
    pub images: Vec<DetectionImage>,
    /// info/detection_categories 等附加字段原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 已下载到本地的结果文件，按任务标识索引
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFile {
    pub task_id: TaskId,
    pub path: PathBuf,
}

/// 一个文件夹的合并结果
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedResult {
    pub folder_name: String,
    /// 按图片标识合并后的检测结果，保持确定性顺序
    pub images: Vec<DetectionImage>,
}

impl CombinedResult {
    /// 序列化为持久化格式（与单个结果文件相同的结构）
    pub fn to_json_bytes(&self) -> crate::error::Result<Vec<u8>> {
        let payload = ResultPayload {
            images: self.images.clone(),
            extra: Map::new(),
        };
        Ok(serde_json::to_vec_pretty(&payload)?)
    }

    /// 合并结果中的图片标识集合
    pub fn image_set(&self) -> std::collections::HashSet<&str> {
        self.images.iter().map(|im| im.file.as_str()).collect()
    }
}
