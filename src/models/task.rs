//! 远端任务相关类型
//!
//! `TaskGroup` 归属于 `TaskRegistry`，按文件夹分组、只增不删；
//! `TaskStatusRecord` 是瞬态数据，每次轮询都会刷新，不做持久化。

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{OrchestratorError, Result};

/// 远端任务标识
pub type TaskId = String;

/// 一个文件夹对应的任务组
///
/// 不变式：task_ids 只增不删；原始分块任务在前，重提任务追加在后。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGroup {
    pub folder_name: String,
    pub task_ids: Vec<TaskId>,
}

impl TaskGroup {
    pub fn new(folder_name: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            task_ids: Vec::new(),
        }
    }

    pub fn push(&mut self, task_id: TaskId) {
        self.task_ids.push(task_id);
    }

    pub fn len(&self) -> usize {
        self.task_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }
}

/// 远端任务的终态/运行态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Running,
    Completed,
    Failed,
    Problem,
    Unknown,
}

impl RequestStatus {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("running") => RequestStatus::Running,
            Some("completed") => RequestStatus::Completed,
            Some("failed") => RequestStatus::Failed,
            Some("problem") => RequestStatus::Problem,
            _ => RequestStatus::Unknown,
        }
    }

    /// 是否已到达终态（不再需要轮询）
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Failed | RequestStatus::Problem
        )
    }
}

/// 单次状态轮询得到的任务状态记录
#[derive(Debug, Clone)]
pub struct TaskStatusRecord {
    pub task_id: TaskId,
    /// 远端返回的原始状态体
    pub raw_status: Value,
    pub request_status: RequestStatus,
    pub num_failed_shards: u64,
    /// 输出文件 URL，按类型索引（如 "detections"）
    pub output_file_urls: HashMap<String, String>,
}

impl TaskStatusRecord {
    /// 从状态端点返回的 JSON 体构建记录
    ///
    /// 期望的最小结构：
    /// `{status: {request_status, message: {num_failed_shards}}, output_file_urls: {...}}`
    pub fn from_response(task_id: TaskId, body: Value) -> Self {
        let request_status = RequestStatus::parse(
            body.pointer("/status/request_status")
                .and_then(|v| v.as_str()),
        );
        let num_failed_shards = body
            .pointer("/status/message/num_failed_shards")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let output_file_urls = body
            .get("output_file_urls")
            .and_then(|v| v.as_object())
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            task_id,
            raw_status: body,
            request_status,
            num_failed_shards,
            output_file_urls,
        }
    }

    /// 取 detections 输出 URL；任务已完成却没有该项时视为归属损坏
    pub fn detections_url(&self) -> Result<&str> {
        self.output_file_urls
            .get("detections")
            .map(|s| s.as_str())
            .ok_or_else(|| OrchestratorError::Consistency {
                task_id: self.task_id.clone(),
                filename: "<missing detections url>".to_string(),
                folder: String::new(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_status_body() {
        let body = json!({
            "status": {
                "request_status": "completed",
                "message": {"num_failed_shards": 2}
            },
            "output_file_urls": {
                "detections": "https://x/y/chunk0.json",
                "failed_images": "https://x/y/failed.json"
            }
        });
        let record = TaskStatusRecord::from_response("7618".to_string(), body);
        assert_eq!(record.request_status, RequestStatus::Completed);
        assert_eq!(record.num_failed_shards, 2);
        assert_eq!(
            record.detections_url().unwrap(),
            "https://x/y/chunk0.json"
        );
    }

    #[test]
    fn missing_fields_default_safely() {
        let record = TaskStatusRecord::from_response("1".to_string(), json!({}));
        assert_eq!(record.request_status, RequestStatus::Unknown);
        assert_eq!(record.num_failed_shards, 0);
        assert!(record.detections_url().is_err());
    }
}
