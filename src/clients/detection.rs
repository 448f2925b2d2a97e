//! 检测 API 协作方
//!
//! 提交不幂等：每次调用都可能在远端创建新任务，调用方必须先查
//! 任务注册表再提交。状态查询是只读操作，非 200 一律视为可重试。

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{OrchestratorError, Result};
use crate::models::{JobRequest, TaskId};

/// 检测 API 协作方契约
#[async_trait]
pub trait DetectionApiClient: Send + Sync {
    /// 提交任务，返回远端任务标识
    async fn submit(&self, request: &JobRequest) -> Result<TaskId>;

    /// 查询任务状态，返回 (HTTP 状态码, JSON 体)
    async fn fetch_task_status(&self, task_id: &TaskId) -> Result<(u16, Value)>;
}

/// 基于 HTTP 的检测 API 客户端
pub struct HttpDetectionClient {
    client: reqwest::Client,
    submission_endpoint_url: String,
    task_status_endpoint_url: String,
}

impl HttpDetectionClient {
    pub fn new(
        submission_endpoint_url: impl Into<String>,
        task_status_endpoint_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            submission_endpoint_url: submission_endpoint_url.into(),
            task_status_endpoint_url: task_status_endpoint_url.into(),
        }
    }
}

#[async_trait]
impl DetectionApiClient for HttpDetectionClient {
    async fn submit(&self, request: &JobRequest) -> Result<TaskId> {
        debug!("提交任务: {}", request.job_name);

        let response = self
            .client
            .post(&self.submission_endpoint_url)
            .json(&request.to_payload())
            .send()
            .await
            .map_err(|e| OrchestratorError::submission(&request.job_name, e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| OrchestratorError::submission(&request.job_name, e.to_string()))?;

        if !status.is_success() {
            return Err(OrchestratorError::submission(
                &request.job_name,
                format!("状态码 {}: {}", status, body),
            ));
        }

        // 远端返回 {"request_id": ...}，数字或字符串都接受
        let task_id = match body.get("request_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(OrchestratorError::submission(
                    &request.job_name,
                    format!("响应缺少 request_id: {}", body),
                ))
            }
        };
        Ok(task_id)
    }

    async fn fetch_task_status(&self, task_id: &TaskId) -> Result<(u16, Value)> {
        let url = format!("{}/{}", self.task_status_endpoint_url, task_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OrchestratorError::status_fetch(task_id, e.to_string()))?;

        let status = response.status().as_u16();
        let body: Value = response
            .json()
            .await
            .map_err(|e| OrchestratorError::status_fetch(task_id, e.to_string()))?;
        Ok((status, body))
    }
}
