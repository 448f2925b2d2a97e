//! 状态轮询 - 业务能力层
//!
//! 远端任务是异步的，从几秒到几小时不等。单次查询非 200 一律
//! 视为可重试；重试用有界指数退避，整体受每任务超时约束。
//! `num_failed_shards` 非零不是本模块的错误，由失败检测器消费。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::clients::DetectionApiClient;
use crate::error::{OrchestratorError, Result};
use crate::models::{TaskId, TaskStatusRecord};

/// 指数退避策略
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: usize,
}

impl BackoffPolicy {
    /// 第 attempt 次重试前应等待的时长（attempt 从 0 开始）
    fn delay_for(&self, attempt: usize) -> Duration {
        let exp = self
            .initial_delay
            .saturating_mul(1u32 << attempt.min(16) as u32);
        exp.min(self.max_delay)
    }
}

/// 状态轮询器
pub struct StatusPoller {
    api: Arc<dyn DetectionApiClient>,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn DetectionApiClient>) -> Self {
        Self { api }
    }

    /// 单次查询任务状态
    ///
    /// 非 200 响应报 StatusFetch（可重试），绝不静默忽略
    pub async fn fetch(&self, task_id: &TaskId) -> Result<TaskStatusRecord> {
        let (status_code, body) = self.api.fetch_task_status(task_id).await?;
        if status_code != 200 {
            return Err(OrchestratorError::status_fetch(
                task_id,
                format!("状态码 {}", status_code),
            ));
        }
        Ok(TaskStatusRecord::from_response(task_id.clone(), body))
    }

    /// 带退避重试的状态查询
    ///
    /// 只重试传输类错误；其他错误立即上抛
    pub async fn fetch_with_backoff(
        &self,
        task_id: &TaskId,
        policy: &BackoffPolicy,
    ) -> Result<TaskStatusRecord> {
        let mut attempt = 0;
        loop {
            match self.fetch(task_id).await {
                Ok(record) => return Ok(record),
                Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        "任务 {} 状态查询失败 (尝试 {}/{}), {}s 后重试: {}",
                        task_id,
                        attempt + 1,
                        policy.max_attempts,
                        delay.as_secs(),
                        e
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 轮询直到任务到达终态
    ///
    /// 超过整体截止时间报 StatusFetch（调用方可选择放弃或重来）
    pub async fn wait_for_completion(
        &self,
        task_id: &TaskId,
        poll_interval: Duration,
        overall_timeout: Duration,
        policy: &BackoffPolicy,
    ) -> Result<TaskStatusRecord> {
        let deadline = Instant::now() + overall_timeout;
        loop {
            let record = self.fetch_with_backoff(task_id, policy).await?;
            if record.request_status.is_terminal() {
                return Ok(record);
            }
            debug!("任务 {} 仍在运行, {}s 后再次轮询", task_id, poll_interval.as_secs());

            if Instant::now() + poll_interval > deadline {
                return Err(OrchestratorError::status_fetch(
                    task_id,
                    format!("等待超时 ({}s)", overall_timeout.as_secs()),
                ));
            }
            sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_up_to_cap() {
        let policy = BackoffPolicy {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            max_attempts: 8,
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(16));
        assert_eq!(policy.delay_for(10), Duration::from_secs(60));
    }
}
