//! 结果收集 - 业务能力层
//!
//! 把已完成任务的 detections 输出下载到本地原始输出目录，
//! 文件名由 URL 派生。只有完整传输后才登记 ResultFile。

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::clients::StorageClient;
use crate::error::{OrchestratorError, Result};
use crate::models::{DetectionImage, ResultFile, ResultPayload, TaskId};
use crate::services::resubmission::url_to_filename;

/// 结果收集器
pub struct ResultCollector {
    storage: Arc<dyn StorageClient>,
    raw_output_dir: PathBuf,
}

impl ResultCollector {
    pub fn new(storage: Arc<dyn StorageClient>, raw_output_dir: PathBuf) -> Self {
        Self {
            storage,
            raw_output_dir,
        }
    }

    /// 下载任务的 detections 输出，返回登记好的 ResultFile
    pub async fn collect(&self, task_id: &TaskId, detections_url: &str) -> Result<ResultFile> {
        let filename = url_to_filename(detections_url)?;
        let path = self.raw_output_dir.join(&filename);

        self.storage.download(detections_url, &path).await?;
        info!("任务 {} 的结果已下载: {}", task_id, path.display());

        Ok(ResultFile {
            task_id: task_id.clone(),
            path,
        })
    }

    /// 读取结果文件里的图片列表
    pub async fn read_images(&self, result_file: &ResultFile) -> Result<Vec<DetectionImage>> {
        let bytes = tokio::fs::read(&result_file.path)
            .await
            .map_err(|e| OrchestratorError::file(result_file.path.display().to_string(), e))?;
        let payload: ResultPayload = serde_json::from_slice(&bytes)?;
        Ok(payload.images)
    }
}
