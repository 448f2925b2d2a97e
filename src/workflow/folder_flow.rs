//! 文件夹处理流程 - 流程层
//!
//! 核心职责：定义"一个文件夹"的完整处理流程（状态机）：
//!
//! `Chunked → Submitted → Polling → {Completed | ResubmissionPending} → Combined`
//!
//! 重提会带着新的合成分块重新进入 `Submitted`，回路由每任务的
//! 重提额度封顶。各文件夹之间只共享任务注册表，互不影响。

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::clients::{DetectionApiClient, StorageClient};
use crate::config::Config;
use crate::error::{OrchestratorError, Result};
use crate::models::{Chunk, CombinedResult, RequestStatus, ResultFile, TaskId};
use crate::services::{
    chunker, combiner, job_builder, resubmission, BackoffPolicy, JobRequestBuilder,
    ResultCollector, ResubmissionDecision, StatusPoller, TaskRegistry,
};
use crate::workflow::folder_ctx::FolderCtx;

/// 任务组状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Chunked,
    Submitted,
    Polling,
    ResubmissionPending,
    Completed,
    Combined,
}

/// 文件夹处理结果
#[derive(Debug)]
pub struct FolderOutcome {
    pub combined: CombinedResult,
    pub combined_path: std::path::PathBuf,
    /// 任务组最终包含的任务数（原始分块 + 重提）
    pub n_tasks: usize,
    pub n_resubmissions: usize,
}

/// 队列中等待轮询的任务
struct PendingTask {
    task_id: TaskId,
    /// 该任务请求的图片（按清单顺序）
    requested: Vec<String>,
    /// 第几轮重提（原始分块为 0）
    round: usize,
}

/// 文件夹处理流程
///
/// - 编排一个文件夹从分块到合并的完整生命周期
/// - 不持有全局资源，协作方以共享引用注入
pub struct FolderFlow {
    storage: Arc<dyn StorageClient>,
    api: Arc<dyn DetectionApiClient>,
    registry: Arc<TaskRegistry>,
    poller: StatusPoller,
    collector: ResultCollector,
    job_builder: JobRequestBuilder,
    config: Config,
}

impl FolderFlow {
    pub fn new(
        storage: Arc<dyn StorageClient>,
        api: Arc<dyn DetectionApiClient>,
        registry: Arc<TaskRegistry>,
        config: &Config,
    ) -> Self {
        let poller = StatusPoller::new(api.clone());
        let collector = ResultCollector::new(storage.clone(), config.raw_api_output_dir());
        let job_builder = JobRequestBuilder::new(
            registry.clone(),
            config.caller.clone(),
            format!("{}{}", config.read_base_url, config.read_sas_token),
            None,
        );
        Self {
            storage,
            api,
            registry,
            poller,
            collector,
            job_builder,
            config: config.clone(),
        }
    }

    fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial_delay: Duration::from_secs(self.config.status_retry_initial_delay_secs),
            max_delay: Duration::from_secs(self.config.status_retry_max_delay_secs),
            max_attempts: self.config.status_retry_max_attempts,
        }
    }

    /// 跑完一个文件夹的完整流程
    pub async fn run(&self, ctx: &FolderCtx) -> Result<FolderOutcome> {
        let folder = &ctx.folder_name;

        // ========== Chunked: 切分清单 ==========
        let chunks = chunker::divide_into_chunks(&ctx.manifest, self.config.max_images_per_chunk);
        self.registry.ensure_group(folder);
        self.log_state(ctx, GroupState::Chunked);
        info!(
            "[文件夹 {}] {} 张图片切成 {} 个分块",
            ctx.folder_index,
            ctx.manifest.len(),
            chunks.len()
        );

        // ========== Submitted: 上传分块清单并提交 ==========
        let mut pending: VecDeque<PendingTask> = VecDeque::new();
        for chunk in &chunks {
            let task_id = self.submit_chunk(ctx, chunk).await?;
            pending.push_back(PendingTask {
                task_id,
                requested: chunk.images.clone(),
                round: 0,
            });
        }
        self.log_state(ctx, GroupState::Submitted);

        // ========== Polling: 轮询、收集、按需重提 ==========
        self.log_state(ctx, GroupState::Polling);

        let mut result_files: HashMap<TaskId, ResultFile> = HashMap::new();
        let mut n_resubmissions = 0usize;

        while let Some(task) = pending.pop_front() {
            let record = self
                .poller
                .wait_for_completion(
                    &task.task_id,
                    Duration::from_secs(self.config.poll_interval_secs),
                    Duration::from_secs(self.config.poll_timeout_secs),
                    &self.backoff_policy(),
                )
                .await?;

            // 终态失败：没有可用输出，整个请求集视为缺失
            if record.request_status != RequestStatus::Completed {
                warn!(
                    "[文件夹 {}] 任务 {} 以 {:?} 结束",
                    ctx.folder_index, task.task_id, record.request_status
                );
                self.resubmit(ctx, &task, task.requested.clone(), &mut pending)
                    .await?;
                n_resubmissions += 1;
                self.log_state(ctx, GroupState::ResubmissionPending);
                continue;
            }

            // 下载结果并读出远端实际处理的图片集合
            let detections_url = record.detections_url()?.to_string();
            let result_file = self.collector.collect(&task.task_id, &detections_url).await?;
            let returned: HashSet<String> = self
                .collector
                .read_images(&result_file)
                .await?
                .into_iter()
                .map(|im| im.file)
                .collect();

            let decision = resubmission::evaluate(
                &record,
                folder,
                &task.requested,
                &returned,
                self.config.max_tolerable_missing_images,
            )?;
            result_files.insert(task.task_id.clone(), result_file);

            match decision {
                ResubmissionDecision::Complete => {}
                ResubmissionDecision::Resubmit(missing) => {
                    self.resubmit(ctx, &task, missing, &mut pending).await?;
                    n_resubmissions += 1;
                    self.log_state(ctx, GroupState::ResubmissionPending);
                }
            }
        }

        self.log_state(ctx, GroupState::Completed);

        // ========== Combined: 按任务组顺序合并并校验 ==========
        let group = self.registry.group(folder)?;
        let mut images_per_file = Vec::new();
        for task_id in &group.task_ids {
            if let Some(result_file) = result_files.get(task_id) {
                images_per_file.push(self.collector.read_images(result_file).await?);
            }
        }

        let combined = combiner::combine_images(folder, images_per_file)?;
        combiner::validate(
            &combined,
            &ctx.manifest,
            self.config.max_tolerable_missing_images,
        )?;
        let combined_path =
            combiner::write_combined(&combined, &self.config.combined_api_output_dir()).await?;

        self.log_state(ctx, GroupState::Combined);

        Ok(FolderOutcome {
            combined,
            combined_path,
            n_tasks: group.task_ids.len(),
            n_resubmissions,
        })
    }

    /// 上传分块清单、提交任务、登记任务组
    async fn submit_chunk(&self, ctx: &FolderCtx, chunk: &Chunk) -> Result<TaskId> {
        let job_name = job_builder::chunk_job_name(
            &self.config.job_set_name,
            &ctx.folder_name,
            chunk.index,
        );
        let remote_filename = format!(
            "{}_chunk{:03}.json",
            job_builder::clean_request_name(&ctx.folder_name),
            chunk.index
        );
        self.submit_manifest(ctx, &job_name, &remote_filename, chunk.to_json_bytes()?)
            .await
    }

    /// 为缺失图片构建并提交一个重提任务
    ///
    /// 额度用尽时报 Completeness
    async fn resubmit(
        &self,
        ctx: &FolderCtx,
        failed_task: &PendingTask,
        missing: Vec<String>,
        pending: &mut VecDeque<PendingTask>,
    ) -> Result<()> {
        if failed_task.round >= self.config.max_resubmissions_per_task {
            return Err(OrchestratorError::Completeness {
                folder: ctx.folder_name.clone(),
                missing: missing.len(),
                tolerance: self.config.max_tolerable_missing_images,
            });
        }

        let job_name = job_builder::resubmission_job_name(&ctx.folder_name, &failed_task.task_id);
        info!(
            "[文件夹 {}] 为任务 {} 重提 {} 张缺失图片: {}",
            ctx.folder_index,
            failed_task.task_id,
            missing.len(),
            job_name
        );

        let manifest_bytes = serde_json::to_vec(&missing)?;
        let task_id = self
            .submit_manifest(ctx, &job_name, &format!("{}.json", job_name), manifest_bytes)
            .await?;

        pending.push_back(PendingTask {
            task_id,
            requested: missing,
            round: failed_task.round + 1,
        });
        Ok(())
    }

    /// 公共提交路径：上传清单 → 构建请求 → 提交 → 登记
    ///
    /// 提交不幂等，先查注册表再提交，避免远端出现重复任务
    async fn submit_manifest(
        &self,
        ctx: &FolderCtx,
        job_name: &str,
        remote_filename: &str,
        manifest_bytes: Vec<u8>,
    ) -> Result<TaskId> {
        if self.registry.contains_job(job_name) {
            return Err(OrchestratorError::DuplicateJobName {
                job_name: job_name.to_string(),
            });
        }

        let remote_path = self.config.remote_input_path(remote_filename);
        info!(
            "[文件夹 {}] 任务 {}: 上传清单到 {}",
            ctx.folder_index, job_name, remote_path
        );
        self.storage.upload(&manifest_bytes, &remote_path).await?;

        let manifest_url = self.storage.read_url(&remote_path);
        let request = self.job_builder.build(job_name, &manifest_url)?;
        let task_id = self.api.submit(&request).await?;

        self.registry
            .register(job_name, task_id.clone(), &ctx.folder_name)?;
        info!(
            "[文件夹 {}] ✓ 任务 {} 已提交, 任务标识: {}",
            ctx.folder_index, job_name, task_id
        );
        Ok(task_id)
    }

    fn log_state(&self, ctx: &FolderCtx, state: GroupState) {
        if self.config.verbose_logging {
            info!("[文件夹 {}] 状态: {:?}", ctx.folder_index, state);
        }
    }
}
