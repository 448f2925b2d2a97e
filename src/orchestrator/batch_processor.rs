//! 批量文件夹处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量文件夹的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、创建输出目录、构建 HTTP 客户端
//! 2. **清单构建**：为每个文件夹枚举图片清单
//! 3. **并发控制**：使用 Semaphore 限制同时处理的文件夹数
//! 4. **资源管理**：唯一持有存储/检测客户端与任务注册表
//! 5. **全局统计**：汇总所有文件夹的处理结果与重提次数
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个文件夹的细节
//! - **状态集中**：任务注册表是唯一的跨文件夹共享状态
//! - **向下委托**：委托 folder_processor 处理单个文件夹

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::{
    DetectionApiClient, HttpDetectionClient, HttpStorageClient, StorageClient,
};
use crate::config::Config;
use crate::orchestrator::folder_processor;
use crate::services::{ManifestBuilder, TaskRegistry};
use crate::utils::logging;
use crate::workflow::FolderCtx;

/// 应用主结构
pub struct App {
    config: Config,
    storage: Arc<dyn StorageClient>,
    api: Arc<dyn DetectionApiClient>,
    registry: Arc<TaskRegistry>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        // 创建本地输出目录
        for dir in [
            config.job_output_dir(),
            config.raw_api_output_dir(),
            config.combined_api_output_dir(),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }

        let storage: Arc<dyn StorageClient> = Arc::new(HttpStorageClient::new(
            config.read_base_url.clone(),
            config.read_sas_token.clone(),
            config.write_sas_token.clone(),
        ));
        let api: Arc<dyn DetectionApiClient> = Arc::new(HttpDetectionClient::new(
            config.submission_endpoint_url.clone(),
            config.task_status_endpoint_url.clone(),
        ));

        Ok(Self {
            config,
            storage,
            api,
            registry: Arc::new(TaskRegistry::new()),
        })
    }

    /// 测试等场景下注入自定义协作方
    pub fn with_clients(
        config: Config,
        storage: Arc<dyn StorageClient>,
        api: Arc<dyn DetectionApiClient>,
    ) -> Self {
        Self {
            config,
            storage,
            api,
            registry: Arc::new(TaskRegistry::new()),
        }
    }

    /// 全局任务注册表
    pub fn registry(&self) -> Arc<TaskRegistry> {
        self.registry.clone()
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        if self.config.folder_names.is_empty() {
            warn!("⚠️ 没有配置任何文件夹，程序结束");
            return Ok(ProcessingStats::default());
        }

        // 为每个文件夹构建清单
        let contexts = self.build_manifests().await?;

        let total_images: usize = contexts.iter().map(|c| c.manifest.len()).sum();
        logging::log_manifests_built(contexts.len(), total_images);

        // 处理所有文件夹
        let stats = self.process_all_folders(contexts).await?;

        // 输出最终统计
        logging::print_final_stats(&stats);

        Ok(stats)
    }

    /// 为配置中的每个文件夹枚举图片清单
    async fn build_manifests(&self) -> Result<Vec<FolderCtx>> {
        info!("\n📁 正在枚举各文件夹的图片...");
        let builder = ManifestBuilder::new(self.storage.clone());
        let output_dir = self.config.job_output_dir();

        let mut contexts = Vec::new();
        for (index, folder_name) in self.config.folder_names.iter().enumerate() {
            let prefix = format!("{}{}", self.config.container_prefix, folder_name);
            let manifest = builder.build(folder_name, &prefix, true).await?;
            builder.save_manifest_file(&manifest, &output_dir).await?;
            contexts.push(FolderCtx::new(index + 1, folder_name, manifest));
        }
        Ok(contexts)
    }

    /// 并发处理所有文件夹
    async fn process_all_folders(&self, contexts: Vec<FolderCtx>) -> Result<ProcessingStats> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_folders));
        let mut stats = ProcessingStats {
            total: contexts.len(),
            ..Default::default()
        };

        let mut handles = Vec::new();
        for ctx in contexts {
            let permit = semaphore.clone().acquire_owned().await?;
            let storage = self.storage.clone();
            let api = self.api.clone();
            let registry = self.registry.clone();
            let config = self.config.clone();
            let folder_index = ctx.folder_index;

            let handle = tokio::spawn(async move {
                let _permit = permit;
                folder_processor::process_folder(storage, api, registry, ctx, &config).await
            });
            handles.push((folder_index, handle));
        }

        for (folder_index, handle) in handles {
            match handle.await {
                Ok(Ok(outcome)) => {
                    stats.success += 1;
                    stats.resubmissions += outcome.n_resubmissions;
                }
                Ok(Err(e)) => {
                    error!("[文件夹 {}] ❌ 处理过程中发生错误: {}", folder_index, e);
                    stats.failed += 1;
                }
                Err(e) => {
                    error!("[文件夹 {}] 任务执行失败: {}", folder_index, e);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}

/// 处理统计
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
    pub resubmissions: usize,
}
