//! 单个文件夹处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责驱动单个文件夹的完整管线，是文件夹级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **流程调度**：创建并运行 `FolderFlow`
//! 2. **统计输出**：记录任务数、重提数和合并结果规模
//! 3. **错误上报**：可重试错误与致命错误都交由上层统计

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::clients::{DetectionApiClient, StorageClient};
use crate::config::Config;
use crate::services::TaskRegistry;
use crate::workflow::{FolderCtx, FolderFlow, FolderOutcome};

/// 处理单个文件夹
///
/// # 参数
/// - `storage` / `api`: 外部协作方
/// - `registry`: 全局任务注册表
/// - `ctx`: 文件夹上下文（清单已构建好）
/// - `config`: 配置
///
/// # 返回
/// 返回文件夹处理结果
pub async fn process_folder(
    storage: Arc<dyn StorageClient>,
    api: Arc<dyn DetectionApiClient>,
    registry: Arc<TaskRegistry>,
    ctx: FolderCtx,
    config: &Config,
) -> Result<FolderOutcome> {
    log_folder_start(&ctx);

    let flow = FolderFlow::new(storage, api, registry, config);
    let outcome = flow.run(&ctx).await?;

    log_folder_complete(&ctx, &outcome);
    Ok(outcome)
}

// ========== 日志辅助函数 ==========

fn log_folder_start(ctx: &FolderCtx) {
    info!("[文件夹 {}] 开始处理", ctx.folder_index);
    info!("[文件夹 {}] 名称: {}", ctx.folder_index, ctx.folder_name);
    info!(
        "[文件夹 {}] 图片总数: {}",
        ctx.folder_index,
        ctx.manifest.len()
    );
}

fn log_folder_complete(ctx: &FolderCtx, outcome: &FolderOutcome) {
    info!(
        "[文件夹 {}] 任务统计: 任务 {}, 重提 {}, 合并图片 {}",
        ctx.folder_index,
        outcome.n_tasks,
        outcome.n_resubmissions,
        outcome.combined.images.len()
    );
    if outcome.n_resubmissions == 0 {
        info!("[文件夹 {}] 无需重提", ctx.folder_index);
    } else {
        warn!(
            "[文件夹 {}] ⚠️ 本文件夹发生了 {} 次重提",
            ctx.folder_index, outcome.n_resubmissions
        );
    }
    info!("\n[文件夹 {}] ✅ 文件夹处理完成\n", ctx.folder_index);
}
