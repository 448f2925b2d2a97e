//! # Manage API Submission
//!
//! 一个面向批量检测 API 的任务提交与结果回收编排器：
//! 把大规模图片集切块提交给异步的远端检测服务，跟踪每个远端任务
//! 到完成，识别失败分片和缺失图片并按需重提，最后把各分块结果
//! 合并成按文件夹校验过的最终输出。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Clients）
//! - `clients/` - 外部协作方契约与 HTTP 实现
//! - `StorageClient` - 列表 / 上传 / 下载能力
//! - `DetectionApiClient` - 任务提交 / 状态查询能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个模块一个能力
//! - 清单构建、分块、任务名派生、任务注册表、状态轮询、
//!   失败检测与重提判定、结果收集、合并与校验
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文件夹"的完整处理流程
//! - `FolderCtx` - 上下文封装（文件夹与任务组的对应关系）
//! - `FolderFlow` - 状态机编排（分块 → 提交 → 轮询 → 重提 → 合并）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量文件夹处理器，管理资源和并发
//! - `orchestrator/folder_processor` - 单个文件夹处理器
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{DetectionApiClient, HttpDetectionClient, HttpStorageClient, StorageClient};
pub use config::Config;
pub use error::{OrchestratorError, Result};
pub use models::{
    Chunk, CombinedResult, DetectionImage, JobRequest, Manifest, ResultFile, TaskGroup, TaskId,
    TaskStatusRecord,
};
pub use orchestrator::{App, ProcessingStats};
pub use services::TaskRegistry;
pub use workflow::{FolderCtx, FolderFlow, FolderOutcome, GroupState};
