//! 错误类型定义
//!
//! 错误分两类处理：
//! - 传输类错误（状态查询、下载）：可由调用方带退避重试
//! - 数据一致性错误（任务归属错乱、重复图片、多余图片、不安全路径）：
//!   永不重试，直接上报给操作者

use thiserror::Error;

/// 编排器错误类型
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// 枚举图片列表失败（列表操作出错或结果为空）
    #[error("枚举图片失败 (前缀: {prefix}): {reason}")]
    Enumeration { prefix: String, reason: String },

    /// 任务名重复（同一任务集内任务名必须全局唯一）
    #[error("任务名重复: {job_name}")]
    DuplicateJobName { job_name: String },

    /// 文件夹从未被分块提交过
    #[error("未知文件夹: {folder}")]
    UnknownFolder { folder: String },

    /// 状态查询失败（可重试）
    #[error("查询任务 {task_id} 状态失败: {reason}")]
    StatusFetch { task_id: String, reason: String },

    /// 任务提交失败（提交不幂等，不做自动重试）
    #[error("提交任务 {job_name} 失败: {reason}")]
    Submission { job_name: String, reason: String },

    /// 任务与文件夹的归属关系损坏（致命）
    #[error("一致性错误: 任务 {task_id} 的输出文件 {filename} 与文件夹 {folder} 不匹配")]
    Consistency {
        task_id: String,
        filename: String,
        folder: String,
    },

    /// 解码后的路径不安全（致命，防止编码分隔符注入）
    #[error("不安全的路径: {url}")]
    UnsafePath { url: String },

    /// 下载失败（可重试）
    #[error("下载失败 ({url}): {reason}")]
    Download { url: String, reason: String },

    /// 合并冲突：同一图片出现在同组的多个结果文件中（致命）
    #[error("图片重复: {image} 在文件夹 {folder} 的多个结果文件中出现")]
    DuplicateImage { image: String, folder: String },

    /// 缺失图片数达到容忍上限且重提额度已用尽（致命）
    #[error("完整性错误: 文件夹 {folder} 缺失 {missing} 张图片 (容忍上限: {tolerance})")]
    Completeness {
        folder: String,
        missing: usize,
        tolerance: usize,
    },

    /// 远端返回了未请求的图片（致命）
    #[error("数据完整性错误: 文件夹 {folder} 的结果中有 {extra} 张未请求的图片")]
    Integrity { folder: String, extra: usize },

    /// 文件操作错误
    #[error("文件操作失败 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON 解析错误
    #[error("JSON解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

impl OrchestratorError {
    /// 该错误是否属于可重试的传输类错误
    ///
    /// 数据一致性错误永不重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrchestratorError::StatusFetch { .. } | OrchestratorError::Download { .. }
        )
    }

    /// 创建枚举错误
    pub fn enumeration(prefix: impl Into<String>, reason: impl Into<String>) -> Self {
        OrchestratorError::Enumeration {
            prefix: prefix.into(),
            reason: reason.into(),
        }
    }

    /// 创建状态查询错误
    pub fn status_fetch(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        OrchestratorError::StatusFetch {
            task_id: task_id.into(),
            reason: reason.into(),
        }
    }

    /// 创建提交错误
    pub fn submission(job_name: impl Into<String>, reason: impl Into<String>) -> Self {
        OrchestratorError::Submission {
            job_name: job_name.into(),
            reason: reason.into(),
        }
    }

    /// 创建下载错误
    pub fn download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        OrchestratorError::Download {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// 创建文件操作错误
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        OrchestratorError::File {
            path: path.into(),
            source,
        }
    }
}

/// 编排器结果类型
pub type Result<T> = std::result::Result<T, OrchestratorError>;
