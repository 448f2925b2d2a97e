//! 文件夹处理上下文

use crate::models::Manifest;

/// 一个文件夹管线的上下文封装
///
/// 文件夹与任务组的对应关系在分块提交时建立一次，
/// 之后全程通过本上下文传递，不再靠文件名反推。
#[derive(Debug, Clone)]
pub struct FolderCtx {
    /// 文件夹序号（用于日志）
    pub folder_index: usize,
    /// 文件夹名（任务组的外键）
    pub folder_name: String,
    /// 该文件夹的完整图片清单
    pub manifest: Manifest,
}

impl FolderCtx {
    pub fn new(folder_index: usize, folder_name: impl Into<String>, manifest: Manifest) -> Self {
        Self {
            folder_index,
            folder_name: folder_name.into(),
            manifest,
        }
    }
}
