//! 任务注册表 - 业务能力层
//!
//! 全局唯一的可变共享状态：任务名 → 任务标识、文件夹 → 任务组。
//! 互斥锁保证并发分块/重提下任务名唯一性不变式成立。

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{OrchestratorError, Result};
use crate::models::{TaskGroup, TaskId};

#[derive(Debug, Default)]
struct RegistryInner {
    job_name_to_task_id: HashMap<String, TaskId>,
    groups: HashMap<String, TaskGroup>,
}

/// 任务注册表
#[derive(Debug, Default)]
pub struct TaskRegistry {
    inner: Mutex<RegistryInner>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为文件夹创建任务组（分块时调用一次，幂等）
    pub fn ensure_group(&self, folder_name: &str) {
        let mut inner = self.inner.lock().expect("注册表锁中毒");
        inner
            .groups
            .entry(folder_name.to_string())
            .or_insert_with(|| TaskGroup::new(folder_name));
    }

    /// 检查任务名是否可用；已存在时报 DuplicateJobName
    pub fn assert_unique(&self, job_name: &str) -> Result<()> {
        let inner = self.inner.lock().expect("注册表锁中毒");
        if inner.job_name_to_task_id.contains_key(job_name) {
            return Err(OrchestratorError::DuplicateJobName {
                job_name: job_name.to_string(),
            });
        }
        Ok(())
    }

    /// 任务名是否已提交过（提交重试前必须先查，避免远端重复任务）
    pub fn contains_job(&self, job_name: &str) -> bool {
        let inner = self.inner.lock().expect("注册表锁中毒");
        inner.job_name_to_task_id.contains_key(job_name)
    }

    /// 登记已提交的任务，追加进文件夹的任务组
    ///
    /// 同名重复登记报 DuplicateJobName（硬失败，不是警告）
    pub fn register(&self, job_name: &str, task_id: TaskId, folder_name: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("注册表锁中毒");
        if inner.job_name_to_task_id.contains_key(job_name) {
            return Err(OrchestratorError::DuplicateJobName {
                job_name: job_name.to_string(),
            });
        }
        inner
            .job_name_to_task_id
            .insert(job_name.to_string(), task_id.clone());
        inner
            .groups
            .entry(folder_name.to_string())
            .or_insert_with(|| TaskGroup::new(folder_name))
            .push(task_id);
        Ok(())
    }

    /// 查询文件夹的任务组快照；从未分块过的文件夹报 UnknownFolder
    pub fn group(&self, folder_name: &str) -> Result<TaskGroup> {
        let inner = self.inner.lock().expect("注册表锁中毒");
        inner
            .groups
            .get(folder_name)
            .cloned()
            .ok_or_else(|| OrchestratorError::UnknownFolder {
                folder: folder_name.to_string(),
            })
    }

    /// 按任务名查任务标识
    pub fn task_id(&self, job_name: &str) -> Option<TaskId> {
        let inner = self.inner.lock().expect("注册表锁中毒");
        inner.job_name_to_task_id.get(job_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_appends_to_folder_group() {
        let registry = TaskRegistry::new();
        registry.ensure_group("folder1");
        registry
            .register("js_folder1_chunk000", "7618".to_string(), "folder1")
            .unwrap();
        registry
            .register("js_folder1_chunk001", "7452".to_string(), "folder1")
            .unwrap();

        let group = registry.group("folder1").unwrap();
        assert_eq!(group.task_ids, vec!["7618".to_string(), "7452".to_string()]);
    }

    #[test]
    fn duplicate_registration_is_a_hard_error() {
        let registry = TaskRegistry::new();
        registry
            .register("js_f_chunk000", "1".to_string(), "f")
            .unwrap();
        let err = registry
            .register("js_f_chunk000", "2".to_string(), "f")
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::DuplicateJobName { .. }));

        // 失败的登记不能污染任务组
        assert_eq!(registry.group("f").unwrap().task_ids.len(), 1);
    }

    #[test]
    fn distinct_names_always_succeed() {
        let registry = TaskRegistry::new();
        for i in 0..50 {
            registry
                .register(&format!("js_f_chunk{:03}", i), i.to_string(), "f")
                .unwrap();
        }
        assert_eq!(registry.group("f").unwrap().task_ids.len(), 50);
    }

    #[test]
    fn unknown_folder_is_an_error() {
        let registry = TaskRegistry::new();
        let err = registry.group("never_chunked").unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownFolder { .. }));
    }

    #[test]
    fn contains_job_reflects_submissions() {
        let registry = TaskRegistry::new();
        assert!(!registry.contains_job("n"));
        registry.register("n", "1".to_string(), "f").unwrap();
        assert!(registry.contains_job("n"));
        assert_eq!(registry.task_id("n"), Some("1".to_string()));
    }
}
