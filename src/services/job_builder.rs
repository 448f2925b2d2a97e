//! 任务请求构建 - 业务能力层
//!
//! 任务名派生规则：
//! - 分块任务：`{job_set}_{folder}_chunk{NNN}`
//! - 重提任务：`{folder}_{task_id}_missing_images`
//!
//! 远端不允许任务名含句点等字符，统一清洗；同名任务是调用方
//! 缺陷或非确定性运行的信号，构建时直接报错。

use std::sync::Arc;

use crate::error::Result;
use crate::models::{JobRequest, TaskId};
use crate::services::registry::TaskRegistry;

/// 清洗任务名/文件夹名中远端不允许的字符
///
/// 字母数字、连字符和下划线保留，其余（包括句点）替换为下划线
pub fn clean_request_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 分块任务的任务名
pub fn chunk_job_name(job_set_name: &str, folder_name: &str, chunk_index: usize) -> String {
    clean_request_name(&format!(
        "{}_{}_chunk{:03}",
        job_set_name, folder_name, chunk_index
    ))
}

/// 重提任务的任务名
pub fn resubmission_job_name(folder_name: &str, task_id: &TaskId) -> String {
    clean_request_name(&format!("{}_{}_missing_images", folder_name, task_id))
}

/// 任务请求构建器
///
/// 持有注册表引用，构建时强制检查任务名唯一性
pub struct JobRequestBuilder {
    registry: Arc<TaskRegistry>,
    caller_id: String,
    input_container_url: String,
    image_path_prefix: Option<String>,
}

impl JobRequestBuilder {
    pub fn new(
        registry: Arc<TaskRegistry>,
        caller_id: impl Into<String>,
        input_container_url: impl Into<String>,
        image_path_prefix: Option<String>,
    ) -> Self {
        Self {
            registry,
            caller_id: caller_id.into(),
            input_container_url: input_container_url.into(),
            image_path_prefix,
        }
    }

    /// 构建任务请求；任务名已被注册过时报 DuplicateJobName
    pub fn build(&self, job_name: &str, source_manifest_url: &str) -> Result<JobRequest> {
        self.registry.assert_unique(job_name)?;

        Ok(JobRequest {
            job_name: job_name.to_string(),
            source_manifest_url: source_manifest_url.to_string(),
            caller_id: self.caller_id.clone(),
            image_path_prefix: self.image_path_prefix.clone(),
            input_container_url: self.input_container_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestratorError;

    #[test]
    fn clean_request_name_replaces_disallowed_characters() {
        assert_eq!(clean_request_name("2019.12.15"), "2019_12_15");
        assert_eq!(clean_request_name("a/b c'd"), "a_b_c_d");
        assert_eq!(clean_request_name("folder-1_ok"), "folder-1_ok");
    }

    #[test]
    fn job_names_are_period_free() {
        let name = chunk_job_name("inst-2019.12.15", "camera.A", 0);
        assert!(!name.contains('.'));
        assert_eq!(name, "inst-2019_12_15_camera_A_chunk000");
    }

    #[test]
    fn resubmission_name_carries_task_id() {
        assert_eq!(
            resubmission_job_name("folder1", &"7618".to_string()),
            "folder1_7618_missing_images"
        );
    }

    #[test]
    fn build_rejects_registered_job_name() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register("js_f_chunk000", "1".to_string(), "f")
            .unwrap();

        let builder = JobRequestBuilder::new(registry, "caller", "https://x?sas", None);
        assert!(builder.build("js_f_chunk001", "https://x/1").is_ok());
        let err = builder.build("js_f_chunk000", "https://x/0").unwrap_err();
        assert!(matches!(err, OrchestratorError::DuplicateJobName { .. }));
    }
}
