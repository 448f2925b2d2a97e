//! 任务提交请求

use serde::Serialize;
use serde_json::{json, Value};

/// 一次任务提交的完整请求
///
/// 不变式：job_name 在任务集内全局唯一且不含句点；
/// 唯一性由任务注册表在构建时强制检查。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JobRequest {
    /// 派生的任务名
    pub job_name: String,
    /// 分块清单的可读 URL
    pub source_manifest_url: String,
    /// 调用方标识
    pub caller_id: String,
    /// 可选的图片路径前缀
    pub image_path_prefix: Option<String>,
    /// 图片容器的只读基础 URL
    pub input_container_url: String,
}

impl JobRequest {
    /// 生成提交端点需要的 JSON 负载
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "request_name": self.job_name,
            "images_requested_json_sas": self.source_manifest_url,
            "input_container_sas": self.input_container_url,
            "caller": self.caller_id,
        });
        if let Some(prefix) = &self.image_path_prefix {
            payload["image_path_prefix"] = json!(prefix);
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_contains_required_fields() {
        let request = JobRequest {
            job_name: "js_folder1_chunk000".to_string(),
            source_manifest_url: "https://x/api_inputs/js/folder1_chunk000.json?sas".to_string(),
            caller_id: "caller".to_string(),
            image_path_prefix: None,
            input_container_url: "https://x/container?sas".to_string(),
        };
        let payload = request.to_payload();
        assert_eq!(payload["request_name"], "js_folder1_chunk000");
        assert_eq!(payload["caller"], "caller");
        assert!(payload.get("image_path_prefix").is_none());
    }

    #[test]
    fn payload_includes_optional_prefix() {
        let request = JobRequest {
            job_name: "n".to_string(),
            source_manifest_url: "u".to_string(),
            caller_id: "c".to_string(),
            image_path_prefix: Some("prefix/".to_string()),
            input_container_url: "b".to_string(),
        };
        assert_eq!(request.to_payload()["image_path_prefix"], "prefix/");
    }
}
