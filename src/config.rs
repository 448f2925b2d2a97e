use std::path::PathBuf;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 任务集名称（用于派生任务名和远端路径）
    pub job_set_name: String,
    /// 待处理的文件夹列表
    pub folder_names: Vec<String>,
    /// 容器内的公共前缀
    pub container_prefix: String,
    /// 本地输出根目录
    pub base_output_folder: String,
    /// 只读访问的容器基础 URL（含读取令牌）
    pub read_base_url: String,
    /// 读取令牌（拼接在 URL 末尾）
    pub read_sas_token: String,
    /// 写入令牌（上传文件列表时使用）
    pub write_sas_token: String,
    /// 调用方标识
    pub caller: String,
    /// 任务提交端点
    pub submission_endpoint_url: String,
    /// 任务状态查询端点
    pub task_status_endpoint_url: String,
    /// 每个分块的最大图片数
    pub max_images_per_chunk: usize,
    /// 缺失图片容忍上限（达到该值触发重提或报错）
    pub max_tolerable_missing_images: usize,
    /// 每个任务的最大重提次数
    pub max_resubmissions_per_task: usize,
    /// 同时处理的文件夹数量
    pub max_concurrent_folders: usize,
    /// 状态轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 单个任务的轮询总超时（秒）
    pub poll_timeout_secs: u64,
    /// 状态查询重试的初始退避（秒）
    pub status_retry_initial_delay_secs: u64,
    /// 状态查询重试的最大退避（秒）
    pub status_retry_max_delay_secs: u64,
    /// 状态查询的最大重试次数
    pub status_retry_max_attempts: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            job_set_name: "institution-20191215".to_string(),
            folder_names: Vec::new(),
            container_prefix: String::new(),
            base_output_folder: "api_output".to_string(),
            read_base_url: "https://blah.blob.core.windows.net/blah".to_string(),
            read_sas_token: "?st=readonly".to_string(),
            write_sas_token: "?st=write".to_string(),
            caller: "caller".to_string(),
            submission_endpoint_url:
                "http://blah.endpoint.com:6022/v2/camera-trap/detection-batch/request_detections"
                    .to_string(),
            task_status_endpoint_url:
                "http://blah.endpoint.com:6022/v2/camera-trap/detection-batch/task".to_string(),
            max_images_per_chunk: 1_000_000,
            max_tolerable_missing_images: 20,
            max_resubmissions_per_task: 1,
            max_concurrent_folders: 4,
            poll_interval_secs: 60,
            poll_timeout_secs: 12 * 3600,
            status_retry_initial_delay_secs: 2,
            status_retry_max_delay_secs: 60,
            status_retry_max_attempts: 8,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            job_set_name: std::env::var("JOB_SET_NAME").unwrap_or(default.job_set_name),
            folder_names: std::env::var("FOLDER_NAMES")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.folder_names),
            container_prefix: std::env::var("CONTAINER_PREFIX").unwrap_or(default.container_prefix),
            base_output_folder: std::env::var("BASE_OUTPUT_FOLDER")
                .unwrap_or(default.base_output_folder),
            read_base_url: std::env::var("READ_BASE_URL").unwrap_or(default.read_base_url),
            read_sas_token: std::env::var("READ_SAS_TOKEN").unwrap_or(default.read_sas_token),
            write_sas_token: std::env::var("WRITE_SAS_TOKEN").unwrap_or(default.write_sas_token),
            caller: std::env::var("CALLER").unwrap_or(default.caller),
            submission_endpoint_url: std::env::var("SUBMISSION_ENDPOINT_URL")
                .unwrap_or(default.submission_endpoint_url),
            task_status_endpoint_url: std::env::var("TASK_STATUS_ENDPOINT_URL")
                .unwrap_or(default.task_status_endpoint_url),
            // 分块大小为 0 会让分块器无法覆盖清单, 非法值回退到默认
            max_images_per_chunk: std::env::var("MAX_IMAGES_PER_CHUNK")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&v| v > 0)
                .unwrap_or(default.max_images_per_chunk),
            max_tolerable_missing_images: std::env::var("MAX_TOLERABLE_MISSING_IMAGES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_tolerable_missing_images),
            max_resubmissions_per_task: std::env::var("MAX_RESUBMISSIONS_PER_TASK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_resubmissions_per_task),
            max_concurrent_folders: std::env::var("MAX_CONCURRENT_FOLDERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_concurrent_folders),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.poll_interval_secs),
            poll_timeout_secs: std::env::var("POLL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.poll_timeout_secs),
            status_retry_initial_delay_secs: std::env::var("STATUS_RETRY_INITIAL_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.status_retry_initial_delay_secs),
            status_retry_max_delay_secs: std::env::var("STATUS_RETRY_MAX_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.status_retry_max_delay_secs),
            status_retry_max_attempts: std::env::var("STATUS_RETRY_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.status_retry_max_attempts),
            verbose_logging: std::env::var("VERBOSE_LOGGING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.verbose_logging),
        }
    }

    /// 本次任务集的输出根目录
    pub fn job_output_dir(&self) -> PathBuf {
        PathBuf::from(&self.base_output_folder).join(&self.job_set_name)
    }

    /// 原始 API 输出目录
    pub fn raw_api_output_dir(&self) -> PathBuf {
        self.job_output_dir().join("raw_api_outputs")
    }

    /// 合并后输出目录
    pub fn combined_api_output_dir(&self) -> PathBuf {
        self.job_output_dir().join("combined_api_outputs")
    }

    /// 分块清单在远端的存放路径
    pub fn remote_input_path(&self, filename: &str) -> String {
        format!("api_inputs/{}/{}", self.job_set_name, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_are_derived_from_job_set() {
        let config = Config {
            base_output_folder: "out".to_string(),
            job_set_name: "js".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.raw_api_output_dir(),
            PathBuf::from("out/js/raw_api_outputs")
        );
        assert_eq!(
            config.combined_api_output_dir(),
            PathBuf::from("out/js/combined_api_outputs")
        );
        assert_eq!(config.remote_input_path("a.json"), "api_inputs/js/a.json");
    }

    #[test]
    fn zero_chunk_size_from_env_falls_back_to_default() {
        std::env::set_var("MAX_IMAGES_PER_CHUNK", "0");
        let config = Config::from_env();
        std::env::remove_var("MAX_IMAGES_PER_CHUNK");
        assert_eq!(
            config.max_images_per_chunk,
            Config::default().max_images_per_chunk
        );
    }
}
