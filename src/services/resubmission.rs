//! 失败检测与重提 - 业务能力层
//!
//! 从状态记录里找失败分片与缺失图片：
//! - 分片失败只告警，不阻塞（重提只由缺失图片数触发）
//! - 缺失图片数达到容忍上限时，对缺失集合构建一个重提任务
//!
//! 输出文件名从 URL 派生，必须防住编码分隔符注入。

use std::collections::HashSet;

use percent_encoding::percent_decode_str;
use tracing::warn;
use url::Url;

use crate::error::{OrchestratorError, Result};
use crate::models::TaskStatusRecord;
use crate::services::job_builder::clean_request_name;

/// 从 URL 派生裸文件名
///
/// 取路径最后一段并做一次百分号解码。解码后若多出路径分隔符
/// （编码的斜杠/反斜杠被夹带进来），或再解码仍会变化（双重编码），
/// 一律报 UnsafePath。
pub fn url_to_filename(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|_| OrchestratorError::UnsafePath {
        url: url.to_string(),
    })?;
    let path = parsed.path();

    // 解码整个路径后分段数不能变化，否则说明有编码的分隔符
    let decoded_path = percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| OrchestratorError::UnsafePath {
            url: url.to_string(),
        })?;
    if decoded_path.matches('/').count() != path.matches('/').count()
        || decoded_path.contains('\\')
    {
        return Err(OrchestratorError::UnsafePath {
            url: url.to_string(),
        });
    }

    let basename = path.rsplit('/').next().unwrap_or_default();
    let decoded = percent_decode_str(basename)
        .decode_utf8()
        .map_err(|_| OrchestratorError::UnsafePath {
            url: url.to_string(),
        })?
        .to_string();

    // 双重编码：第二次解码仍会变化的文件名不可信
    let double_decoded = percent_decode_str(&decoded)
        .decode_utf8()
        .map_err(|_| OrchestratorError::UnsafePath {
            url: url.to_string(),
        })?;
    if double_decoded != decoded || decoded.is_empty() {
        return Err(OrchestratorError::UnsafePath {
            url: url.to_string(),
        });
    }

    Ok(decoded)
}

/// 校验输出文件名与文件夹的归属关系
///
/// 文件名必须包含文件夹名（或其清洗后形式），且带有 chunk/missing
/// 标记；不满足说明任务组与任务标识的对应关系已损坏，属致命错误。
pub fn check_filename_matches_folder(
    filename: &str,
    folder_name: &str,
    task_id: &str,
) -> Result<()> {
    let folder_matches =
        filename.contains(folder_name) || filename.contains(&clean_request_name(folder_name));
    let marker_matches = filename.contains("chunk") || filename.contains("missing");

    if !folder_matches || !marker_matches {
        return Err(OrchestratorError::Consistency {
            task_id: task_id.to_string(),
            filename: filename.to_string(),
            folder: folder_name.to_string(),
        });
    }
    Ok(())
}

/// 失败检测的结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResubmissionDecision {
    /// 缺失数低于容忍上限，任务视为完成
    Complete,
    /// 缺失数达到上限，需要对这些图片重提一个任务
    Resubmit(Vec<String>),
}

/// 检查一个已完成任务的状态记录
///
/// `requested` 是该任务最初请求的图片集合，`returned` 是远端
/// 实际处理的图片集合；缺失集合按请求顺序给出，保证重提清单可复现。
pub fn evaluate(
    record: &TaskStatusRecord,
    folder_name: &str,
    requested: &[String],
    returned: &HashSet<String>,
    tolerance: usize,
) -> Result<ResubmissionDecision> {
    // 输出文件名与文件夹的归属校验
    let detections_url = record.detections_url()?;
    let filename = url_to_filename(detections_url)?;
    check_filename_matches_folder(&filename, folder_name, &record.task_id)?;

    // 分片失败只告警（不基于分片数触发重提）
    if record.num_failed_shards != 0 {
        warn!(
            "任务 {} 有 {} 个失败分片",
            record.task_id, record.num_failed_shards
        );
    }

    let missing: Vec<String> = requested
        .iter()
        .filter(|im| !returned.contains(*im))
        .cloned()
        .collect();

    if missing.len() < tolerance {
        if !missing.is_empty() {
            warn!(
                "任务 {} 缺失 {} 张图片 (低于容忍上限 {})",
                record.task_id,
                missing.len(),
                tolerance
            );
        }
        return Ok(ResubmissionDecision::Complete);
    }

    warn!("任务 {} 缺失 {} 张图片", record.task_id, missing.len());
    Ok(ResubmissionDecision::Resubmit(missing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn completed_record(task_id: &str, detections_url: &str) -> TaskStatusRecord {
        TaskStatusRecord::from_response(
            task_id.to_string(),
            json!({
                "status": {"request_status": "completed", "message": {"num_failed_shards": 0}},
                "output_file_urls": {"detections": detections_url}
            }),
        )
    }

    #[test]
    fn url_to_filename_returns_plain_basename() {
        assert_eq!(
            url_to_filename("https://x/y/chunk0.json").unwrap(),
            "chunk0.json"
        );
        assert_eq!(
            url_to_filename("https://x/a/b/js_folder1_chunk000.json?sas=token").unwrap(),
            "js_folder1_chunk000.json"
        );
    }

    #[test]
    fn url_to_filename_decodes_harmless_escapes() {
        assert_eq!(
            url_to_filename("https://x/y/chunk%200.json").unwrap(),
            "chunk 0.json"
        );
    }

    #[test]
    fn url_to_filename_rejects_encoded_separator() {
        let err = url_to_filename("https://x/blah%2Fdir/file.json").unwrap_err();
        assert!(matches!(err, OrchestratorError::UnsafePath { .. }));
    }

    #[test]
    fn url_to_filename_rejects_encoded_backslash_and_double_encoding() {
        assert!(url_to_filename("https://x/dir%5Cfile.json").is_err());
        assert!(url_to_filename("https://x/y/%252Fetc.json").is_err());
    }

    #[test]
    fn filename_folder_association_is_checked() {
        assert!(check_filename_matches_folder("js_folder1_chunk000.json", "folder1", "1").is_ok());
        // 清洗后的文件夹名同样可接受
        assert!(
            check_filename_matches_folder("js_camera_A_chunk000.json", "camera.A", "1").is_ok()
        );
        assert!(
            check_filename_matches_folder("folder1_7618_missing_images.json", "folder1", "7618")
                .is_ok()
        );

        let err =
            check_filename_matches_folder("js_folder2_chunk000.json", "folder1", "1").unwrap_err();
        assert!(matches!(err, OrchestratorError::Consistency { .. }));
        // 缺少 chunk/missing 标记也视为归属损坏
        assert!(check_filename_matches_folder("folder1_stuff.json", "folder1", "1").is_err());
    }

    #[test]
    fn missing_below_tolerance_is_complete() {
        let record = completed_record("1", "https://x/y/js_folder1_chunk000.json");
        let requested: Vec<String> = (0..100).map(|i| format!("im{:03}.jpg", i)).collect();
        // 缺 5 张
        let returned: HashSet<String> = requested.iter().skip(5).cloned().collect();

        let decision = evaluate(&record, "folder1", &requested, &returned, 20).unwrap();
        assert_eq!(decision, ResubmissionDecision::Complete);
    }

    #[test]
    fn missing_at_or_above_tolerance_triggers_resubmission() {
        let record = completed_record("1", "https://x/y/js_folder1_chunk000.json");
        let requested: Vec<String> = (0..100).map(|i| format!("im{:03}.jpg", i)).collect();
        // 缺 25 张
        let returned: HashSet<String> = requested.iter().skip(25).cloned().collect();

        match evaluate(&record, "folder1", &requested, &returned, 20).unwrap() {
            ResubmissionDecision::Resubmit(missing) => {
                assert_eq!(missing, requested[..25].to_vec());
            }
            other => panic!("期望重提, 实际 {:?}", other),
        }
    }

    #[test]
    fn mismatched_folder_is_fatal_before_diffing() {
        let record = completed_record("1", "https://x/y/js_other_chunk000.json");
        let requested = vec!["a.jpg".to_string()];
        let returned = HashSet::new();
        let err = evaluate(&record, "folder1", &requested, &returned, 20).unwrap_err();
        assert!(matches!(err, OrchestratorError::Consistency { .. }));
    }
}
