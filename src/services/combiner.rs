//! 结果合并与校验 - 业务能力层
//!
//! 把一个任务组的全部结果文件合并成单个按图片索引的映射：
//! - 同组内同一图片出现两次 → DuplicateImage（分块重叠或重复提交）
//! - 合并后相对清单的缺失达到容忍上限 → Completeness
//! - 出现清单之外的图片 → Integrity（无条件致命）
//!
//! 输入相同则输出字节级相同（文件顺序、图片顺序都是确定的）。

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{OrchestratorError, Result};
use crate::models::{CombinedResult, DetectionImage, Manifest};

/// 按顺序合并结果文件内容
///
/// `images_per_file` 必须按任务组内任务的登记顺序给出
pub fn combine_images(
    folder_name: &str,
    images_per_file: Vec<Vec<DetectionImage>>,
) -> Result<CombinedResult> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for images in images_per_file {
        for image in images {
            if !seen.insert(image.file.clone()) {
                return Err(OrchestratorError::DuplicateImage {
                    image: image.file,
                    folder: folder_name.to_string(),
                });
            }
            merged.push(image);
        }
    }

    Ok(CombinedResult {
        folder_name: folder_name.to_string(),
        images: merged,
    })
}

/// 校验合并结果与原始清单的关系
pub fn validate(combined: &CombinedResult, manifest: &Manifest, tolerance: usize) -> Result<()> {
    let requested = manifest.image_set();
    let returned = combined.image_set();

    // 远端绝不应返回未请求的图片
    let extra_count = returned.difference(&requested).count();
    if extra_count > 0 {
        return Err(OrchestratorError::Integrity {
            folder: combined.folder_name.clone(),
            extra: extra_count,
        });
    }

    let missing_count = requested.difference(&returned).count();
    if missing_count >= tolerance {
        return Err(OrchestratorError::Completeness {
            folder: combined.folder_name.clone(),
            missing: missing_count,
            tolerance,
        });
    }
    if missing_count > 0 {
        warn!(
            "文件夹 {} 缺失 {} 张图片 (低于容忍上限 {})",
            combined.folder_name, missing_count, tolerance
        );
    }
    Ok(())
}

/// 把合并结果写入输出目录（`{folder}_detections.json`）
pub async fn write_combined(combined: &CombinedResult, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}_detections.json", combined.folder_name));
    tokio::fs::write(&path, combined.to_json_bytes()?)
        .await
        .map_err(|e| OrchestratorError::file(path.display().to_string(), e))?;
    info!(
        "文件夹 {} 的合并结果已写入: {}",
        combined.folder_name,
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn image(file: &str) -> DetectionImage {
        DetectionImage {
            file: file.to_string(),
            detections: serde_json::json!([]),
            extra: Map::new(),
        }
    }

    #[test]
    fn combine_merges_in_file_order() {
        let combined = combine_images(
            "folder1",
            vec![
                vec![image("a.jpg"), image("b.jpg")],
                vec![image("c.jpg")],
            ],
        )
        .unwrap();
        let files: Vec<&str> = combined.images.iter().map(|im| im.file.as_str()).collect();
        assert_eq!(files, vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn duplicate_image_across_files_is_fatal() {
        let err = combine_images(
            "folder1",
            vec![vec![image("a.jpg")], vec![image("a.jpg")]],
        )
        .unwrap_err();
        assert!(matches!(err, OrchestratorError::DuplicateImage { .. }));
    }

    #[test]
    fn combining_twice_is_byte_identical() {
        let make = || {
            combine_images(
                "f",
                vec![vec![image("a.jpg"), image("b.jpg")], vec![image("c.jpg")]],
            )
            .unwrap()
        };
        assert_eq!(
            make().to_json_bytes().unwrap(),
            make().to_json_bytes().unwrap()
        );
    }

    #[test]
    fn extra_images_fail_integrity_unconditionally() {
        let manifest = Manifest::new("f", ["a.jpg".to_string()]);
        let combined = combine_images("f", vec![vec![image("a.jpg"), image("z.jpg")]]).unwrap();
        let err = validate(&combined, &manifest, 20).unwrap_err();
        assert!(matches!(err, OrchestratorError::Integrity { .. }));
    }

    #[test]
    fn missing_below_tolerance_warns_only() {
        let manifest = Manifest::new("f", (0..10).map(|i| format!("{}.jpg", i)));
        let combined =
            combine_images("f", vec![(0..8).map(|i| image(&format!("{}.jpg", i))).collect()])
                .unwrap();
        assert!(validate(&combined, &manifest, 20).is_ok());
    }

    #[test]
    fn missing_at_tolerance_fails_completeness() {
        let manifest = Manifest::new("f", (0..30).map(|i| format!("{}.jpg", i)));
        let combined =
            combine_images("f", vec![(0..10).map(|i| image(&format!("{}.jpg", i))).collect()])
                .unwrap();
        let err = validate(&combined, &manifest, 20).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Completeness {
                missing: 20,
                tolerance: 20,
                ..
            }
        ));
    }

    #[test]
    fn combined_set_is_subset_of_manifest() {
        let manifest = Manifest::new("f", (0..5).map(|i| format!("{}.jpg", i)));
        let combined =
            combine_images("f", vec![(0..5).map(|i| image(&format!("{}.jpg", i))).collect()])
                .unwrap();
        assert!(validate(&combined, &manifest, 1).is_ok());
        assert!(combined
            .image_set()
            .is_subset(&manifest.image_set()));
    }
}
