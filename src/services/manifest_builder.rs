//! 清单构建 - 业务能力层
//!
//! 把一个逻辑文件夹（存储前缀）变成有序去重的图片清单。

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::clients::StorageClient;
use crate::error::{OrchestratorError, Result};
use crate::models::Manifest;

/// 清单构建器
pub struct ManifestBuilder {
    storage: Arc<dyn StorageClient>,
}

impl ManifestBuilder {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    /// 枚举前缀下的图片，生成清单
    ///
    /// `expect_nonempty` 为真时，空结果视为枚举失败（由调用方策略决定）
    pub async fn build(
        &self,
        folder_name: &str,
        prefix: &str,
        expect_nonempty: bool,
    ) -> Result<Manifest> {
        let images = self.storage.list(prefix).await?;
        let manifest = Manifest::new(folder_name, images);

        if expect_nonempty && manifest.is_empty() {
            return Err(OrchestratorError::enumeration(prefix, "没有找到任何图片"));
        }

        info!(
            "[文件夹 {}] 枚举完成, 共 {} 张图片",
            folder_name,
            manifest.len()
        );
        Ok(manifest)
    }

    /// 把清单保存为本地 JSON 文件（`{folder}_all.json`）
    pub async fn save_manifest_file(&self, manifest: &Manifest, output_dir: &Path) -> Result<()> {
        let path = output_dir.join(format!("{}_all.json", manifest.folder_name()));
        tokio::fs::write(&path, manifest.to_json_bytes()?)
            .await
            .map_err(|e| OrchestratorError::file(path.display().to_string(), e))?;
        Ok(())
    }
}
