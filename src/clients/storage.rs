//! 存储协作方
//!
//! 列表、上传、下载都是外部协作方的能力，这里只定义契约和一个
//! 基于 reqwest 的 HTTP 实现。上传与下载按内容幂等，可安全重试。

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{OrchestratorError, Result};

/// 存储协作方契约
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// 枚举某前缀下的全部图片标识
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// 上传内容到远端路径
    async fn upload(&self, content: &[u8], remote_path: &str) -> Result<()>;

    /// 下载 URL 到本地文件
    ///
    /// 实现必须保证不留下半截文件：传输完整校验通过后才落到目标路径
    async fn download(&self, url: &str, local_path: &Path) -> Result<()>;

    /// 由远端路径生成可读 URL（基础 URL + 路径 + 读取令牌）
    fn read_url(&self, remote_path: &str) -> String;
}

/// 基于 HTTP 的存储客户端
///
/// 读 URL 的拼法沿用容器约定：`{base}/{path}{read_token}`。
pub struct HttpStorageClient {
    client: reqwest::Client,
    base_url: String,
    read_sas_token: String,
    write_sas_token: String,
}

impl HttpStorageClient {
    pub fn new(
        base_url: impl Into<String>,
        read_sas_token: impl Into<String>,
        write_sas_token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            read_sas_token: read_sas_token.into(),
            write_sas_token: write_sas_token.into(),
        }
    }
}

#[async_trait]
impl StorageClient for HttpStorageClient {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}{}&comp=list&prefix={}",
            self.base_url, self.read_sas_token, prefix
        );
        debug!("枚举前缀: {}", prefix);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OrchestratorError::enumeration(prefix, e.to_string()))?;

        if !response.status().is_success() {
            return Err(OrchestratorError::enumeration(
                prefix,
                format!("状态码 {}", response.status()),
            ));
        }

        let names: Vec<String> = response
            .json()
            .await
            .map_err(|e| OrchestratorError::enumeration(prefix, e.to_string()))?;
        Ok(names)
    }

    async fn upload(&self, content: &[u8], remote_path: &str) -> Result<()> {
        let url = format!("{}/{}{}", self.base_url, remote_path, self.write_sas_token);
        debug!("上传 {} 字节到 {}", content.len(), remote_path);

        let response = self
            .client
            .put(&url)
            .header("x-ms-blob-type", "BlockBlob")
            .body(content.to_vec())
            .send()
            .await
            .map_err(|e| OrchestratorError::download(remote_path, e.to_string()))?;

        if !response.status().is_success() {
            return Err(OrchestratorError::download(
                remote_path,
                format!("上传失败, 状态码 {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn download(&self, url: &str, local_path: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OrchestratorError::download(url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(OrchestratorError::download(
                url,
                format!("状态码 {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OrchestratorError::download(url, e.to_string()))?;

        // 先写临时文件，完整后再改名，避免留下半截文件
        let part_path = local_path.with_extension("part");
        tokio::fs::write(&part_path, &bytes)
            .await
            .map_err(|e| OrchestratorError::file(part_path.display().to_string(), e))?;
        tokio::fs::rename(&part_path, local_path)
            .await
            .map_err(|e| OrchestratorError::file(local_path.display().to_string(), e))?;
        Ok(())
    }

    fn read_url(&self, remote_path: &str) -> String {
        format!("{}/{}{}", self.base_url, remote_path, self.read_sas_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_url_combines_base_path_and_token() {
        let client = HttpStorageClient::new("https://x/container", "?st=ro", "?st=w");
        assert_eq!(
            client.read_url("api_inputs/js/folder1_chunk000.json"),
            "https://x/container/api_inputs/js/folder1_chunk000.json?st=ro"
        );
    }
}
