//! 图片清单与分块
//!
//! 清单一经生成即不可变；分块是清单的连续子序列。

use std::collections::HashSet;

/// 一个逻辑文件夹的图片清单
///
/// 不变式：清单内图片标识唯一；顺序为枚举时的插入顺序，
/// 除用于切分外没有其他语义。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    folder_name: String,
    images: Vec<String>,
}

impl Manifest {
    /// 创建清单，按插入顺序去重
    pub fn new(folder_name: impl Into<String>, images: impl IntoIterator<Item = String>) -> Self {
        let mut seen = HashSet::new();
        let images = images
            .into_iter()
            .filter(|im| seen.insert(im.clone()))
            .collect();
        Self {
            folder_name: folder_name.into(),
            images,
        }
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// 图片集合视图（用于差集计算）
    pub fn image_set(&self) -> HashSet<&str> {
        self.images.iter().map(|s| s.as_str()).collect()
    }

    /// 序列化为持久化格式（JSON 字符串数组）
    pub fn to_json_bytes(&self) -> crate::error::Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.images)?)
    }
}

/// 清单的一个连续分块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 分块序号（从 0 开始）
    pub index: usize,
    /// 本分块包含的图片
    pub images: Vec<String>,
}

impl Chunk {
    /// 序列化为持久化格式（JSON 字符串数组）
    pub fn to_json_bytes(&self) -> crate::error::Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.images)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_deduplicates_preserving_order() {
        let m = Manifest::new(
            "folder1",
            ["a.jpg", "b.jpg", "a.jpg", "c.jpg", "b.jpg"]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(m.images(), &["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn manifest_serializes_as_json_array() {
        let m = Manifest::new("f", ["x.jpg".to_string()]);
        assert_eq!(m.to_json_bytes().unwrap(), br#"["x.jpg"]"#.to_vec());
    }
}
