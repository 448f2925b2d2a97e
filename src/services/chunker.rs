//! 分块 - 业务能力层
//!
//! 把清单切成大小受限的连续分块，每块对应一个远端任务。
//! 同一清单同一块大小必须产生相同切分，下游任务名才可复现。

use crate::models::{Chunk, Manifest};

/// 把清单切成若干分块
///
/// 块数 = ceil(清单大小 / 每块最大图片数)，最后一块可以更小；
/// 各块互不相交，集合并等于清单本身。
pub fn divide_into_chunks(manifest: &Manifest, max_images_per_chunk: usize) -> Vec<Chunk> {
    assert!(max_images_per_chunk > 0, "每块图片数必须大于 0");

    manifest
        .images()
        .chunks(max_images_per_chunk)
        .enumerate()
        .map(|(index, images)| Chunk {
            index,
            images: images.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn manifest_of(n: usize) -> Manifest {
        Manifest::new("f", (0..n).map(|i| format!("im{:04}.jpg", i)))
    }

    #[test]
    fn chunks_partition_manifest_exactly() {
        for (n, k) in [(0usize, 3usize), (1, 1), (10, 3), (10, 10), (10, 20), (100, 7)] {
            let manifest = manifest_of(n);
            let chunks = divide_into_chunks(&manifest, k);

            // 块数 = ceil(n/k)
            assert_eq!(chunks.len(), n.div_ceil(k), "n={} k={}", n, k);

            // 两两不相交且并集等于清单
            let mut union = HashSet::new();
            for chunk in &chunks {
                assert!(chunk.images.len() <= k);
                for image in &chunk.images {
                    assert!(union.insert(image.clone()), "图片 {} 重复", image);
                }
            }
            let expected: HashSet<String> = manifest.images().iter().cloned().collect();
            assert_eq!(union, expected);
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let manifest = manifest_of(25);
        assert_eq!(
            divide_into_chunks(&manifest, 4),
            divide_into_chunks(&manifest, 4)
        );
    }

    #[test]
    fn chunk_indices_are_sequential() {
        let chunks = divide_into_chunks(&manifest_of(10), 3);
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }
}
