//! 日志工具模块
//!
//! 提供日志初始化和格式化输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::ProcessingStats;

/// 初始化 tracing 日志
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量检测任务提交模式");
    info!("📋 任务集: {}", config.job_set_name);
    info!("📊 最大并发文件夹数: {}", config.max_concurrent_folders);
    info!(
        "📏 容忍缺失上限: {} 张, 每任务重提额度: {}",
        config.max_tolerable_missing_images, config.max_resubmissions_per_task
    );
    info!("{}", "=".repeat(60));
}

/// 记录清单构建信息，并给出总耗时估计
pub fn log_manifests_built(n_folders: usize, total_images: usize) {
    info!("✓ 共 {} 个文件夹, {} 张图片", n_folders, total_images);
    info!(
        "💡 预计远端处理时间: {}",
        format_timespan(expected_seconds(total_images))
    );
}

/// 远端处理时间估算（按每 16 张 0.8 秒）
fn expected_seconds(n_images: usize) -> u64 {
    ((0.8 / 16.0) * n_images as f64) as u64
}

/// 把秒数格式化成人类可读的时长
fn format_timespan(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{}小时{}分{}秒", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}分{}秒", minutes, secs)
    } else {
        format!("{}秒", secs)
    }
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &ProcessingStats) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.total);
    info!("❌ 失败: {}", stats.failed);
    if stats.resubmissions == 0 {
        info!("无需重提");
    } else {
        info!("🔁 重提任务数: {}", stats.resubmissions);
    }
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timespan_formatting() {
        assert_eq!(format_timespan(59), "59秒");
        assert_eq!(format_timespan(61), "1分1秒");
        assert_eq!(format_timespan(3661), "1小时1分1秒");
    }

    #[test]
    fn expected_time_scales_with_images() {
        assert_eq!(expected_seconds(0), 0);
        assert_eq!(expected_seconds(16_000), 800);
    }
}
