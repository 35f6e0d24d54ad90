/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化全局日志
///
/// 过滤规则优先取 `RUST_LOG`，否则按 `verbose` 使用 debug / info。
/// 重复调用（例如多个测试）不会报错
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},chromiumoxide=warn", default_level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 程序启动 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📊 最大并发申请数: {}", config.max_concurrent_attempts);
    info!(
        "🧪 演练模式: {}",
        if config.dry_run { "开启（不提交）" } else { "关闭" }
    );
    info!("{}", "=".repeat(60));
}

/// 记录待申请岗位加载信息
///
/// # 参数
/// - `total`: 岗位总数
/// - `max_concurrent`: 最大并发数
/// - `dry_run`: 是否演练
pub fn log_jobs_loaded(total: usize, max_concurrent: usize, dry_run: bool) {
    info!("✓ 找到 {} 个待申请的岗位", total);
    info!("📋 将以每批 {} 个的方式处理", max_concurrent);
    if dry_run {
        info!("💡 演练模式：每个申请停在审核页\n");
    }
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始岗位编号
/// - `end`: 结束岗位编号
/// - `total`: 岗位总数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批岗位: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(
    success: usize,
    failed: usize,
    unsupported: usize,
    total: usize,
    status_log_file: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("↪️ 外部站点: {}", unsupported);
    info!("{}", "=".repeat(60));
    info!("\n状态事件已保存至: {}", status_log_file);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
