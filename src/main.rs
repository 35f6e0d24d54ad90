use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use job_autopilot::config::Config;
use job_autopilot::models::{load_tailored_output, DatePosted, JobPosting, Platform, SearchFilters};
use job_autopilot::orchestrator::{App, ApplyJob};
use job_autopilot::utils::logging;

#[derive(Parser)]
#[command(name = "job_autopilot")]
#[command(about = "招聘平台自动化：抓取岗位、驱动申请表单")]
#[command(after_help = "配置: 设置 JOB_AUTOPILOT_CONFIG 指向 TOML 文件，否则从环境变量读取")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 抓取一个或多个平台的搜索结果并导出
    Scrape {
        /// 平台，逗号分隔（linkedin, indeed, glassdoor, wellfound）
        #[arg(value_parser = parse_platforms)]
        platforms: PlatformList,

        /// 搜索关键词
        #[arg(required = true, num_args = 1..)]
        keywords: Vec<String>,

        /// 工作地点
        #[arg(short, long)]
        location: Option<String>,

        /// 只看远程岗位
        #[arg(short, long)]
        remote: bool,

        /// 发布时间（day / week / month）
        #[arg(short, long, value_parser = parse_date_posted)]
        date_posted: Option<DatePosted>,

        /// 最低年薪
        #[arg(short, long)]
        salary_min: Option<u32>,
    },

    /// 申请单个岗位
    Apply {
        #[arg(value_parser = parse_platform)]
        platform: Platform,

        /// 岗位页 URL
        url: String,

        /// 定制内容文件（.json / .toml）
        tailored_file: PathBuf,
    },

    /// 按导出文件批量申请（与定制内容目录按 job_id 配对）
    ApplyBatch {
        /// `scrape` 生成的导出文件
        export_file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = load_config()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let app = App::new(config);
    let cancel = app.cancel_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ 收到中断信号，当前步骤结束后停止");
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::Scrape {
            platforms,
            keywords,
            location,
            remote,
            date_posted,
            salary_min,
        } => {
            let filters = SearchFilters {
                location,
                remote,
                date_posted,
                salary_min,
                ..SearchFilters::new(keywords.join(" "))
            };
            let (postings, path) = app.scrape(&platforms.0, &filters).await?;
            info!("✓ 共 {} 个岗位，已导出到 {}", postings.len(), path.display());
        }
        Commands::Apply {
            platform,
            url,
            tailored_file,
        } => {
            let tailored = load_tailored_output(&tailored_file).await?;
            let posting = single_posting(platform, url, &tailored.job_id);
            app.apply_all(vec![ApplyJob { posting, tailored }]).await?;
        }
        Commands::ApplyBatch { export_file } => {
            app.apply_from_export(&export_file).await?;
        }
    }

    Ok(())
}

fn load_config() -> Result<Config> {
    match std::env::var("JOB_AUTOPILOT_CONFIG") {
        Ok(path) => Config::from_toml_file(Path::new(&path))
            .with_context(|| format!("无法加载配置文件: {}", path)),
        Err(_) => {
            let config = Config::from_env();
            config.validate()?;
            Ok(config)
        }
    }
}

/// 命令行单条申请只知道 URL；标题和公司留空，日志里显示 URL
fn single_posting(platform: Platform, url: String, job_id: &str) -> JobPosting {
    JobPosting {
        id: job_id.to_string(),
        title: String::new(),
        company: String::new(),
        location: String::new(),
        description: String::new(),
        url,
        salary: None,
        salary_range: None,
        tags: BTreeSet::new(),
        platform,
        posted_at: None,
        scraped_at: Utc::now(),
    }
}

/// 逗号分隔的平台列表
#[derive(Debug, Clone)]
struct PlatformList(Vec<Platform>);

fn parse_platforms(value: &str) -> Result<PlatformList, String> {
    let platforms = value
        .split(',')
        .filter(|name| !name.trim().is_empty())
        .map(parse_platform)
        .collect::<Result<Vec<_>, _>>()?;
    if platforms.is_empty() {
        return Err("至少需要一个平台".to_string());
    }
    Ok(PlatformList(platforms))
}

fn parse_platform(value: &str) -> Result<Platform, String> {
    Platform::from_name(value).ok_or_else(|| format!("不支持的平台: {}", value))
}

fn parse_date_posted(value: &str) -> Result<DatePosted, String> {
    DatePosted::from_name(value).ok_or_else(|| format!("无法识别的发布时间: {}", value))
}
