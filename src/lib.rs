//! # Job Autopilot
//!
//! 招聘平台自动化引擎：分页抓取岗位，驱动多步申请表单
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure / Browser）
//! - `infrastructure/` - `JsExecutor`（唯一的 page owner）、`ThrottleManager`（滑动窗口 + 最小间隔 + 抖动）
//! - `browser/` - `Session` 能力 trait 与 chromiumoxide 实现、有序定位策略
//!
//! ### ② 解析与适配（Parser / Platforms）
//! - `parser/` - 声明式抽取规则把 HTML 快照变成岗位、表单字段
//! - `platforms/` - 每个平台一个适配器，只描述"去哪找"，不含流程控制
//!
//! ### ③ 业务能力层（Services）
//! - 去重、筛选打分、字段映射、临时简历文件、状态上报、导出
//!
//! ### ④ 流程层（Workflow）
//! - `ScrapeFlow` - 抓取流水线
//! - `ApplyFlow` - 申请状态机
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 多平台抓取、批量并发申请
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod platforms;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{ChromeSession, Session};
pub use config::{Config, ScraperSessionConfig};
pub use error::{AppError, AppResult, ErrorKind};
pub use models::{JobPosting, Platform, SearchFilters, TailoredOutput};
pub use orchestrator::App;
pub use platforms::{adapter_for, PlatformAdapter};
pub use workflow::{ApplyFlow, ApplyState, FailureReason, ScrapeFlow};
