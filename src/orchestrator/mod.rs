//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (多平台抓取 / Vec<ApplyJob>)
//!     ↓
//! workflow::ScrapeFlow / workflow::ApplyFlow (单个平台 / 单个岗位)
//!     ↓
//! platforms (站点适配) + services (去重 / 映射 / 上报)
//!     ↓
//! browser + infrastructure (会话、节流)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：每次抓取、每次申请独占一个浏览器会话
//! 2. **向下依赖**：编排层 → workflow → services / platforms → infrastructure
//! 3. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod batch_processor;

pub use batch_processor::{pair_jobs, App, ApplyJob, ProcessingStats};
