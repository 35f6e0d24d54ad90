//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **多平台抓取**：每个平台一个会话、一个节流器，并发执行，结果按优先级去重、筛选、按简历打分排序、导出
//! 2. **批量申请**：岗位与定制内容配对后分批处理，Semaphore 限制并发
//! 3. **资源管理**：每次申请创建独立会话，期限到了由流程层负责清理
//! 4. **全局统计**：汇总所有申请的结果
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个岗位的细节，交给 `workflow`
//! - **节流共享**：同一平台的并发申请共用一个节流器

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::browser::ChromeSession;
use crate::config::Config;
use crate::infrastructure::{SharedThrottle, ThrottleManager};
use crate::models::{load_all_tailored_outputs, Credentials, JobPosting, Platform, SearchFilters, TailoredOutput};
use crate::platforms::adapter_for;
use crate::services::{
    dedup_postings, export_file_name, export_postings, load_export, score_postings, StatusReporter,
};
use crate::utils::logging;
use crate::workflow::{
    ApplicationAttempt, ApplyFlow, ApplyRequest, ApplySettings, ApplyState, CancelSignal, ScrapeFlow,
};

/// 一个待申请的岗位及其定制内容
#[derive(Debug, Clone)]
pub struct ApplyJob {
    pub posting: JobPosting,
    pub tailored: TailoredOutput,
}

/// 应用主结构
pub struct App {
    config: Config,
    reporter: StatusReporter,
    cancel: CancelSignal,
}

impl App {
    pub fn new(config: Config) -> Self {
        logging::log_startup(&config);
        Self {
            reporter: StatusReporter::from_config(&config),
            config,
            cancel: CancelSignal::new(),
        }
    }

    /// 共享的取消信号，调用 `cancel()` 会在下一个步骤间隙停止所有任务
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// 多平台抓取 → 去重 → 筛选 → 排序 → 导出
    ///
    /// # 返回
    /// 最终的岗位列表与导出文件路径
    pub async fn scrape(
        &self,
        platforms: &[Platform],
        filters: &SearchFilters,
    ) -> Result<(Vec<JobPosting>, PathBuf)> {
        let mut handles = Vec::new();
        for &platform in platforms {
            let session_config = self.config.session.clone();
            let filters = filters.clone();
            let cancel = self.cancel.clone();

            let handle = tokio::spawn(async move {
                let throttle = ThrottleManager::from_session(&session_config).shared();
                let flow = ScrapeFlow::new(adapter_for(platform), throttle, &session_config);
                let mut session = ChromeSession::new(session_config);
                flow.run(&mut session, &filters, &cancel).await
            });
            handles.push((platform, handle));
        }

        let mut merged = Vec::new();
        for (platform, handle) in handles {
            match handle.await {
                Ok(Ok(outcome)) => merged.extend(outcome.postings),
                Ok(Err(e)) => error!("[抓取 {}] ❌ 抓取失败: {}", platform, e),
                Err(e) => error!("[抓取 {}] 任务执行失败: {}", platform, e),
            }
        }

        let postings = self.refine(merged).await;

        let source = match platforms {
            [single] => single.as_str(),
            _ => "merged",
        };
        let path = export_file_name(&self.config.export_dir, source, Utc::now());
        export_postings(&postings, &path, source)
            .await
            .with_context(|| format!("导出失败: {}", path.display()))?;

        Ok((postings, path))
    }

    /// 合并结果的后处理：去重 → 筛选 → 按主简历打分排序
    pub async fn refine(&self, merged: Vec<JobPosting>) -> Vec<JobPosting> {
        let total = merged.len();
        let unique = dedup_postings(merged, &self.config.platform_priority);
        info!("🧹 跨平台去重: {} → {}", total, unique.len());

        let filtered = if self.config.filter.is_empty() {
            unique
        } else {
            self.config.filter.apply(unique)
        };

        let Some(resume_path) = &self.config.master_resume else {
            return filtered;
        };
        let resume = match tokio::fs::read_to_string(resume_path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("⚠️ 无法读取主简历 {}，不排序: {}", resume_path.display(), e);
                return filtered;
            }
        };

        let scored = score_postings(filtered, &resume);
        for (rank, item) in scored.iter().take(5).enumerate() {
            info!(
                "🏅 #{} [{}分] {} @ {}",
                rank + 1,
                item.score,
                item.posting.title,
                item.posting.company
            );
        }
        scored.into_iter().map(|s| s.posting).collect()
    }

    /// 从导出文件和定制内容目录配对出待申请列表，然后批量申请
    pub async fn apply_from_export(&self, export_path: &Path) -> Result<ProcessingStats> {
        let document = load_export(export_path)
            .await
            .with_context(|| format!("无法读取导出文件: {}", export_path.display()))?;
        info!("\n📁 正在加载定制内容: {}", self.config.tailored_folder);
        let tailored = load_all_tailored_outputs(&self.config.tailored_folder).await?;

        let jobs = pair_jobs(document.jobs, tailored);
        if jobs.is_empty() {
            warn!("⚠️ 没有可申请的岗位（岗位与定制内容没有配对上），程序结束");
            return Ok(ProcessingStats::default());
        }
        self.apply_all(jobs).await
    }

    /// 批量申请
    pub async fn apply_all(&self, jobs: Vec<ApplyJob>) -> Result<ProcessingStats> {
        let max_concurrent = self.config.max_concurrent_attempts.max(1);
        logging::log_jobs_loaded(jobs.len(), max_concurrent, self.config.dry_run);

        let flows = self.build_flows(&jobs);
        let credentials: HashMap<Platform, Credentials> = flows
            .keys()
            .filter_map(|&p| Credentials::from_env(p).map(|c| (p, c)))
            .collect();

        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total = jobs.len();
        let total_batches = total.div_ceil(max_concurrent);
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        for batch_start in (0..total).step_by(max_concurrent) {
            if self.cancel.is_cancelled() {
                warn!("⏹️ 已取消，剩余 {} 个岗位不再处理", total - batch_start);
                stats.skipped += total - batch_start;
                break;
            }
            let batch_end = (batch_start + max_concurrent).min(total);
            let batch_num = batch_start / max_concurrent + 1;
            logging::log_batch_start(batch_num, total_batches, batch_start + 1, batch_end, total);

            let batch = self
                .process_batch(&jobs[batch_start..batch_end], &flows, &credentials, semaphore.clone())
                .await?;
            logging::log_batch_complete(batch_num, batch.success, batch.success + batch.failed + batch.unsupported);
            stats.absorb(&batch);
        }

        logging::print_final_stats(
            stats.success,
            stats.failed,
            stats.unsupported,
            stats.total,
            &self.config.status_log_file,
        );
        Ok(stats)
    }

    /// 每个平台一个申请流程，同平台共享节流器
    fn build_flows(&self, jobs: &[ApplyJob]) -> HashMap<Platform, Arc<ApplyFlow>> {
        let settings = ApplySettings::from_config(&self.config);
        let mut flows = HashMap::new();
        for job in jobs {
            flows.entry(job.posting.platform).or_insert_with(|| {
                let throttle: SharedThrottle = ThrottleManager::from_session(&self.config.session).shared();
                Arc::new(ApplyFlow::new(
                    adapter_for(job.posting.platform),
                    throttle,
                    self.reporter.clone(),
                    self.config.profile.clone(),
                    settings.clone(),
                ))
            });
        }
        flows
    }

    async fn process_batch(
        &self,
        batch: &[ApplyJob],
        flows: &HashMap<Platform, Arc<ApplyFlow>>,
        credentials: &HashMap<Platform, Credentials>,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut handles = Vec::new();

        for job in batch {
            let Some(flow) = flows.get(&job.posting.platform).cloned() else {
                continue;
            };
            let permit = semaphore.clone().acquire_owned().await?;
            let job = job.clone();
            let credentials = credentials.get(&job.posting.platform).cloned();
            let session_config = self.config.session.clone();
            let cancel = self.cancel.clone();
            let deadline = self.config.attempt_deadline();

            let job_id = job.posting.id.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                let mut session = ChromeSession::new(session_config);
                let request = ApplyRequest {
                    posting: &job.posting,
                    tailored: &job.tailored,
                    credentials: credentials.as_ref(),
                };
                flow.run(&mut session, &request, &cancel, Some(deadline)).await
            });
            handles.push((job_id, handle));
        }

        let mut result = BatchResult::default();
        for (job_id, handle) in handles {
            match handle.await {
                Ok(attempt) => result.record(&attempt),
                Err(e) => {
                    error!("[岗位 {}] 任务执行失败: {}", job_id, e);
                    result.failed += 1;
                }
            }
        }
        Ok(result)
    }
}

/// 按 job_id 配对；没有定制内容的岗位跳过
pub fn pair_jobs(postings: Vec<JobPosting>, tailored: Vec<TailoredOutput>) -> Vec<ApplyJob> {
    let mut by_id: HashMap<String, TailoredOutput> =
        tailored.into_iter().map(|t| (t.job_id.clone(), t)).collect();
    let mut jobs = Vec::new();
    for posting in postings {
        match by_id.remove(&posting.id) {
            Some(tailored) => jobs.push(ApplyJob { posting, tailored }),
            None => info!("[岗位 {}] 没有定制内容，跳过", posting.id),
        }
    }
    for orphan in by_id.keys() {
        warn!("[岗位 {}] 定制内容没有对应的岗位", orphan);
    }
    jobs
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub unsupported: usize,
    /// 因取消而没有开始的岗位
    pub skipped: usize,
    pub total: usize,
}

impl ProcessingStats {
    fn absorb(&mut self, batch: &BatchResult) {
        self.success += batch.success;
        self.failed += batch.failed;
        self.unsupported += batch.unsupported;
    }
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
    unsupported: usize,
}

impl BatchResult {
    fn record(&mut self, attempt: &ApplicationAttempt) {
        match attempt.status {
            ApplyState::Unsupported(_) => self.unsupported += 1,
            _ if attempt.is_success() => self.success += 1,
            _ => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResumePayload;
    use std::collections::BTreeSet;

    fn posting(id: &str) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            location: String::new(),
            description: String::new(),
            url: format!("https://www.linkedin.com/jobs/view/{}", id),
            salary: None,
            salary_range: None,
            tags: BTreeSet::new(),
            platform: Platform::LinkedIn,
            posted_at: None,
            scraped_at: Utc::now(),
        }
    }

    fn tailored(id: &str) -> TailoredOutput {
        TailoredOutput {
            job_id: id.to_string(),
            tailored_resume: ResumePayload::Text("resume".to_string()),
            cover_letter: None,
            outreach_message: None,
            confidence_score: 0.8,
        }
    }

    #[test]
    fn test_pair_jobs_keeps_posting_order() {
        let jobs = pair_jobs(
            vec![posting("linkedin:1"), posting("linkedin:2"), posting("linkedin:3")],
            vec![tailored("linkedin:3"), tailored("linkedin:1"), tailored("linkedin:9")],
        );
        let ids: Vec<&str> = jobs.iter().map(|j| j.posting.id.as_str()).collect();
        assert_eq!(ids, vec!["linkedin:1", "linkedin:3"]);
    }

    #[tokio::test]
    async fn test_refine_ranks_by_master_resume() {
        let dir = std::env::temp_dir().join(format!("job_autopilot_rank_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let resume = dir.join("master.md");
        std::fs::write(&resume, "# Ada\n\n## SKILLS\n- Rust, Tokio\n- Kubernetes\n").unwrap();

        let config = Config {
            master_resume: Some(resume),
            status_log_file: dir.join("status.jsonl").display().to_string(),
            ..Default::default()
        };
        let app = App::new(config);

        let mut weak = posting("linkedin:1");
        weak.company = "Weak".to_string();
        weak.description = "We use Java.".to_string();
        let mut strong = posting("linkedin:2");
        strong.company = "Strong".to_string();
        strong.description = "Rust and Tokio on Kubernetes".to_string();
        let mut medium = posting("linkedin:3");
        medium.company = "Medium".to_string();
        medium.description = "Some Rust".to_string();

        let ranked = app.refine(vec![weak, strong, medium]).await;
        let ids: Vec<&str> = ranked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["linkedin:2", "linkedin:3", "linkedin:1"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_refine_without_resume_keeps_order() {
        let app = App::new(Config::default());
        let mut other = posting("linkedin:2");
        other.company = "Other".to_string();
        let ranked = app.refine(vec![posting("linkedin:1"), other]).await;
        let ids: Vec<&str> = ranked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["linkedin:1", "linkedin:2"]);
    }

    #[test]
    fn test_batch_result_classifies_terminal_states() {
        let mut result = BatchResult::default();
        for state in [
            ApplyState::Complete,
            ApplyState::DryRun,
            ApplyState::Unsupported("external ATS Lever".into()),
            ApplyState::Failed(crate::workflow::FailureReason::FormNotFound),
        ] {
            let mut attempt = ApplicationAttempt::new(&posting("linkedin:1"));
            attempt.finish(state);
            result.record(&attempt);
        }
        assert_eq!((result.success, result.failed, result.unsupported), (2, 1, 1));

        let mut stats = ProcessingStats::default();
        stats.absorb(&result);
        assert_eq!(stats.success, 2);
    }
}
