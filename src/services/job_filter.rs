//! 岗位筛选与打分
//!
//! 职责：
//! - 按目标职位、目标地区、最低薪资筛选抓取结果（忽略大小写的包含匹配）
//! - 从 Markdown 简历的 `## SKILLS` 段落提取技能
//! - 以描述中整词命中的不同技能数打分，按分数降序排列

use std::collections::HashSet;

use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::JobPosting;

/// 筛选条件；列表为空表示不按该项筛选
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobFilter {
    pub titles: Vec<String>,
    pub geos: Vec<String>,
    /// 设置后，没有可解析薪资的岗位会被剔除
    pub min_compensation: Option<f64>,
}

impl JobFilter {
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.geos.is_empty() && self.min_compensation.is_none()
    }

    pub fn apply(&self, postings: Vec<JobPosting>) -> Vec<JobPosting> {
        let titles = normalized(&self.titles);
        let geos = normalized(&self.geos);

        let after_title: Vec<JobPosting> = postings
            .into_iter()
            .filter(|p| contains_any(&p.title, &titles))
            .collect();
        info!("职位筛选后剩余 {} 个岗位", after_title.len());

        let after_geo: Vec<JobPosting> = after_title
            .into_iter()
            .filter(|p| contains_any(&p.location, &geos))
            .collect();
        info!("地区筛选后剩余 {} 个岗位", after_geo.len());

        let Some(min) = self.min_compensation else {
            return after_geo;
        };
        let after_comp: Vec<JobPosting> = after_geo
            .into_iter()
            .filter(|p| compensation(p).map(|c| c >= min).unwrap_or(false))
            .collect();
        info!("薪资筛选后剩余 {} 个岗位", after_comp.len());
        after_comp
    }
}

fn normalized(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    if needles.is_empty() {
        return true;
    }
    let haystack = haystack.trim().to_lowercase();
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

/// 用于比较的薪资：优先取下限，没有下限时取上限
fn compensation(posting: &JobPosting) -> Option<f64> {
    let range = posting.salary_range.as_ref()?;
    range.min.or(range.max)
}

/// 从 `## SKILLS` 段落中提取技能（小写、去空、逗号拆分）
///
/// 只认以 `-` 开头的列表项（允许缩进）；行内的连字符属于技能名本身
pub fn extract_skills(resume_markdown: &str) -> Vec<String> {
    let Ok(section_re) = Regex::new(r"(?is)##\s*SKILLS\s*\n(.*?)(?:\n##|\z)") else {
        return Vec::new();
    };
    let Some(section) = section_re.captures(resume_markdown).and_then(|c| c.get(1)) else {
        return Vec::new();
    };

    section
        .as_str()
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix('-'))
        .flat_map(|item| item.split(','))
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 打分后的岗位
#[derive(Debug, Clone)]
pub struct ScoredPosting {
    pub posting: JobPosting,
    pub score: usize,
}

/// 按技能命中数打分，分数降序（同分保持原顺序）
pub fn score_postings(postings: Vec<JobPosting>, resume_markdown: &str) -> Vec<ScoredPosting> {
    let skills = extract_skills(resume_markdown);
    if skills.is_empty() {
        warn!("⚠️ 简历中没有找到技能，所有岗位得分为 0");
        return postings
            .into_iter()
            .map(|posting| ScoredPosting { posting, score: 0 })
            .collect();
    }
    info!("按 {} 项技能打分: {:?}", skills.len(), skills);

    let alternatives = skills.iter().map(|s| regex::escape(s)).collect::<Vec<_>>().join("|");
    let Ok(pattern) = Regex::new(&format!(r"(?i)\b({})\b", alternatives)) else {
        warn!("技能正则构造失败，所有岗位得分为 0");
        return postings
            .into_iter()
            .map(|posting| ScoredPosting { posting, score: 0 })
            .collect();
    };

    let mut scored: Vec<ScoredPosting> = postings
        .into_iter()
        .map(|posting| {
            let description = posting.description.to_lowercase();
            let found: HashSet<&str> = pattern
                .find_iter(&description)
                .map(|m| m.as_str())
                .collect();
            ScoredPosting {
                score: found.len(),
                posting,
            }
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    info!("✅ 已按简历技能为 {} 个岗位打分", scored.len());
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, SalaryRange};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn posting(id: &str, title: &str, location: &str, description: &str, min: Option<f64>) -> JobPosting {
        JobPosting {
            id: Platform::Indeed.qualify_id(id),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: location.to_string(),
            description: description.to_string(),
            url: format!("https://example.com/{}", id),
            salary: None,
            salary_range: min.map(|m| SalaryRange {
                min: Some(m),
                max: None,
                currency: Some("USD".to_string()),
                period: None,
            }),
            tags: BTreeSet::new(),
            platform: Platform::Indeed,
            posted_at: None,
            scraped_at: Utc::now(),
        }
    }

    const RESUME: &str = "# Jane\n\n## SKILLS\n- Rust, Tokio\n- AI\n-  \n## EXPERIENCE\n- Rust at Acme\n";

    #[test]
    fn test_extract_skills_section_only() {
        assert_eq!(extract_skills(RESUME), vec!["rust", "tokio", "ai"]);
        assert!(extract_skills("# no skills here").is_empty());
        assert_eq!(extract_skills("## skills\n- Go"), vec!["go"]);
    }

    #[test]
    fn test_extract_skills_list_items_only() {
        let resume = "## SKILLS\n  - Event-driven design, CI/CD\n\t- Go\nLanguages - Python\n## EDUCATION\n";
        assert_eq!(
            extract_skills(resume),
            vec!["event-driven design", "ci/cd", "go"]
        );
    }

    #[test]
    fn test_filter_by_title_geo_and_compensation() {
        let filter = JobFilter {
            titles: vec!["Rust Engineer".into(), "backend".into()],
            geos: vec!["remote".into(), "Berlin".into()],
            min_compensation: Some(100_000.0),
        };
        let out = filter.apply(vec![
            posting("1", "Senior Rust Engineer", "Remote - US", "", Some(150_000.0)),
            posting("2", "Frontend Developer", "Remote", "", Some(150_000.0)),
            posting("3", "Backend Engineer", "Paris", "", Some(150_000.0)),
            posting("4", "Backend Engineer", "Berlin", "", Some(90_000.0)),
            posting("5", "Backend Engineer", "Berlin", "", None),
        ]);
        let ids: Vec<&str> = out.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["indeed:1"]);
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = JobFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(vec![posting("1", "x", "y", "", None)]).len(), 1);
    }

    #[test]
    fn test_score_counts_distinct_whole_words() {
        let scored = score_postings(
            vec![
                posting("1", "a", "", "We need a strait-laced person", None),
                posting("2", "b", "", "Rust and Tokio. More Rust! Some AI.", None),
                posting("3", "c", "", "Rust only", None),
            ],
            RESUME,
        );
        let pairs: Vec<(&str, usize)> = scored
            .iter()
            .map(|s| (s.posting.id.as_str(), s.score))
            .collect();
        assert_eq!(pairs, vec![("indeed:2", 3), ("indeed:3", 1), ("indeed:1", 0)]);
    }

    #[test]
    fn test_score_without_skills_is_zero() {
        let scored = score_postings(vec![posting("1", "a", "", "rust", None)], "no section");
        assert_eq!(scored[0].score, 0);
    }
}
