//! Wellfound（原 AngelList Talent）适配器
//!
//! 搜索用路径语法：`/role/<角色>`、远程 `/role/r/<角色>`、地点 `/role/l/<角色>/<地点>`，
//! 发布时间、薪资、资历没有对应的 URL 参数。申请是单步弹窗，带一段给招聘方的留言。

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use url::Url;

use super::common;
use super::PlatformAdapter;
use crate::browser::{css, text, Locator, Session};
use crate::error::{AppResult, PlatformError};
use crate::models::{Credentials, DetectedField, JobPosting, Platform, SearchFilters};
use crate::parser::{DocumentParser, ExtractionRules, FieldRule};

const BASE_URL: &str = "https://wellfound.com";
const LOGIN_URL: &str = "https://wellfound.com/login";

const CARDS: &[Locator] = &[
    css("[data-test=\"JobSearchResult\"]"),
    css("div[class*=\"styles_jobListing\"]"),
    css("div[data-test=\"StartupResult\"] a[href*=\"/jobs/\"]"),
];
const TITLE: &[Locator] = &[
    css("[data-test=\"JobTitle\"]"),
    css("a[href*=\"/jobs/\"] span"),
    css("a[href*=\"/jobs/\"]"),
];
const COMPANY: &[Locator] = &[
    css("[data-test=\"StartupName\"]"),
    css("a[href^=\"/company/\"] h2"),
    css("a[href^=\"/company/\"]"),
];
const LOCATION: &[Locator] = &[css("[data-test=\"JobLocation\"]"), css("span[class*=\"location\"]")];
const LINK: &[Locator] = &[css("a[href*=\"/jobs/\"]")];
const LINK_SELF: &[Locator] = crate::parser::CARD_ITSELF;
const SALARY: &[Locator] = &[
    css("[data-test=\"JobCompensation\"]"),
    css("span[class*=\"compensation\"]"),
];
const TAGS: &[Locator] = &[css("span[class*=\"styles_tag\"]")];
const POSTED: &[Locator] = &[css("[data-test=\"JobPostedAt\"]"), css("span[class*=\"postedAt\"]")];

const RULES: ExtractionRules = ExtractionRules {
    platform: Platform::Wellfound,
    base_url: BASE_URL,
    card: CARDS,
    id: None,
    id_pattern: Some(r"/jobs/(\d+)"),
    title: FieldRule::text(TITLE),
    company: FieldRule::text(COMPANY),
    location: FieldRule::text(LOCATION),
    link: FieldRule::attr(LINK, "href"),
    salary: Some(FieldRule::text(SALARY)),
    snippet: None,
    tags: Some(FieldRule::text(TAGS)),
    posted: Some(FieldRule::text(POSTED)),
};

/// 卡片本身就是岗位链接时的规则
const RULES_LINK_CARD: ExtractionRules = ExtractionRules {
    title: FieldRule::text(LINK_SELF),
    link: FieldRule::attr(LINK_SELF, "href"),
    ..RULES
};

static NEXT_PAGE: &[Locator] = &[
    css("a[rel=\"next\"]"),
    css("button[data-test=\"LoadMoreButton\"]"),
    text("button", "Load more"),
];

static EMAIL: &[Locator] = &[css("#user_email"), css("input[name=\"user[email]\"]")];
static PASSWORD: &[Locator] = &[css("#user_password"), css("input[name=\"user[password]\"]")];
static SIGN_IN: &[Locator] = &[
    css("input[type=\"submit\"][name=\"commit\"]"),
    css("button[type=\"submit\"]"),
    text("button", "Log in"),
];
static SIGNED_IN: &[Locator] = &[
    css("[data-test=\"UserMenu\"]"),
    css("a[href=\"/jobs/applications\"]"),
];

static APPLY: &[Locator] = &[
    css("button[data-test=\"JobApplyButton\"]"),
    text("button", "Apply"),
];
static OFFSITE_APPLY: &[Locator] = &[
    css("a[data-test=\"ApplyOnCompanySite\"]"),
    text("a", "Apply on company website"),
];
static FORM_SCOPE: &[Locator] = &[
    css("form[data-test=\"JobApplicationForm\"]"),
    css("div[role=\"dialog\"] form"),
];
static NEXT_STEP: &[Locator] = &[css("button[data-test=\"JobApplicationModal--NextButton\"]"), text("button", "Next")];
static SUBMIT: &[Locator] = &[
    css("button[data-test=\"JobApplicationModal--SubmitButton\"]"),
    text("button", "Send application"),
];
static COMPLETE: &[Locator] = &[
    css("[data-test=\"JobApplicationModal--Success\"]"),
    text("h4", "Application sent"),
    text("button", "Applied"),
];
static ERRORS: &[Locator] = &[
    css("div[role=\"dialog\"] .text-critical"),
    css("[data-test*=\"FieldError\"]"),
    css("div[role=\"dialog\"] [role=\"alert\"]"),
];
static RESUME_INPUT: &[Locator] = &[css("input[type=\"file\"][name=\"resume\"]"), css("input[type=\"file\"]")];
static POPUPS: &[Locator] = &[
    css("#onetrust-accept-btn-handler"),
    css("button[data-test=\"CookieBanner--Accept\"]"),
];

/// Wellfound 适配器
#[derive(Debug, Default)]
pub struct WellfoundAdapter;

impl WellfoundAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlatformAdapter for WellfoundAdapter {
    fn platform(&self) -> Platform {
        Platform::Wellfound
    }

    fn build_search_url(&self, filters: &SearchFilters) -> AppResult<String> {
        let keywords = common::require_keywords(self.platform(), filters)?;
        let role = common::slugify(&keywords);

        let path = match (&filters.location, filters.remote) {
            (_, true) => format!("/role/r/{}", role),
            (Some(location), false) => format!("/role/l/{}/{}", role, common::slugify(location)),
            (None, false) => format!("/role/{}", role),
        };
        if filters.date_posted.is_some() || filters.salary_min.is_some() || filters.seniority.is_some() {
            debug!("[{}] 发布时间 / 薪资 / 资历条件不支持 URL 过滤，已忽略", self.platform());
        }

        let url = Url::parse(BASE_URL)
            .and_then(|base| base.join(&path))
            .map_err(|e| PlatformError::SearchUrl {
                platform: self.platform().as_str(),
                reason: e.to_string(),
            })?;
        Ok(url.to_string())
    }

    fn parse_result_page(&self, html: &str, scraped_at: DateTime<Utc>) -> Vec<JobPosting> {
        let parser = DocumentParser::new(html);
        let postings = parser.parse_postings(&RULES, scraped_at);
        if postings.is_empty() {
            parser.parse_postings(&RULES_LINK_CARD, scraped_at)
        } else {
            postings
        }
    }

    fn has_next_page(&self, html: &str) -> bool {
        DocumentParser::new(html).exists(NEXT_PAGE)
    }

    async fn advance_page(&self, session: &dyn Session) -> bool {
        common::click_enabled(session, NEXT_PAGE).await
    }

    async fn login(&self, session: &dyn Session, credentials: &Credentials) -> bool {
        if !session.navigate(LOGIN_URL, session.default_timeout()).await {
            return false;
        }
        if self.is_logged_in(session).await {
            return true;
        }
        common::fill_first(session, EMAIL, &credentials.username).await
            && common::fill_first(session, PASSWORD, credentials.password()).await
            && common::click_enabled(session, SIGN_IN).await
    }

    async fn is_logged_in(&self, session: &dyn Session) -> bool {
        session.locate(SIGNED_IN).await.is_some()
    }

    async fn is_on_platform(&self, session: &dyn Session) -> bool {
        common::on_hosts(session, self.platform().host_suffixes()).await
    }

    async fn open_application(&self, session: &dyn Session) -> bool {
        common::click_enabled(session, APPLY).await
    }

    async fn detect_application_form(&self, session: &dyn Session) -> bool {
        common::control_visible(session, FORM_SCOPE).await
    }

    async fn is_external_redirect(&self, session: &dyn Session) -> bool {
        if !self.is_on_platform(session).await {
            return true;
        }
        session.locate(OFFSITE_APPLY).await.is_some()
    }

    async fn external_target(&self, session: &dyn Session) -> Option<String> {
        if let Some(target) = common::external_url_target(session, self.platform().host_suffixes()).await {
            return Some(target);
        }
        common::snapshot_attr(session, OFFSITE_APPLY, "href")
            .await
            .map(|href| super::describe_external(&href))
    }

    async fn detect_fields(&self, session: &dyn Session) -> Vec<DetectedField> {
        common::snapshot_fields(session, FORM_SCOPE).await
    }

    async fn fill_field(&self, session: &dyn Session, field: &DetectedField, value: &str) -> bool {
        common::fill_detected(session, field, value).await
    }

    async fn upload_resume(&self, session: &dyn Session, path: &Path) -> bool {
        common::upload_to(session, RESUME_INPUT, path).await
    }

    async fn has_submit_control(&self, session: &dyn Session) -> bool {
        common::control_visible(session, SUBMIT).await
    }

    async fn has_next_control(&self, session: &dyn Session) -> bool {
        common::control_visible(session, NEXT_STEP).await
    }

    async fn navigate_to_next_step(&self, session: &dyn Session) -> bool {
        common::click_enabled(session, NEXT_STEP).await
    }

    async fn submit_application(&self, session: &dyn Session) -> bool {
        common::click_enabled(session, SUBMIT).await
    }

    async fn is_application_complete(&self, session: &dyn Session) -> bool {
        session.locate(COMPLETE).await.is_some()
    }

    async fn has_errors(&self, session: &dyn Session) -> Vec<String> {
        session.read_texts(ERRORS).await
    }

    async fn handle_popups(&self, session: &dyn Session) {
        common::dismiss_all(session, POPUPS).await;
    }

    async fn detect_block(&self, session: &dyn Session) -> Option<String> {
        common::challenge_on_page(session, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = r#"
        <div data-test="StartupResult">
          <a href="/company/ferrous"><h2>Ferrous Labs</h2></a>
          <div class="styles_jobListing__x1">
            <a href="/jobs/2876543-founding-rust-engineer"><span>Founding Rust Engineer</span></a>
            <span class="styles_location__a">Remote</span>
            <span class="styles_compensation__b">$140k – $180k • 0.5% – 1.0%</span>
          </div>
        </div>
    "#;

    const LINK_CARDS: &str = r#"
        <div data-test="StartupResult">
          <a href="/jobs/111222-backend-engineer">Backend Engineer</a>
          <a href="/jobs/333444-platform-engineer">Platform Engineer</a>
        </div>
    "#;

    #[test]
    fn test_parse_listing_cards() {
        let postings = WellfoundAdapter::new().parse_result_page(RESULTS, Utc::now());
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].id, "wellfound:2876543");
        assert_eq!(postings[0].title, "Founding Rust Engineer");
        assert_eq!(postings[0].url, "https://wellfound.com/jobs/2876543-founding-rust-engineer");
        assert_eq!(postings[0].salary_range.as_ref().and_then(|r| r.min), Some(140_000.0));
    }

    #[test]
    fn test_parse_link_cards() {
        let postings = WellfoundAdapter::new().parse_result_page(LINK_CARDS, Utc::now());
        let ids: Vec<&str> = postings.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["wellfound:111222", "wellfound:333444"]);
        assert_eq!(postings[1].title, "Platform Engineer");
    }

    #[test]
    fn test_search_url_paths() {
        let adapter = WellfoundAdapter::new();
        assert_eq!(
            adapter.build_search_url(&SearchFilters::new("Rust Engineer")).unwrap(),
            "https://wellfound.com/role/rust-engineer"
        );
        assert_eq!(
            adapter
                .build_search_url(&SearchFilters::new("rust").with_location("New York"))
                .unwrap(),
            "https://wellfound.com/role/l/rust/new-york"
        );
        assert_eq!(
            adapter
                .build_search_url(&SearchFilters::new("rust").remote(true))
                .unwrap(),
            "https://wellfound.com/role/r/rust"
        );
    }
}
