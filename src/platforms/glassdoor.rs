//! Glassdoor 适配器
//!
//! Easy Apply 会把表单交给 Indeed Apply，所以 indeed.com 也算平台内；
//! "Apply on employer site" 视为外部跳转。

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::common;
use super::PlatformAdapter;
use crate::browser::{css, text, Locator, Session};
use crate::error::AppResult;
use crate::models::{Credentials, DetectedField, JobPosting, Platform, SearchFilters, Seniority};
use crate::parser::{DocumentParser, ExtractionRules, FieldRule};

const SEARCH_URL: &str = "https://www.glassdoor.com/Job/jobs.htm";
const LOGIN_URL: &str = "https://www.glassdoor.com/profile/login_input.htm";

/// 申请流程内允许停留的域名
const APPLY_HOSTS: &[&str] = &["glassdoor.com", "glassdoor.co.uk", "indeed.com"];

const CARDS: &[Locator] = &[
    css("li[data-test=\"jobListing\"]"),
    css("li.react-job-listing"),
    css("[data-test=\"jobListing\"]"),
];
const CARD_ID: &[Locator] = &[css("[data-jobid]")];
const TITLE: &[Locator] = &[
    css("a[data-test=\"job-title\"]"),
    css("a[data-test=\"job-link\"] span"),
    css("a.jobLink span"),
];
const COMPANY: &[Locator] = &[
    css("[data-test=\"employer-name\"]"),
    css("span[class*=\"EmployerProfile_compactEmployerName\"]"),
    css(".jobEmpolyerName"),
];
const LOCATION: &[Locator] = &[css("[data-test=\"emp-location\"]"), css(".location")];
const LINK: &[Locator] = &[
    css("a[data-test=\"job-title\"]"),
    css("a[data-test=\"job-link\"]"),
    css("a.jobLink"),
];
const SALARY: &[Locator] = &[css("[data-test=\"detailSalary\"]"), css(".salary-estimate")];
const SNIPPET: &[Locator] = &[css("[data-test=\"descSnippet\"]")];
const POSTED: &[Locator] = &[css("[data-test=\"job-age\"]"), css(".listing-age")];

const RULES: ExtractionRules = ExtractionRules {
    platform: Platform::Glassdoor,
    base_url: "https://www.glassdoor.com",
    card: CARDS,
    id: Some(FieldRule::attr(CARD_ID, "data-jobid")),
    id_pattern: Some(r"^(\d+)$|jl=(\d+)"),
    title: FieldRule::text(TITLE),
    company: FieldRule::text(COMPANY),
    location: FieldRule::text(LOCATION),
    link: FieldRule::attr(LINK, "href"),
    salary: Some(FieldRule::text(SALARY)),
    snippet: Some(FieldRule::text(SNIPPET)),
    tags: None,
    posted: Some(FieldRule::text(POSTED)),
};

/// 卡片自身带 `data-jobid` 时的规则
const RULES_CARD_ID: ExtractionRules = ExtractionRules {
    id: Some(FieldRule::attr(crate::parser::CARD_ITSELF, "data-jobid")),
    ..RULES
};

static NEXT_PAGE: &[Locator] = &[
    css("button[data-test=\"load-more\"]"),
    css("button[data-test=\"pagination-next\"]"),
    css("[data-test=\"pagination-next\"]"),
];

static EMAIL: &[Locator] = &[css("#inlineUserEmail"), css("input[name=\"username\"]")];
static EMAIL_CONTINUE: &[Locator] = &[
    css("button[data-test=\"email-form-button\"]"),
    text("button", "Continue with email"),
];
static PASSWORD: &[Locator] = &[css("#inlineUserPassword"), css("input[name=\"password\"]")];
static SIGN_IN: &[Locator] = &[css("button[type=\"submit\"]"), text("button", "Sign in")];
static SIGNED_IN: &[Locator] = &[
    css("[data-test=\"user-profile-dropdown-trigger\"]"),
    css("a[href*=\"/member/profile\"]"),
];

static EASY_APPLY: &[Locator] = &[
    css("button[data-test=\"easyApply\"]"),
    text("button", "Easy Apply"),
];
static OFFSITE_APPLY: &[Locator] = &[
    css("a[data-test=\"applyButton\"]"),
    css("button[data-test=\"applyButton\"]"),
    text("button", "Apply on employer site"),
];
static FORM_SCOPE: &[Locator] = &[
    css("#ia-container form"),
    css("main.ia-BasePage-main"),
    css("form[data-test=\"apply-form\"]"),
];
static NEXT_STEP: &[Locator] = &[
    css("button[data-testid=\"continue-button\"]"),
    css("button.ia-continueButton"),
    text("button", "Continue"),
];
static SUBMIT: &[Locator] = &[
    css("button[data-testid=\"submit-application-button\"]"),
    text("button", "Submit your application"),
    text("button", "Submit application"),
];
static COMPLETE: &[Locator] = &[
    css("h1.ia-PostApply-header"),
    text("h1", "application has been submitted"),
    css("[data-test=\"applied-confirmation\"]"),
];
static ERRORS: &[Locator] = &[
    css("div.ia-Questions-item--error [role=\"alert\"]"),
    css("[data-test=\"form-error\"]"),
    css(".ia-ErrorText"),
];
static RESUME_INPUT: &[Locator] = &[
    css("input[type=\"file\"][data-testid=\"resume-upload-input\"]"),
    css("input[type=\"file\"]"),
];
static POPUPS: &[Locator] = &[
    css("#onetrust-accept-btn-handler"),
    css("button.CloseButton"),
    css("button[data-test=\"job-alert-modal-close\"]"),
    css("button.modal_closeIcon"),
];

/// Glassdoor 适配器
#[derive(Debug, Default)]
pub struct GlassdoorAdapter;

impl GlassdoorAdapter {
    pub fn new() -> Self {
        Self
    }

    fn seniority_type(seniority: Seniority) -> &'static str {
        match seniority {
            Seniority::Internship => "internship",
            Seniority::Entry => "entrylevel",
            Seniority::Associate | Seniority::Mid | Seniority::Senior => "midseniorlevel",
            Seniority::Director => "director",
            Seniority::Executive => "executive",
        }
    }
}

#[async_trait]
impl PlatformAdapter for GlassdoorAdapter {
    fn platform(&self) -> Platform {
        Platform::Glassdoor
    }

    fn build_search_url(&self, filters: &SearchFilters) -> AppResult<String> {
        let keywords = common::require_keywords(self.platform(), filters)?;
        let mut params = vec![("sc.keyword", keywords)];
        if let Some(location) = &filters.location {
            params.push(("locKeyword", location.clone()));
        }
        if filters.remote {
            params.push(("remoteWorkType", "1".to_string()));
        }
        if let Some(date_posted) = filters.date_posted {
            params.push(("fromAge", date_posted.days().to_string()));
        }
        if let Some(min) = filters.salary_min {
            params.push(("minSalary", min.to_string()));
        }
        if let Some(max) = filters.salary_max {
            params.push(("maxSalary", max.to_string()));
        }
        if let Some(seniority) = filters.seniority {
            params.push(("seniorityType", Self::seniority_type(seniority).to_string()));
        }
        common::url_with_query(self.platform(), SEARCH_URL, &params)
    }

    fn parse_result_page(&self, html: &str, scraped_at: DateTime<Utc>) -> Vec<JobPosting> {
        let parser = DocumentParser::new(html);
        let postings = parser.parse_postings(&RULES_CARD_ID, scraped_at);
        if postings.is_empty() {
            parser.parse_postings(&RULES, scraped_at)
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
            && common::click_enabled(session, EMAIL_CONTINUE).await
            && common::control_visible(session, PASSWORD).await
            && common::fill_first(session, PASSWORD, credentials.password()).await
            && common::click_enabled(session, SIGN_IN).await
    }

    async fn is_logged_in(&self, session: &dyn Session) -> bool {
        session.locate(SIGNED_IN).await.is_some()
    }

    async fn is_on_platform(&self, session: &dyn Session) -> bool {
        common::on_hosts(session, APPLY_HOSTS).await
    }

    async fn open_application(&self, session: &dyn Session) -> bool {
        common::click_enabled(session, EASY_APPLY).await
    }

    async fn detect_application_form(&self, session: &dyn Session) -> bool {
        common::control_visible(session, FORM_SCOPE).await
    }

    async fn is_external_redirect(&self, session: &dyn Session) -> bool {
        if !self.is_on_platform(session).await {
            return true;
        }
        session.locate(EASY_APPLY).await.is_none() && session.locate(OFFSITE_APPLY).await.is_some()
    }

    async fn external_target(&self, session: &dyn Session) -> Option<String> {
        if let Some(target) = common::external_url_target(session, APPLY_HOSTS).await {
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
