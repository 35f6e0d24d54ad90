//! LinkedIn 适配器
//!
//! 搜索走 `/jobs/search/` 的查询参数语法，申请只支持站内的 Easy Apply 弹窗；
//! 普通 "Apply" 按钮会跳到公司官网，按外部跳转处理。

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::block::BlockMarker;
use super::common;
use super::PlatformAdapter;
use crate::browser::{css, label, text, Locator, Session};
use crate::error::AppResult;
use crate::models::{Credentials, DetectedField, JobPosting, Platform, SearchFilters, Seniority};
use crate::parser::{DocumentParser, ExtractionRules, FieldRule};

const SEARCH_URL: &str = "https://www.linkedin.com/jobs/search/";
const LOGIN_URL: &str = "https://www.linkedin.com/login";

const CARDS: &[Locator] = &[
    css("ul.jobs-search__results-list > li"),
    css("li.jobs-search-results__list-item"),
    css("div.job-search-card"),
    css("div.base-card"),
];
const CARD_ID: &[Locator] = &[css("[data-entity-urn]"), css("[data-job-id]")];
const CARD_ID_FROM_JOB: &[Locator] = &[css("[data-job-id]")];
const TITLE: &[Locator] = &[
    css("h3.base-search-card__title"),
    css(".job-card-list__title"),
    css("a.job-card-container__link strong"),
];
const COMPANY: &[Locator] = &[
    css("h4.base-search-card__subtitle"),
    css(".job-card-container__primary-description"),
    css(".artdeco-entity-lockup__subtitle"),
];
const LOCATION: &[Locator] = &[
    css("span.job-search-card__location"),
    css(".job-card-container__metadata-item"),
    css(".artdeco-entity-lockup__caption"),
];
const LINK: &[Locator] = &[
    css("a.base-card__full-link"),
    css("a.job-card-container__link"),
    css("a[href*=\"/jobs/view/\"]"),
];
const SALARY: &[Locator] = &[
    css("span.job-search-card__salary-info"),
    css(".job-card-container__metadata-item--salary"),
];
const TAGS: &[Locator] = &[
    css("span.job-search-card__benefits"),
    css("li.job-card-container__footer-item"),
];
const POSTED: &[Locator] = &[css("time")];

const RULES: ExtractionRules = ExtractionRules {
    platform: Platform::LinkedIn,
    base_url: "https://www.linkedin.com",
    card: CARDS,
    id: Some(FieldRule::attr(CARD_ID, "data-entity-urn")),
    id_pattern: Some(r"(\d{6,})"),
    title: FieldRule::text(TITLE),
    company: FieldRule::text(COMPANY),
    location: FieldRule::text(LOCATION),
    link: FieldRule::attr(LINK, "href"),
    salary: Some(FieldRule::text(SALARY)),
    snippet: None,
    tags: Some(FieldRule::text(TAGS)),
    posted: Some(FieldRule::attr(POSTED, "datetime")),
};

/// 登录后的列表没有 `data-entity-urn`，退回到 `data-job-id`
const RULES_SIGNED_IN: ExtractionRules = ExtractionRules {
    id: Some(FieldRule::attr(CARD_ID_FROM_JOB, "data-job-id")),
    ..RULES
};

static NEXT_PAGE: &[Locator] = &[
    css("button[aria-label=\"View next page\"]"),
    css("button.infinite-scroller__show-more-button"),
    css("li.artdeco-pagination__indicator--number.active + li button"),
];

static USERNAME: &[Locator] = &[css("#username"), css("input[name=\"session_key\"]")];
static PASSWORD: &[Locator] = &[css("#password"), css("input[name=\"session_password\"]")];
static SIGN_IN: &[Locator] = &[
    css("button[type=\"submit\"][data-litms-control-urn=\"login-submit\"]"),
    css("form.login__form button[type=\"submit\"]"),
    text("button", "Sign in"),
];
static SIGNED_IN: &[Locator] = &[
    css("nav.global-nav"),
    css("img.global-nav__me-photo"),
    css("#global-nav"),
];

static EASY_APPLY: &[Locator] = &[
    css("button.jobs-apply-button[aria-label*=\"Easy Apply\"]"),
    css("div.jobs-apply-button--top-card button.jobs-apply-button"),
    text("button", "Easy Apply"),
];
static OFFSITE_APPLY: &[Locator] = &[
    css("button.jobs-apply-button[role=\"link\"]"),
    css("a[data-tracking-control-name=\"public_jobs_apply-link-offsite_sign-up-modal\"]"),
    css("a.apply-button--link[href^=\"http\"]"),
];
static FORM_SCOPE: &[Locator] = &[
    css("div.jobs-easy-apply-modal"),
    css("div.jobs-easy-apply-content"),
    css("div[role=\"dialog\"] form"),
];
static NEXT_STEP: &[Locator] = &[
    css("button[aria-label=\"Continue to next step\"]"),
    css("button[aria-label=\"Review your application\"]"),
    css("button[data-easy-apply-next-button]"),
    text("button", "Next"),
    text("button", "Review"),
];
static SUBMIT: &[Locator] = &[
    css("button[aria-label=\"Submit application\"]"),
    text("button", "Submit application"),
];
static COMPLETE: &[Locator] = &[
    css("div[data-test-modal-id=\"post-apply-modal\"]"),
    text("h3", "application was sent"),
    text("h2", "application was sent"),
];
static ERRORS: &[Locator] = &[
    css(".artdeco-inline-feedback--error .artdeco-inline-feedback__message"),
    css("[data-test-form-element-error-messages]"),
    css(".fb-dash-form-element-error"),
];
static RESUME_INPUT: &[Locator] = &[
    css("input[type=\"file\"][id*=\"jobs-document-upload\"]"),
    css("input[type=\"file\"][name=\"file\"]"),
    label("Upload resume"),
    css("input[type=\"file\"]"),
];
static POPUPS: &[Locator] = &[
    css("button[action-type=\"DENY\"]"),
    css("button.artdeco-global-alert-action"),
    css("button.contextual-sign-in-modal__modal-dismiss"),
    css("button.modal__dismiss"),
];
static BLOCK_MARKERS: &[BlockMarker] = &[
    BlockMarker::new("authwall", "LinkedIn auth wall"),
    BlockMarker::new("checkpoint/challenge", "LinkedIn security checkpoint"),
];

/// LinkedIn 适配器
#[derive(Debug, Default)]
pub struct LinkedInAdapter;

impl LinkedInAdapter {
    pub fn new() -> Self {
        Self
    }

    fn seniority_code(seniority: Seniority) -> &'static str {
        match seniority {
            Seniority::Internship => "1",
            Seniority::Entry => "2",
            Seniority::Associate => "3",
            Seniority::Mid | Seniority::Senior => "4",
            Seniority::Director => "5",
            Seniority::Executive => "6",
        }
    }

    /// 薪资档位：1 = $40k+，之后每档 +$20k，最高 9 = $200k+
    fn salary_bucket(min: u32) -> u32 {
        (min.saturating_sub(20_000) / 20_000).clamp(1, 9)
    }
}

#[async_trait]
impl PlatformAdapter for LinkedInAdapter {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn build_search_url(&self, filters: &SearchFilters) -> AppResult<String> {
        let keywords = common::require_keywords(self.platform(), filters)?;
        let mut params = vec![("keywords", keywords)];
        if let Some(location) = &filters.location {
            params.push(("location", location.clone()));
        }
        if filters.remote {
            params.push(("f_WT", "2".to_string()));
        }
        if let Some(date_posted) = filters.date_posted {
            params.push(("f_TPR", format!("r{}", date_posted.days() * 86_400)));
        }
        if let Some(seniority) = filters.seniority {
            params.push(("f_E", Self::seniority_code(seniority).to_string()));
        }
        if let Some(min) = filters.salary_min {
            params.push(("f_SB2", Self::salary_bucket(min).to_string()));
        }
        common::url_with_query(self.platform(), SEARCH_URL, &params)
    }

    fn parse_result_page(&self, html: &str, scraped_at: DateTime<Utc>) -> Vec<JobPosting> {
        let parser = DocumentParser::new(html);
        let postings = parser.parse_postings(&RULES, scraped_at);
        if postings.is_empty() {
            parser.parse_postings(&RULES_SIGNED_IN, scraped_at)
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
        common::fill_first(session, USERNAME, &credentials.username).await
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
        common::challenge_on_page(session, BLOCK_MARKERS).await
    }
}
