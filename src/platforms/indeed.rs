//! Indeed 适配器
//!
//! 申请走 Indeed Apply（`smartapply.indeed.com`，仍在 indeed.com 域名下）；
//! "Apply on company site" 视为外部跳转。

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::common;
use super::PlatformAdapter;
use crate::browser::{css, text, Locator, Session};
use crate::error::AppResult;
use crate::models::{Credentials, DetectedField, JobPosting, Platform, SearchFilters, Seniority};
use crate::parser::{DocumentParser, ExtractionRules, FieldRule};

const SEARCH_URL: &str = "https://www.indeed.com/jobs";
const LOGIN_URL: &str = "https://secure.indeed.com/auth";

const CARDS: &[Locator] = &[
    css("div.job_seen_beacon"),
    css("div.cardOutline"),
    css("a.tapItem"),
];
const CARD_ID: &[Locator] = &[css("a[data-jk]"), css("[data-jk]")];
const TITLE: &[Locator] = &[
    css("h2.jobTitle span[title]"),
    css("h2.jobTitle"),
    css("a.jcs-JobTitle"),
];
const COMPANY: &[Locator] = &[css("[data-testid=\"company-name\"]"), css("span.companyName")];
const LOCATION: &[Locator] = &[css("[data-testid=\"text-location\"]"), css("div.companyLocation")];
const LINK: &[Locator] = &[css("a.jcs-JobTitle"), css("h2.jobTitle a"), css("a[data-jk]")];
const SALARY: &[Locator] = &[
    css("div.salary-snippet-container"),
    css("div.metadata.salary-snippet-container"),
    css("[data-testid=\"attribute_snippet_testid\"].salary-snippet-container"),
    css(".salaryOnly"),
];
const SNIPPET: &[Locator] = &[css("div.job-snippet"), css("[data-testid=\"jobsnippet_footer\"]")];
const TAGS: &[Locator] = &[
    css("div.metadata:not(.salary-snippet-container) [data-testid=\"attribute_snippet_testid\"]"),
    css(".jobMetaDataGroup .attribute_snippet"),
];
const POSTED: &[Locator] = &[css("span.date"), css("[data-testid=\"myJobsStateDate\"]")];

const RULES: ExtractionRules = ExtractionRules {
    platform: Platform::Indeed,
    base_url: "https://www.indeed.com",
    card: CARDS,
    id: Some(FieldRule::attr(CARD_ID, "data-jk")),
    id_pattern: Some(r"^([0-9a-f]+)$|jk=([0-9a-f]+)"),
    title: FieldRule::text(TITLE),
    company: FieldRule::text(COMPANY),
    location: FieldRule::text(LOCATION),
    link: FieldRule::attr(LINK, "href"),
    salary: Some(FieldRule::text(SALARY)),
    snippet: Some(FieldRule::text(SNIPPET)),
    tags: Some(FieldRule::text(TAGS)),
    posted: Some(FieldRule::text(POSTED)),
};

static NEXT_PAGE: &[Locator] = &[
    css("a[data-testid=\"pagination-page-next\"]"),
    css("a[aria-label=\"Next Page\"]"),
    css("a[aria-label=\"Next\"]"),
];

static EMAIL: &[Locator] = &[css("input[type=\"email\"][name=\"__email\"]"), css("input[type=\"email\"]")];
static PASSWORD: &[Locator] = &[css("input[type=\"password\"][name=\"__password\"]"), css("input[type=\"password\"]")];
static CONTINUE: &[Locator] = &[
    css("button[data-tn-element=\"auth-page-email-submit-button\"]"),
    css("button[type=\"submit\"]"),
    text("button", "Continue"),
];
static SIGNED_IN: &[Locator] = &[
    css("[data-gnav-element-name=\"Profile\"]"),
    css("#AccountMenu"),
    css("a[href*=\"/account/view\"]"),
];

static APPLY: &[Locator] = &[
    css("#indeedApplyButton"),
    css("button[data-testid=\"indeedApplyButton\"]"),
    text("button", "Apply now"),
];
static OFFSITE_APPLY: &[Locator] = &[
    css("#applyButtonLinkContainer a"),
    css("button[aria-label*=\"company site\"]"),
    text("button", "Apply on company site"),
];
static FORM_SCOPE: &[Locator] = &[
    css("#ia-container form"),
    css("main.ia-BasePage-main"),
    css("div.ia-BasePage"),
];
static NEXT_STEP: &[Locator] = &[
    css("button[data-testid=\"continue-button\"]"),
    css("button.ia-continueButton"),
    text("button", "Continue"),
    text("button", "Review your application"),
];
static SUBMIT: &[Locator] = &[
    css("button[data-testid=\"submit-application-button\"]"),
    text("button", "Submit your application"),
];
static COMPLETE: &[Locator] = &[
    css("h1.ia-PostApply-header"),
    css("[data-testid=\"post-apply-page\"]"),
    text("h1", "application has been submitted"),
];
static ERRORS: &[Locator] = &[
    css("div.ia-Questions-item--error [role=\"alert\"]"),
    css("[data-testid*=\"error-message\"]"),
    css(".ia-ErrorText"),
];
static RESUME_INPUT: &[Locator] = &[
    css("input[type=\"file\"][data-testid=\"resume-upload-input\"]"),
    css("input[type=\"file\"][accept*=\"pdf\"]"),
    css("input[type=\"file\"]"),
];
static POPUPS: &[Locator] = &[
    css("#onetrust-accept-btn-handler"),
    css("button.icl-CloseButton"),
    css("button.popover-x-button-close"),
    css("button[aria-label=\"close\"]"),
];

/// Indeed 适配器
#[derive(Debug, Default)]
pub struct IndeedAdapter;

impl IndeedAdapter {
    pub fn new() -> Self {
        Self
    }

    fn experience_level(seniority: Seniority) -> &'static str {
        match seniority {
            Seniority::Internship | Seniority::Entry => "ENTRY_LEVEL",
            Seniority::Associate | Seniority::Mid => "MID_LEVEL",
            Seniority::Senior | Seniority::Director | Seniority::Executive => "SENIOR_LEVEL",
        }
    }
}

#[async_trait]
impl PlatformAdapter for IndeedAdapter {
    fn platform(&self) -> Platform {
        Platform::Indeed
    }

    fn build_search_url(&self, filters: &SearchFilters) -> AppResult<String> {
        let keywords = common::require_keywords(self.platform(), filters)?;
        let mut params = vec![("q", keywords)];
        if let Some(location) = &filters.location {
            params.push(("l", location.clone()));
        }
        if let Some(date_posted) = filters.date_posted {
            params.push(("fromage", date_posted.days().to_string()));
        }
        if let Some(min) = filters.salary_min {
            params.push(("salaryType", format!("${}", min)));
        }

        let mut facets = String::new();
        if filters.remote {
            facets.push_str("attr(DSQF7)");
        }
        if let Some(seniority) = filters.seniority {
            facets.push_str(&format!("explvl({})", Self::experience_level(seniority)));
        }
        if !facets.is_empty() {
            params.push(("sc", format!("0kf:{};", facets)));
        }
        common::url_with_query(self.platform(), SEARCH_URL, &params)
    }

    fn parse_result_page(&self, html: &str, scraped_at: DateTime<Utc>) -> Vec<JobPosting> {
        DocumentParser::new(html).parse_postings(&RULES, scraped_at)
    }

    fn has_next_page(&self, html: &str) -> bool {
        DocumentParser::new(html).exists(NEXT_PAGE)
    }

    async fn advance_page(&self, session: &dyn Session) -> bool {
        common::click_enabled(session, NEXT_PAGE).await
    }

    /// 邮箱 → 继续 → 密码；账户只开了邮箱验证码时停在第二步，由登录超时收尾
    async fn login(&self, session: &dyn Session, credentials: &Credentials) -> bool {
        if !session.navigate(LOGIN_URL, session.default_timeout()).await {
            return false;
        }
        if self.is_logged_in(session).await {
            return true;
        }
        if !(common::fill_first(session, EMAIL, &credentials.username).await
            && common::click_enabled(session, CONTINUE).await)
        {
            return false;
        }
        if !common::control_visible(session, PASSWORD).await {
            return true;
        }
        common::fill_first(session, PASSWORD, credentials.password()).await
            && common::click_enabled(session, CONTINUE).await
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
        session.locate(APPLY).await.is_none() && session.locate(OFFSITE_APPLY).await.is_some()
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
