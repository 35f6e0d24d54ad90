//! 文档解析
//!
//! 职责：
//! - 按平台给出的提取规则，把列表页 HTML 变成 `JobPosting`
//! - 提取申请表单当前步骤的输入控件
//! - 为适配器提供"是否存在"、"取第一段文本"这类纯查询
//!
//! 解析是纯函数：输入 HTML 字符串，不访问浏览器，不会 panic。
//! `Html` 不是 `Send`，所以解析器只在同步代码里短暂存在，不要跨 `.await` 持有。

pub mod dates;
pub mod form;
pub mod salary;

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::browser::Locator;
use crate::models::{JobPosting, Platform};

pub use dates::parse_posted;
pub use salary::parse_salary;

/// 字段值的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    /// 元素可见文本（空白折叠）
    Text,
    /// 元素属性
    Attr(&'static str),
}

/// 单个字段的提取规则
///
/// `locators` 为空（[`CARD_ITSELF`]）时取卡片元素本身
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub locators: &'static [Locator],
    pub source: TextSource,
}

impl FieldRule {
    pub const fn text(locators: &'static [Locator]) -> Self {
        Self {
            locators,
            source: TextSource::Text,
        }
    }

    pub const fn attr(locators: &'static [Locator], name: &'static str) -> Self {
        Self {
            locators,
            source: TextSource::Attr(name),
        }
    }
}

/// 读取卡片元素自身
pub const CARD_ITSELF: &[Locator] = &[];

/// 列表页提取规则，由各平台适配器以 `static` 形式提供
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRules {
    pub platform: Platform,
    /// 相对链接的基准地址
    pub base_url: &'static str,
    /// 岗位卡片；按顺序尝试，第一个有命中的定位策略生效
    pub card: &'static [Locator],
    pub id: Option<FieldRule>,
    /// 从 id 原值或链接中取平台原始 ID 的正则（取第一个捕获组）
    pub id_pattern: Option<&'static str>,
    pub title: FieldRule,
    pub company: FieldRule,
    pub location: FieldRule,
    pub link: FieldRule,
    pub salary: Option<FieldRule>,
    pub snippet: Option<FieldRule>,
    pub tags: Option<FieldRule>,
    pub posted: Option<FieldRule>,
}

/// 持有一次解析的 DOM
pub struct DocumentParser {
    document: Html,
}

impl DocumentParser {
    pub fn new(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    fn root(&self) -> ElementRef<'_> {
        self.document.root_element()
    }

    /// 任一定位策略在文档中有命中
    pub fn exists(&self, locators: &[Locator]) -> bool {
        locators
            .iter()
            .any(|locator| !find_all(self.root(), self.root(), locator).is_empty())
    }

    /// 第一个命中元素的文本
    pub fn first_text(&self, locators: &[Locator]) -> Option<String> {
        first_match(self.root(), self.root(), locators)
            .map(element_text)
            .filter(|t| !t.is_empty())
    }

    /// 第一个命中元素的属性值
    pub fn first_attr(&self, locators: &[Locator], name: &str) -> Option<String> {
        locators
            .iter()
            .flat_map(|locator| find_all(self.root(), self.root(), locator))
            .find_map(|el| el.value().attr(name).map(str::trim).filter(|v| !v.is_empty()).map(str::to_string))
    }

    /// 第一个有命中的定位策略下所有元素的文本
    pub fn all_texts(&self, locators: &[Locator]) -> Vec<String> {
        for locator in locators {
            let texts: Vec<String> = find_all(self.root(), self.root(), locator)
                .into_iter()
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect();
            if !texts.is_empty() {
                return texts;
            }
        }
        Vec::new()
    }

    /// 按规则提取岗位列表
    ///
    /// 缺少 id 或链接的卡片直接跳过；同一页内重复的 id 只保留第一个
    pub fn parse_postings(&self, rules: &ExtractionRules, scraped_at: DateTime<Utc>) -> Vec<JobPosting> {
        let root = self.root();
        let cards = rules
            .card
            .iter()
            .map(|locator| find_all(root, root, locator))
            .find(|cards| !cards.is_empty())
            .unwrap_or_default();

        if cards.is_empty() {
            debug!("[{}] 页面中没有找到岗位卡片", rules.platform);
            return Vec::new();
        }

        let id_re = match rules.id_pattern.map(Regex::new).transpose() {
            Ok(re) => re,
            Err(e) => {
                warn!("[{}] id 正则无效: {}", rules.platform, e);
                None
            }
        };

        let mut seen = HashSet::new();
        let mut postings = Vec::with_capacity(cards.len());
        let mut skipped = 0usize;

        for card in cards {
            match self.parse_card(card, rules, id_re.as_ref(), scraped_at) {
                Some(posting) if seen.insert(posting.id.clone()) => postings.push(posting),
                Some(_) => {}
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(
                "[{}] 跳过 {} 张缺少 id 或链接的卡片",
                rules.platform, skipped
            );
        }
        postings
    }

    fn parse_card(
        &self,
        card: ElementRef<'_>,
        rules: &ExtractionRules,
        id_re: Option<&Regex>,
        scraped_at: DateTime<Utc>,
    ) -> Option<JobPosting> {
        let root = self.root();
        let field = |rule: &FieldRule| extract_field(card, root, rule);

        let url = field(&rules.link).and_then(|href| resolve_url(rules.base_url, &href))?;

        let raw_id = rules
            .id
            .as_ref()
            .and_then(|rule| field(rule))
            .and_then(|value| match id_re {
                Some(re) => capture_first(re, &value),
                None => Some(value),
            })
            .or_else(|| id_re.and_then(|re| capture_first(re, &url)))
            .filter(|id| !id.trim().is_empty())?;

        let salary = rules.salary.as_ref().and_then(|rule| field(rule));
        let salary_range = salary.as_deref().and_then(parse_salary);
        let posted_at = rules
            .posted
            .as_ref()
            .and_then(|rule| field(rule))
            .and_then(|text| parse_posted(&text, scraped_at));
        let tags: BTreeSet<String> = rules
            .tags
            .as_ref()
            .map(|rule| extract_all(card, root, rule))
            .unwrap_or_default()
            .into_iter()
            .collect();

        Some(JobPosting {
            id: rules.platform.qualify_id(raw_id.trim()),
            title: field(&rules.title).unwrap_or_default(),
            company: field(&rules.company).unwrap_or_default(),
            location: field(&rules.location).unwrap_or_default(),
            description: rules
                .snippet
                .as_ref()
                .and_then(|rule| field(rule))
                .unwrap_or_default(),
            url,
            salary,
            salary_range,
            tags,
            platform: rules.platform,
            posted_at,
            scraped_at,
        })
    }
}

/// 对 `scope` 应用单个定位策略；`root` 用于 label 的 `for` 查找
fn find_all<'a>(scope: ElementRef<'a>, root: ElementRef<'a>, locator: &Locator) -> Vec<ElementRef<'a>> {
    match locator {
        Locator::Css(selector) => match Selector::parse(selector) {
            Ok(sel) => scope.select(&sel).collect(),
            Err(e) => {
                debug!("无效的选择器 {}: {:?}", selector, e);
                Vec::new()
            }
        },
        Locator::Text { tag, text } => {
            let Ok(sel) = Selector::parse(tag) else {
                return Vec::new();
            };
            let needle = text.to_lowercase();
            scope
                .select(&sel)
                .filter(|el| element_text(*el).to_lowercase().contains(&needle))
                .collect()
        }
        Locator::Label(text) => {
            let Ok(label_sel) = Selector::parse("label") else {
                return Vec::new();
            };
            let needle = text.to_lowercase();
            scope
                .select(&label_sel)
                .filter(|label| element_text(*label).to_lowercase().contains(&needle))
                .filter_map(|label| labelled_control(label, root))
                .collect()
        }
    }
}

fn first_match<'a>(scope: ElementRef<'a>, root: ElementRef<'a>, locators: &[Locator]) -> Option<ElementRef<'a>> {
    locators
        .iter()
        .find_map(|locator| find_all(scope, root, locator).into_iter().next())
}

/// label 关联的控件：先看 `for`，再看嵌套
pub(crate) fn labelled_control<'a>(label: ElementRef<'a>, root: ElementRef<'a>) -> Option<ElementRef<'a>> {
    if let Some(target) = label.value().attr("for") {
        let sel = Selector::parse(&attr_selector("id", target)).ok()?;
        if let Some(control) = root.select(&sel).next() {
            return Some(control);
        }
    }
    let sel = Selector::parse("input, select, textarea").ok()?;
    label.select(&sel).next()
}

fn extract_field(card: ElementRef<'_>, root: ElementRef<'_>, rule: &FieldRule) -> Option<String> {
    let element = if rule.locators.is_empty() {
        Some(card)
    } else {
        first_match(card, root, rule.locators)
    }?;
    read_source(element, rule.source)
}

fn extract_all(card: ElementRef<'_>, root: ElementRef<'_>, rule: &FieldRule) -> Vec<String> {
    rule.locators
        .iter()
        .map(|locator| {
            find_all(card, root, locator)
                .into_iter()
                .filter_map(|el| read_source(el, rule.source))
                .collect::<Vec<_>>()
        })
        .find(|values| !values.is_empty())
        .unwrap_or_default()
}

fn read_source(element: ElementRef<'_>, source: TextSource) -> Option<String> {
    let value = match source {
        TextSource::Text => element_text(element),
        TextSource::Attr(name) => element.value().attr(name)?.trim().to_string(),
    };
    (!value.is_empty()).then_some(value)
}

/// 元素文本，空白折叠为单个空格
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 生成属性等值选择器，值中的引号和反斜杠会被转义
pub(crate) fn attr_selector(attr: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[{}=\"{}\"]", attr, escaped)
}

/// 第一个参与匹配的捕获组；正则没有捕获组时取整体匹配
fn capture_first(re: &Regex, haystack: &str) -> Option<String> {
    let caps = re.captures(haystack)?;
    caps.iter()
        .skip(1)
        .flatten()
        .next()
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().to_string())
}

/// 把相对链接解析为绝对地址；`javascript:` 等无效链接返回 None
fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let resolved = match Url::parse(href) {
        Ok(url) => url,
        Err(_) => Url::parse(base).ok()?.join(href).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
