//! 反自动化拦截识别与外部 ATS 识别
//!
//! 两张表都是纯数据：
//! - 拦截标记：出现在页面 HTML 或标题里的挑战页特征（验证码、"verify you are human"、429 页面）
//! - ATS 主机表：申请动作跳到这些域名时视为离开平台可自动化的范围
//!
//! 识别只用于报告，永远不尝试绕过。

use phf::phf_map;
use url::Url;

/// 一条拦截特征，`needle` 以小写形式匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMarker {
    pub needle: &'static str,
    pub label: &'static str,
}

impl BlockMarker {
    pub const fn new(needle: &'static str, label: &'static str) -> Self {
        Self { needle, label }
    }
}

/// 各平台通用的挑战页特征
pub static CHALLENGE_MARKERS: &[BlockMarker] = &[
    BlockMarker::new("g-recaptcha", "reCAPTCHA challenge"),
    BlockMarker::new("recaptcha/api", "reCAPTCHA challenge"),
    BlockMarker::new("hcaptcha.com", "hCaptcha challenge"),
    BlockMarker::new("h-captcha", "hCaptcha challenge"),
    BlockMarker::new("challenges.cloudflare.com", "Cloudflare challenge"),
    BlockMarker::new("cf-challenge", "Cloudflare challenge"),
    BlockMarker::new("px-captcha", "PerimeterX challenge"),
    BlockMarker::new("verify you are human", "human verification"),
    BlockMarker::new("are you a robot", "human verification"),
    BlockMarker::new("unusual traffic", "unusual traffic notice"),
    BlockMarker::new("access denied", "access denied page"),
    BlockMarker::new("too many requests", "HTTP 429 page"),
];

/// 挑战页常见的标题
static CHALLENGE_TITLES: &[BlockMarker] = &[
    BlockMarker::new("just a moment", "Cloudflare interstitial"),
    BlockMarker::new("attention required", "Cloudflare interstitial"),
    BlockMarker::new("security check", "security check page"),
    BlockMarker::new("access to this page has been denied", "PerimeterX block"),
    BlockMarker::new("too many requests", "HTTP 429 page"),
];

/// 在页面快照中查找拦截特征，返回可读描述
///
/// `extra` 为平台自己的特征，优先于通用特征
pub fn detect_challenge(html: &str, title: Option<&str>, extra: &[BlockMarker]) -> Option<String> {
    if let Some(title) = title {
        let title = title.to_lowercase();
        if let Some(marker) = CHALLENGE_TITLES.iter().find(|m| title.contains(m.needle)) {
            return Some(format!("{} (title: {:?})", marker.label, title.trim()));
        }
    }

    let lower = html.to_lowercase();
    extra
        .iter()
        .chain(CHALLENGE_MARKERS.iter())
        .find(|m| lower.contains(m.needle))
        .map(|m| format!("{} (marker: {})", m.label, m.needle))
}

/// 已知的第三方 ATS 域名
static ATS_HOSTS: phf::Map<&'static str, &'static str> = phf_map! {
    "greenhouse.io" => "Greenhouse",
    "lever.co" => "Lever",
    "myworkdayjobs.com" => "Workday",
    "myworkdaysite.com" => "Workday",
    "icims.com" => "iCIMS",
    "smartrecruiters.com" => "SmartRecruiters",
    "ashbyhq.com" => "Ashby",
    "taleo.net" => "Taleo",
    "bamboohr.com" => "BambooHR",
    "jobvite.com" => "Jobvite",
};

/// URL 的小写主机名
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
}

/// 主机名是否属于给定域名后缀之一（`jobs.lever.co` 属于 `lever.co`）
pub fn host_matches(url: &str, suffixes: &[&str]) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };
    suffixes
        .iter()
        .any(|suffix| host == *suffix || host.ends_with(&format!(".{}", suffix)))
}

/// 识别 URL 指向的 ATS 名称
pub fn ats_name(url: &str) -> Option<&'static str> {
    let host = host_of(url)?;
    let mut candidate = host.as_str();
    loop {
        if let Some(name) = ATS_HOSTS.get(candidate) {
            return Some(*name);
        }
        let (_, rest) = candidate.split_once('.')?;
        candidate = rest;
    }
}

/// 外部跳转的可读描述，写进 `Unsupported` 的 details
pub fn describe_external(url: &str) -> String {
    match ats_name(url) {
        Some(ats) => format!("external ATS {} ({})", ats, url),
        None => match host_of(url) {
            Some(host) => format!("external site {}", host),
            None => "external application site".to_string(),
        },
    }
}
