//! 定位策略
//!
//! 适配器用有序的定位策略列表描述"去哪找"，按顺序尝试、第一个命中即返回。
//! 列表是纯数据，可以写成 `static`，也可以在运行时拼出来。

use std::borrow::Cow;

/// 单个定位策略
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// CSS 选择器
    Css(Cow<'static, str>),
    /// 指定标签，可见文本包含给定字符串（忽略大小写）
    Text {
        tag: Cow<'static, str>,
        text: Cow<'static, str>,
    },
    /// 通过 `<label>` 文本找到关联控件（`for` 属性或嵌套）
    Label(Cow<'static, str>),
}

pub const fn css(selector: &'static str) -> Locator {
    Locator::Css(Cow::Borrowed(selector))
}

pub const fn text(tag: &'static str, text: &'static str) -> Locator {
    Locator::Text {
        tag: Cow::Borrowed(tag),
        text: Cow::Borrowed(text),
    }
}

pub const fn label(text: &'static str) -> Locator {
    Locator::Label(Cow::Borrowed(text))
}

impl Locator {
    /// 运行时构造的 CSS 定位（如检测到的字段选择器）
    pub fn css_owned(selector: impl Into<String>) -> Self {
        Locator::Css(Cow::Owned(selector.into()))
    }

    /// 传给页面脚本的 (类型, 参数1, 参数2)
    pub fn script_args(&self) -> (&'static str, &str, &str) {
        match self {
            Locator::Css(selector) => ("css", selector, ""),
            Locator::Text { tag, text } => ("text", tag, text),
            Locator::Label(text) => ("label", text, ""),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css({})", selector),
            Locator::Text { tag, text } => write!(f, "text({} ~ {:?})", tag, text),
            Locator::Label(text) => write!(f, "label({:?})", text),
        }
    }
}

/// 已定位元素的句柄
///
/// `selector` 在当前页面内唯一指向该元素；页面重新渲染后句柄失效
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub selector: String,
    /// 命中的那条定位策略
    pub matched_by: Locator,
}

impl ElementHandle {
    pub fn new(selector: impl Into<String>, matched_by: Locator) -> Self {
        Self {
            selector: selector.into(),
            matched_by,
        }
    }
}
