//! 申请表单控件提取
//!
//! 只看当前步骤（`scope` 命中的容器，缺省为整个文档）里可交互的控件：
//! - 标签：`label[for]` → 外层 `<label>` → `aria-label` → `aria-labelledby` → `placeholder` → `name`
//! - 必填：`required`、`aria-required="true"` 或标签以 `*` 结尾
//! - 同名 radio 合并成一个字段，选项为各自的标签
//! - 已填：`data-jp-value`（浏览器端同步的实时值）优先，其次是静态属性

use scraper::{ElementRef, Selector};

use super::{attr_selector, element_text, find_all, DocumentParser};
use crate::browser::Locator;
use crate::models::{DetectedField, InputType};

const CONTROLS: &str = "input, select, textarea";

impl DocumentParser {
    /// 提取当前步骤的输入控件，保持页面顺序
    pub fn form_fields(&self, scope: &[Locator]) -> Vec<DetectedField> {
        let root = self.root();
        let container = scope
            .iter()
            .find_map(|locator| find_all(root, root, locator).into_iter().next())
            .unwrap_or(root);

        let Ok(controls) = Selector::parse(CONTROLS) else {
            return Vec::new();
        };

        let mut fields: Vec<DetectedField> = Vec::new();
        for control in container.select(&controls) {
            let element = control.value();
            let Some(input_type) = InputType::from_tag(element.name(), element.attr("type")) else {
                continue;
            };
            if element.attr("disabled").is_some() || element.attr("aria-hidden") == Some("true") {
                continue;
            }

            let id = element.attr("id").filter(|v| !v.is_empty());
            let name = element.attr("name").filter(|v| !v.is_empty());
            let label = control_label(control, container);

            if input_type == InputType::Radio {
                if let Some(group) = name {
                    if let Some(existing) = fields
                        .iter_mut()
                        .find(|f| f.input_type == InputType::Radio && f.name.as_deref() == Some(group))
                    {
                        if !label.is_empty() {
                            existing.options.push(label);
                        }
                        existing.filled |= is_filled(control, input_type);
                        existing.required |= is_required(control, "");
                        continue;
                    }
                }
            }

            let (field_id, selector) = match (id, name) {
                (Some(id), _) if input_type != InputType::Radio => (id.to_string(), attr_selector("id", id)),
                (_, Some(name)) => (name.to_string(), attr_selector("name", name)),
                (Some(id), None) => (id.to_string(), attr_selector("id", id)),
                (None, None) => continue,
            };

            let (field_label, options) = if input_type == InputType::Radio {
                let question = radio_question(control).unwrap_or_else(|| field_id.clone());
                let options = if label.is_empty() { Vec::new() } else { vec![label.clone()] };
                (question, options)
            } else {
                let options = if input_type == InputType::Select {
                    select_options(control)
                } else {
                    Vec::new()
                };
                let fallback = if label.is_empty() { field_id.clone() } else { label.clone() };
                (fallback, options)
            };

            fields.push(DetectedField {
                id: field_id,
                name: name.map(str::to_string),
                required: is_required(control, &field_label),
                label: clean_label(&field_label),
                input_type,
                options,
                filled: is_filled(control, input_type),
                selector,
            });
        }
        fields
    }
}

/// 控件的可读标签
fn control_label(control: ElementRef<'_>, container: ElementRef<'_>) -> String {
    let element = control.value();

    if let Some(id) = element.attr("id") {
        if let Ok(sel) = Selector::parse(&format!("label{}", attr_selector("for", id))) {
            if let Some(label) = container.select(&sel).next() {
                let text = element_text(label);
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }

    if let Some(label) = control
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "label")
    {
        let text = element_text(label);
        if !text.is_empty() {
            return text;
        }
    }

    if let Some(aria) = element.attr("aria-label").map(str::trim).filter(|v| !v.is_empty()) {
        return aria.to_string();
    }

    if let Some(ids) = element.attr("aria-labelledby") {
        let text: Vec<String> = ids
            .split_whitespace()
            .filter_map(|id| Selector::parse(&attr_selector("id", id)).ok())
            .filter_map(|sel| container.select(&sel).next())
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();
        if !text.is_empty() {
            return text.join(" ");
        }
    }

    element
        .attr("placeholder")
        .or_else(|| element.attr("name"))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// radio 组的问题文本：最近的 `<fieldset>` 的 `<legend>`
fn radio_question(control: ElementRef<'_>) -> Option<String> {
    let legend = Selector::parse("legend").ok()?;
    control
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "fieldset")
        .and_then(|fieldset| fieldset.select(&legend).next())
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn select_options(control: ElementRef<'_>) -> Vec<String> {
    let Ok(option) = Selector::parse("option") else {
        return Vec::new();
    };
    control
        .select(&option)
        .filter(|opt| opt.value().attr("value") != Some(""))
        .map(element_text)
        .filter(|t| !t.is_empty() && !is_placeholder_option(t))
        .collect()
}

fn is_placeholder_option(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.starts_with("select") || lower.starts_with("choose") || lower.starts_with("please select") || lower == "--"
}

fn is_required(control: ElementRef<'_>, label: &str) -> bool {
    let element = control.value();
    element.attr("required").is_some()
        || element.attr("aria-required") == Some("true")
        || label.trim_end().ends_with('*')
}

fn is_filled(control: ElementRef<'_>, input_type: InputType) -> bool {
    let element = control.value();
    if let Some(live) = element.attr("data-jp-value") {
        return !live.is_empty() && live != "false";
    }
    match input_type {
        InputType::Checkbox | InputType::Radio => element.attr("checked").is_some(),
        InputType::Textarea => !element_text(control).is_empty(),
        InputType::Select => {
            let Ok(selected) = Selector::parse("option[selected]") else {
                return false;
            };
            control
                .select(&selected)
                .next()
                .map(|opt| {
                    let value = opt.value().attr("value").unwrap_or_default();
                    !value.is_empty() && !is_placeholder_option(&element_text(opt))
                })
                .unwrap_or(false)
        }
        InputType::Text | InputType::File => element
            .attr("value")
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false),
    }
}

fn clean_label(label: &str) -> String {
    label.trim().trim_end_matches('*').trim().to_string()
}
