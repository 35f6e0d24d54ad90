use serde::{Deserialize, Serialize};

/// 表单控件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Textarea,
    Select,
    File,
    Checkbox,
    Radio,
}

impl InputType {
    /// 根据标签名与 type 属性推断控件类型；按钮类、隐藏控件返回 None
    pub fn from_tag(tag: &str, type_attr: Option<&str>) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "textarea" => Some(InputType::Textarea),
            "select" => Some(InputType::Select),
            "input" => match type_attr.unwrap_or("text").to_ascii_lowercase().as_str() {
                "file" => Some(InputType::File),
                "checkbox" => Some(InputType::Checkbox),
                "radio" => Some(InputType::Radio),
                "hidden" | "submit" | "button" | "reset" | "image" => None,
                _ => Some(InputType::Text),
            },
            _ => None,
        }
    }
}

/// 申请表单某一步中的一个输入控件
///
/// 生命周期只有一个步骤，每次翻页都要重新检测
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedField {
    /// 平台 DOM 标识（id 或 name），对流程层不透明
    pub id: String,
    pub name: Option<String>,
    pub label: String,
    pub input_type: InputType,
    /// select / radio 的可选项，保持页面顺序
    #[serde(default)]
    pub options: Vec<String>,
    pub required: bool,
    /// 检测时控件是否已有值
    #[serde(default)]
    pub filled: bool,
    /// 定位该控件的 CSS 选择器
    pub selector: String,
}

impl DetectedField {
    pub fn is_file(&self) -> bool {
        self.input_type == InputType::File
    }

    /// 标签小写形式，用于关键字匹配
    pub fn label_lower(&self) -> String {
        self.label.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag() {
        assert_eq!(InputType::from_tag("INPUT", Some("email")), Some(InputType::Text));
        assert_eq!(InputType::from_tag("input", None), Some(InputType::Text));
        assert_eq!(InputType::from_tag("input", Some("file")), Some(InputType::File));
        assert_eq!(InputType::from_tag("input", Some("hidden")), None);
        assert_eq!(InputType::from_tag("textarea", None), Some(InputType::Textarea));
        assert_eq!(InputType::from_tag("button", None), None);
    }
}
