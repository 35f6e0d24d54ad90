//! 表单字段映射
//!
//! 根据字段标签（连同 name / id）里的关键字，决定用申请人资料或定制内容里的哪一项来填。
//! 规则表按顺序匹配，第一条命中的规则生效；select / radio 的值必须能对上某个选项。

use crate::models::{ApplicantProfile, DetectedField, InputType, TailoredOutput};

/// 字段值来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    CoverLetter,
    Outreach,
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    LinkedIn,
    Portfolio,
    Location,
    YearsExperience,
    Sponsorship,
    WorkAuthorization,
}

/// (关键字, 来源)；顺序有意义，签证问题要排在工作许可之前
static RULES: &[(&[&str], Source)] = &[
    (&["cover letter", "cover_letter", "coverletter"], Source::CoverLetter),
    (
        &["hiring manager", "message", "note to", "additional information", "why do you want", "why are you interested"],
        Source::Outreach,
    ),
    (&["first name", "firstname", "first_name", "given name"], Source::FirstName),
    (&["last name", "lastname", "last_name", "surname", "family name"], Source::LastName),
    (&["full name", "fullname", "full_name", "your name"], Source::FullName),
    (&["email", "e-mail"], Source::Email),
    (&["phone", "mobile", "telephone"], Source::Phone),
    (&["linkedin"], Source::LinkedIn),
    (&["portfolio", "website", "github", "personal site"], Source::Portfolio),
    (&["city", "location", "where are you based"], Source::Location),
    (&["years of experience", "years experience", "how many years"], Source::YearsExperience),
    (&["sponsorship", "visa"], Source::Sponsorship),
    (
        &["authorized to work", "authorised to work", "work authorization", "right to work", "legally authorized"],
        Source::WorkAuthorization,
    ),
];

/// 为一次申请提供字段取值
pub struct FieldMapper<'a> {
    profile: &'a ApplicantProfile,
    tailored: &'a TailoredOutput,
}

impl<'a> FieldMapper<'a> {
    pub fn new(profile: &'a ApplicantProfile, tailored: &'a TailoredOutput) -> Self {
        Self { profile, tailored }
    }

    /// 字段应填的值；无法确定时返回 None
    ///
    /// 文件控件由流水线单独处理，这里总是返回 None
    pub fn value_for(&self, field: &DetectedField) -> Option<String> {
        if field.input_type == InputType::File {
            return None;
        }

        let haystack = format!(
            "{} {} {}",
            field.label_lower(),
            field.name.as_deref().unwrap_or_default().to_lowercase(),
            field.id.to_lowercase()
        );
        let source = RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| haystack.contains(k)))
            .map(|(_, source)| *source)
            .or_else(|| (field.label_lower().trim() == "name").then_some(Source::FullName))?;

        let raw = self.raw_value(source)?;
        match field.input_type {
            InputType::Select | InputType::Radio => match_option(&field.options, &raw),
            InputType::Checkbox => match source {
                Source::Sponsorship | Source::WorkAuthorization => Some(raw),
                _ => None,
            },
            InputType::Text | InputType::Textarea => Some(raw),
            InputType::File => None,
        }
    }

    fn raw_value(&self, source: Source) -> Option<String> {
        let p = self.profile;
        let value = match source {
            Source::CoverLetter => self.tailored.cover_letter_text()?.to_string(),
            Source::Outreach => self
                .tailored
                .outreach_text()
                .or_else(|| self.tailored.cover_letter_text())?
                .to_string(),
            Source::FirstName => p.first_name.clone(),
            Source::LastName => p.last_name.clone(),
            Source::FullName => p.full_name(),
            Source::Email => p.email.clone(),
            Source::Phone => p.phone.clone(),
            Source::LinkedIn => p.linkedin_url.clone(),
            Source::Portfolio => p.portfolio_url.clone(),
            Source::Location => p.location.clone(),
            Source::YearsExperience => p.years_experience?.to_string(),
            Source::Sponsorship => yes_no(p.requires_sponsorship?),
            Source::WorkAuthorization => yes_no(p.work_authorized?),
        };
        let value = value.trim().to_string();
        (!value.is_empty()).then_some(value)
    }
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

/// 在选项中找到与取值对应的那一项：完全相同 → 以取值开头 → 包含取值
fn match_option(options: &[String], value: &str) -> Option<String> {
    let wanted = value.trim().to_lowercase();
    let lowered: Vec<String> = options.iter().map(|o| o.trim().to_lowercase()).collect();

    let position = lowered
        .iter()
        .position(|o| *o == wanted)
        .or_else(|| lowered.iter().position(|o| o.starts_with(&wanted)))
        .or_else(|| lowered.iter().position(|o| o.contains(&wanted)))?;
    options.get(position).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResumePayload;

    fn field(label: &str, input_type: InputType, options: &[&str]) -> DetectedField {
        DetectedField {
            id: label.to_lowercase().replace(' ', "_"),
            name: None,
            label: label.to_string(),
            input_type,
            options: options.iter().map(|s| s.to_string()).collect(),
            required: true,
            filled: false,
            selector: format!("[id=\"{}\"]", label),
        }
    }

    fn profile() -> ApplicantProfile {
        ApplicantProfile {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+1 555 0100".into(),
            location: "London".into(),
            linkedin_url: "https://linkedin.com/in/ada".into(),
            years_experience: Some(7),
            work_authorized: Some(true),
            requires_sponsorship: Some(false),
            ..Default::default()
        }
    }

    fn tailored(cover: Option<&str>, outreach: Option<&str>) -> TailoredOutput {
        TailoredOutput {
            job_id: "linkedin:1".into(),
            tailored_resume: ResumePayload::Text("resume".into()),
            cover_letter: cover.map(str::to_string),
            outreach_message: outreach.map(str::to_string),
            confidence_score: 0.9,
        }
    }

    #[test]
    fn test_profile_fields() {
        let profile = profile();
        let tailored = tailored(None, None);
        let mapper = FieldMapper::new(&profile, &tailored);

        assert_eq!(mapper.value_for(&field("First name", InputType::Text, &[])).as_deref(), Some("Ada"));
        assert_eq!(mapper.value_for(&field("Email address", InputType::Text, &[])).as_deref(), Some("ada@example.com"));
        assert_eq!(mapper.value_for(&field("Mobile phone number", InputType::Text, &[])).as_deref(), Some("+1 555 0100"));
        assert_eq!(mapper.value_for(&field("Name", InputType::Text, &[])).as_deref(), Some("Ada Lovelace"));
        assert_eq!(
            mapper.value_for(&field("How many years of experience do you have with Rust?", InputType::Text, &[])).as_deref(),
            Some("7")
        );
        assert_eq!(mapper.value_for(&field("Portfolio", InputType::Text, &[])), None);
        assert_eq!(mapper.value_for(&field("Favourite colour", InputType::Text, &[])), None);
    }

    #[test]
    fn test_yes_no_questions_match_options() {
        let profile = profile();
        let tailored = tailored(None, None);
        let mapper = FieldMapper::new(&profile, &tailored);

        let sponsorship = field(
            "Will you now or in the future require visa sponsorship?",
            InputType::Radio,
            &["Yes", "No"],
        );
        assert_eq!(mapper.value_for(&sponsorship).as_deref(), Some("No"));

        let authorized = field(
            "Are you legally authorized to work in the UK?",
            InputType::Select,
            &["Yes, I am authorized", "No"],
        );
        assert_eq!(mapper.value_for(&authorized).as_deref(), Some("Yes, I am authorized"));

        let unknown_option = field("Country", InputType::Select, &["France", "Spain"]);
        assert_eq!(mapper.value_for(&unknown_option), None);
    }

    #[test]
    fn test_tailored_text_fields() {
        let profile = profile();
        let tailored = tailored(Some("Dear team"), None);
        let mapper = FieldMapper::new(&profile, &tailored);

        assert_eq!(mapper.value_for(&field("Cover letter", InputType::Textarea, &[])).as_deref(), Some("Dear team"));
        assert_eq!(
            mapper.value_for(&field("Message to the hiring manager", InputType::Textarea, &[])).as_deref(),
            Some("Dear team")
        );
        assert_eq!(mapper.value_for(&field("Cover letter", InputType::File, &[])), None);

        let tailored = tailored_with_outreach();
        let mapper = FieldMapper::new(&profile, &tailored);
        assert_eq!(
            mapper.value_for(&field("Add a note to the team", InputType::Textarea, &[])).as_deref(),
            Some("Hi there")
        );
    }

    fn tailored_with_outreach() -> TailoredOutput {
        tailored(Some("Dear team"), Some("Hi there"))
    }

    #[test]
    fn test_unrelated_checkbox_left_alone() {
        let profile = profile();
        let tailored = tailored(None, None);
        let mapper = FieldMapper::new(&profile, &tailored);
        assert_eq!(mapper.value_for(&field("Email me similar jobs", InputType::Checkbox, &[])), None);
    }
}
