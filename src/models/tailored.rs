use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppResult, PlatformError};

/// 定制简历载荷：文本或已存在的文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResumePayload {
    Text(String),
    File { path: PathBuf },
}

impl ResumePayload {
    pub fn is_empty(&self) -> bool {
        match self {
            ResumePayload::Text(text) => text.trim().is_empty(),
            ResumePayload::File { path } => path.as_os_str().is_empty(),
        }
    }
}

/// 外部定制引擎产出的内容，本系统只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailoredOutput {
    #[serde(alias = "jobId")]
    pub job_id: String,
    #[serde(alias = "tailoredResume")]
    pub tailored_resume: ResumePayload,
    #[serde(default, alias = "coverLetter")]
    pub cover_letter: Option<String>,
    #[serde(default, alias = "outreachMessage")]
    pub outreach_message: Option<String>,
    #[serde(alias = "confidenceScore")]
    pub confidence_score: f64,
}

impl TailoredOutput {
    /// 校验字段约束：job_id 非空，置信度在 [0, 1]
    pub fn validate(&self) -> AppResult<()> {
        if self.job_id.trim().is_empty() {
            return Err(PlatformError::InvalidInput("job_id 不能为空".to_string()).into());
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(PlatformError::InvalidInput(format!(
                "confidence_score {} 超出 [0, 1]",
                self.confidence_score
            ))
            .into());
        }
        Ok(())
    }

    /// 非空的求职信
    pub fn cover_letter_text(&self) -> Option<&str> {
        self.cover_letter
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// 非空的联系消息
    pub fn outreach_text(&self) -> Option<&str> {
        self.outreach_message
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_text_resume_snake_case() {
        let json = r#"{
            "job_id": "linkedin:42",
            "status": "success",
            "tailored_resume": "RESUME",
            "cover_letter": "Dear team",
            "outreach_message": "Hi",
            "confidence_score": 0.82
        }"#;
        let output: TailoredOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.tailored_resume, ResumePayload::Text("RESUME".to_string()));
        assert_eq!(output.cover_letter_text(), Some("Dear team"));
        assert!(output.validate().is_ok());
    }

    #[test]
    fn test_deserialize_file_resume_camel_case() {
        let json = r#"{"jobId":"indeed:1","tailoredResume":{"path":"/tmp/r.pdf"},"confidenceScore":0.5}"#;
        let output: TailoredOutput = serde_json::from_str(json).unwrap();
        assert!(matches!(output.tailored_resume, ResumePayload::File { .. }));
        assert_eq!(output.cover_letter_text(), None);
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let output = TailoredOutput {
            job_id: "indeed:1".to_string(),
            tailored_resume: ResumePayload::Text("r".to_string()),
            cover_letter: Some("   ".to_string()),
            outreach_message: None,
            confidence_score: 1.5,
        };
        assert!(output.validate().is_err());
        assert_eq!(output.cover_letter_text(), None);
    }
}
