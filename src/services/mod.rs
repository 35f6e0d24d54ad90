//! 业务能力层
//!
//! 每个服务只提供一种能力，不关心流程顺序

pub mod dedup;
pub mod export;
pub mod field_mapper;
pub mod job_filter;
pub mod resume_file;
pub mod status_reporter;

pub use dedup::dedup_postings;
pub use export::{export_file_name, export_postings, load_export, ExportDocument, ExportMetadata};
pub use field_mapper::FieldMapper;
pub use job_filter::{extract_skills, score_postings, JobFilter, ScoredPosting};
pub use resume_file::ResumeFile;
pub use status_reporter::{
    ChannelSink, FanoutSink, JsonlSink, LogSink, StatusEvent, StatusKind, StatusReporter,
    StatusSink, WebhookSink,
};
