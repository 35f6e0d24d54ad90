pub mod applicant;
pub mod form;
pub mod job;
pub mod loaders;
pub mod platform;
pub mod tailored;

pub use applicant::{ApplicantProfile, Credentials};
pub use form::{DetectedField, InputType};
pub use job::{DatePosted, JobPosting, SalaryRange, SearchFilters, Seniority};
pub use loaders::{load_all_tailored_outputs, load_tailored_output};
pub use platform::Platform;
pub use tailored::{ResumePayload, TailoredOutput};
