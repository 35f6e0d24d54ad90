pub mod apply_ctx;
pub mod apply_flow;
pub mod apply_state;
pub mod cancel;
pub mod scrape_flow;

pub use apply_ctx::ApplicationAttempt;
pub use apply_flow::{ApplyFlow, ApplyRequest, ApplySettings};
pub use apply_state::{ApplyState, FailureReason};
pub use cancel::CancelSignal;
pub use scrape_flow::{ScrapeFlow, ScrapeOutcome, StopReason};
