pub mod js_executor;
pub mod throttle;

pub use js_executor::JsExecutor;
pub use throttle::{SharedThrottle, ThrottleConfig, ThrottleManager, ThrottleStatus};
