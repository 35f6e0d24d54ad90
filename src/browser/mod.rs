//! 浏览器会话控制
//!
//! - `session` - 会话能力 trait，流水线与适配器只依赖它
//! - `chrome` - chromiumoxide 实现
//! - `headless` / `connection` - 启动新浏览器 / 连接已有浏览器
//! - `stealth` - 会话级指纹策略
//! - `locator` - 有序定位策略

pub mod chrome;
pub mod connection;
pub mod headless;
pub mod locator;
pub mod session;
pub mod stealth;

pub use chrome::ChromeSession;
pub use locator::{css, label, text, ElementHandle, Locator};
pub use session::{click_first, visible_within, Session, NAVIGATION_ATTEMPTS};
