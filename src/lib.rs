//! gitdeploy 控制台导航引擎
//!
//! 与平台无关的核心逻辑，浏览器绑定位于 `frontend/`：
//! - `session`: 会话令牌存储
//! - `guard`: 导航守卫
//! - `route`: 路由表
//! - `component`: 模板获取与异步组件解析
//! - `shell`: 应用外壳（全局状态 + 导航流程）

pub mod component;
pub mod config;
pub mod error;
pub mod guard;
pub mod request;
pub mod route;
pub mod session;
pub mod shell;

pub use config::{AppConfig, GuardPolicy};
pub use error::{AppError, AppResult};
pub use request::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use route::{RouteTable, Slot};
pub use session::{MemoryStore, SessionStore};
pub use shell::{AppShell, CurrentUser, Navigation, ShellState, SlotContent};
