//! gitdeploy 控制台前端
//!
//! 把导航引擎绑定到浏览器：
//! - `web`: fetch / LocalStorage / History 封装
//! - `context`: 外壳上下文（全局状态的响应式镜像）
//! - `components`: 路由出口与各组件的行为

mod components {
    mod navbar;
    pub mod outlet;
    mod signin;
    mod template_view;
}
mod context;

pub(crate) mod web {
    mod http;
    pub mod router;
    mod storage;

    pub use http::FetchHttpClient;
    pub use storage::LocalStorageStore;
}

use std::rc::Rc;

use gitdeploy_console::AppConfig;
use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::components::outlet::{ErrorBanner, RouterOutlet};
use crate::context::{Shell, ShellContext};
use crate::web::router::Router;
use crate::web::{FetchHttpClient, LocalStorageStore};

/// 页面内联配置所在元素的 id
const CONFIG_ELEMENT_ID: &str = "app-config";

#[component]
pub fn App(shell: Rc<Shell>) -> impl IntoView {
    // 1. 创建外壳上下文
    let ctx = ShellContext::new(shell);
    provide_context(ctx);

    // 2. 路由器引用外壳上下文实现守卫
    view! {
        <ErrorBanner />
        <Router shell=ctx>
            <RouterOutlet />
        </Router>
    }
}

/// 读取 `<script id="app-config" type="application/json">`；缺失或无效时使用默认值
fn load_config() -> AppConfig {
    let raw = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(CONFIG_ELEMENT_ID))
        .and_then(|el| el.text_content());

    match raw {
        Some(raw) if !raw.trim().is_empty() => AppConfig::from_json(&raw).unwrap_or_else(|e| {
            log::error!("[Config] {}, falling back to defaults", e);
            AppConfig::default()
        }),
        _ => AppConfig::default(),
    }
}

fn mount_point(selector: &str) -> Option<web_sys::HtmlElement> {
    web_sys::window()?
        .document()?
        .query_selector(selector)
        .ok()??
        .dyn_into::<web_sys::HtmlElement>()
        .ok()
}

/// 启动顺序：配置 -> 外壳 -> 路由器 -> 挂载（仅一次）
pub fn start() {
    // 先以 info 级别输出配置错误，读取配置后再调整
    let _ = console_log::init_with_level(log::Level::Trace);
    log::set_max_level(log::LevelFilter::Info);

    let config = load_config();
    log::set_max_level(config.log_level());

    let session = Rc::new(LocalStorageStore::new(&config.token_key));
    let selector = config.mount_selector.clone();
    let shell = match Shell::new(config, Rc::new(FetchHttpClient), session) {
        Ok(shell) => Rc::new(shell),
        Err(e) => {
            log::error!("[App] failed to start: {}", e);
            return;
        }
    };

    match mount_point(&selector) {
        Some(el) => leptos::mount::mount_to(el, move || view! { <App shell=shell /> }).forget(),
        None => {
            log::warn!("[App] mount point `{}` not found, mounting to body", selector);
            leptos::mount::mount_to_body(move || view! { <App shell=shell /> });
        }
    }
}
