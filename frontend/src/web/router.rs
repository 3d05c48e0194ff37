//! 路由服务模块 - 浏览器绑定
//!
//! 所有对 window.history 的操作都集中在此模块。
//! 导航流程（守卫 -> 匹配 -> 组件解析）由引擎完成，这里负责触发与呈现：
//! "监听 -> 引擎导航 -> 写入 History -> 更新界面"。

use gitdeploy_console::Navigation;
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::prelude::*;

use crate::context::ShellContext;

/// 获取当前浏览器路径（含查询串）
fn current_path() -> String {
    web_sys::window()
        .and_then(|w| {
            let location = w.location();
            let path = location.pathname().ok()?;
            let search = location.search().unwrap_or_default();
            Some(format!("{}{}", path, search))
        })
        .unwrap_or_else(|| "/".to_string())
}

fn push_history_state(path: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.push_state_with_url(&JsValue::NULL, "", Some(path));
        }
    }
}

/// 用于重定向和初次加载
fn replace_history_state(path: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(path));
        }
    }
}

/// 路由器服务
///
/// 通过 Signal 驱动界面更新。导航不可取消：较早的导航晚于较新的导航完成时，
/// 以最后写入者为准。
#[derive(Clone, Copy)]
pub struct RouterService {
    current: RwSignal<Option<Navigation>>,
    shell: ShellContext,
}

impl RouterService {
    fn new(shell: ShellContext) -> Self {
        Self {
            current: RwSignal::new(None),
            shell,
        }
    }

    /// 最近一次完成的导航
    pub fn current(&self) -> RwSignal<Option<Navigation>> {
        self.current
    }

    /// **核心方法：导航**
    pub fn navigate(&self, path: &str) {
        self.go(path.to_string(), true);
    }

    /// # Arguments
    /// * `use_push` - true 使用 pushState, false 使用 replaceState
    fn go(&self, path: String, use_push: bool) {
        let router = *self;
        spawn_local(async move {
            let shell = router.shell.shell();
            let navigation = shell.navigate(&path).await;

            // 被重定向时记录最终路径，避免后退键回到被拒绝的页面
            let location = navigation.location(&path);
            if use_push && !navigation.redirected() {
                push_history_state(&location);
            } else {
                replace_history_state(&location);
            }
            router.current.set(Some(navigation));
        });
    }

    /// 浏览器后退/前进按钮同样经过守卫
    fn init_popstate_listener(&self) {
        let router = *self;
        let closure = Closure::<dyn Fn()>::new(move || {
            router.go(current_path(), false);
        });

        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }

        // 泄漏闭包以保持监听器存活
        closure.forget();
    }

    /// 登出后自动回到登录页
    fn setup_auth_redirect(&self) {
        let router = *self;
        let signed_in = self.shell.signed_in_signal();
        let signin_path = self.shell.shell().config().signin_path.clone();

        Effect::new(move |was_signed_in: Option<bool>| {
            let now = signed_in.get();
            if was_signed_in == Some(true) && !now {
                log::info!("[Router] signed out, redirecting to sign-in");
                router.navigate(&signin_path);
            }
            now
        });
    }
}

fn provide_router(shell: ShellContext) -> RouterService {
    let router = RouterService::new(shell);

    router.init_popstate_listener();
    router.setup_auth_redirect();

    provide_context(router);

    // 初次加载：解析地址栏中的路径
    router.go(current_path(), false);
    router
}

/// 从 Context 获取路由服务
pub fn use_router() -> RouterService {
    use_context::<RouterService>()
        .expect("RouterService not found in context. Ensure Router is provided.")
}

/// 拦截站内链接的点击，交给路由服务处理
///
/// 模板来自服务端，其中的 `<a href="/jobs">` 无法预先绑定事件，因此在出口处统一代理。
pub fn intercept_link_click(router: RouterService, ev: &web_sys::MouseEvent) {
    if ev.default_prevented()
        || ev.button() != 0
        || ev.meta_key()
        || ev.ctrl_key()
        || ev.shift_key()
        || ev.alt_key()
    {
        return;
    }

    let Some(anchor) = ev
        .target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        .and_then(|el| el.closest("a[href]").ok().flatten())
    else {
        return;
    };

    if anchor.has_attribute("target") || anchor.has_attribute("download") {
        return;
    }

    let Some(href) = anchor.get_attribute("href") else {
        return;
    };
    if href.starts_with('/') && !href.starts_with("//") {
        ev.prevent_default();
        router.navigate(&href);
    }
}

// ============================================================================
// UI 组件
// ============================================================================

/// 路由器根组件
///
/// 提供路由上下文，应在 App 根部使用。
#[component]
pub fn Router(
    /// 外壳上下文
    shell: ShellContext,
    /// 子组件
    children: Children,
) -> impl IntoView {
    provide_router(shell);

    children()
}
