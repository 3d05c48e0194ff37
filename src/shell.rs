//! 应用外壳
//!
//! 持有全局状态（当前用户、就绪标记、错误横幅），按固定顺序组装：
//! 配置 -> 会话 -> 守卫 -> 路由表 -> 组件解析器。前端在此之后构建路由器并挂载。

use futures::future::{FutureExt, LocalBoxFuture, Shared, join_all};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::component::{ComponentDefinition, ComponentResolver, Scope, TemplateFetcher};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::guard::{AuthGuard, GuardDecision, IdentitySource};
use crate::request::{HttpClient, HttpRequest};
use crate::route::{RouteDescriptor, RouteTable, Slot, normalize_path};
use crate::session::SessionStore;

/// 单次导航允许跟随的重定向次数
pub const MAX_REDIRECTS: usize = 3;

// =========================================================
// 状态模型
// =========================================================

/// 身份接口返回的用户属性，结构由后端决定
///
/// 空对象表示"未知/未登录"。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrentUser(Scope);

impl CurrentUser {
    /// 非对象的值视为空用户
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    pub fn attributes(&self) -> &Scope {
        &self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShellState {
    pub current_user: CurrentUser,
    /// 身份查询至少完成过一次
    pub ready: bool,
    /// 需要呈现给用户的错误
    pub banner: Option<AppError>,
}

impl ShellState {
    /// 派生值，不单独存储
    pub fn signed_in(&self) -> bool {
        !self.current_user.is_empty()
    }

    /// 供组件渲染使用的属性：`{ "user": {...} }`
    pub fn user_props(&self) -> Scope {
        let mut props = Scope::new();
        props.insert(
            "user".to_string(),
            Value::Object(self.current_user.attributes().clone()),
        );
        props
    }
}

/// 插槽的解析结果
#[derive(Debug, Clone)]
pub enum SlotContent {
    Ready(Arc<ComponentDefinition>),
    Failed(AppError),
}

/// 一次导航的最终结果
#[derive(Debug, Clone)]
pub struct Navigation {
    /// 请求的路径（已规范化）
    pub requested: String,
    /// 经过守卫重定向后实际渲染的路径
    pub path: String,
    pub slots: Vec<(Slot, SlotContent)>,
    /// 守卫失败时的错误（此时已被强制导向登录页）
    pub error: Option<AppError>,
}

impl Navigation {
    pub fn redirected(&self) -> bool {
        self.requested != self.path
    }

    /// 写回地址栏的地址
    ///
    /// 未被重定向时保留原地址中的查询串与片段。
    pub fn location(&self, raw: &str) -> String {
        if self.redirected() {
            return self.path.clone();
        }
        match raw.find(['?', '#']) {
            Some(i) => format!("{}{}", self.path, &raw[i..]),
            None => self.path.clone(),
        }
    }

    pub fn slot(&self, slot: Slot) -> Option<&SlotContent> {
        self.slots.iter().find(|(s, _)| *s == slot).map(|(_, c)| c)
    }

    pub fn component(&self, slot: Slot) -> Option<&Arc<ComponentDefinition>> {
        match self.slot(slot)? {
            SlotContent::Ready(def) => Some(def),
            SlotContent::Failed(_) => None,
        }
    }
}

// =========================================================
// 身份查询
// =========================================================

#[derive(Debug, Clone)]
enum IdentityOutcome {
    User(CurrentUser),
    Unauthorized,
}

type PendingIdentity = Shared<LocalBoxFuture<'static, AppResult<IdentityOutcome>>>;

/// 200 -> 用户；401 -> 未授权；其他状态为致命错误，不重试
async fn fetch_identity<C: HttpClient>(
    client: Rc<C>,
    url: String,
    token: String,
) -> AppResult<IdentityOutcome> {
    let req = HttpRequest::get(&url)
        .with_header("Accept", "application/json")
        .with_header("Authorization", &format!("Bearer {}", token));
    let resp = client.send(req).await?;

    match resp.status {
        200 => match resp.json::<Value>()? {
            Value::Object(map) => Ok(IdentityOutcome::User(CurrentUser(map))),
            _ => Err(AppError::decode(url, "identity response is not a JSON object")),
        },
        401 => Ok(IdentityOutcome::Unauthorized),
        status => Err(AppError::status(url, status)),
    }
}

// =========================================================
// AppShell
// =========================================================

type Listener = Box<dyn Fn(&ShellState)>;

pub struct AppShell<C: HttpClient + 'static, S: SessionStore + 'static> {
    config: Rc<AppConfig>,
    client: Rc<C>,
    session: Rc<S>,
    state: RefCell<ShellState>,
    listeners: RefCell<Vec<Listener>>,
    identity_inflight: RefCell<Option<PendingIdentity>>,
    guard: AuthGuard,
    routes: RouteTable,
    resolver: ComponentResolver<C>,
}

impl<C: HttpClient + 'static, S: SessionStore + 'static> AppShell<C, S> {
    pub fn new(config: AppConfig, client: Rc<C>, session: Rc<S>) -> AppResult<Self> {
        let routes = RouteTable::standard(&config)?;
        Ok(Self::with_routes(config, client, session, routes))
    }

    pub fn with_routes(
        config: AppConfig,
        client: Rc<C>,
        session: Rc<S>,
        routes: RouteTable,
    ) -> Self {
        let config = Rc::new(config);
        let guard = AuthGuard::new(&config);
        let resolver =
            ComponentResolver::new(TemplateFetcher::new(Rc::clone(&client), Rc::clone(&config)));

        Self {
            config,
            client,
            session,
            state: RefCell::new(ShellState::default()),
            listeners: RefCell::new(Vec::new()),
            identity_inflight: RefCell::new(None),
            guard,
            routes,
            resolver,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn resolver(&self) -> &ComponentResolver<C> {
        &self.resolver
    }

    /// 当前状态快照
    pub fn state(&self) -> ShellState {
        self.state.borrow().clone()
    }

    pub fn signed_in(&self) -> bool {
        self.state.borrow().signed_in()
    }

    /// 注册状态监听器，每次状态变化后调用
    ///
    /// 监听器内不得再调用 `subscribe`。
    pub fn subscribe(&self, listener: impl Fn(&ShellState) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    fn update(&self, f: impl FnOnce(&mut ShellState)) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            f(&mut state);
            state.clone()
        };
        for listener in self.listeners.borrow().iter() {
            listener(&snapshot);
        }
    }

    pub fn user_props(&self) -> Scope {
        self.state.borrow().user_props()
    }

    /// 获取当前用户
    ///
    /// 已解析则直接返回缓存；没有令牌时返回空用户且不发请求；
    /// 否则发起一次身份查询，并发调用者共享同一个请求。
    pub async fn get_user(&self) -> AppResult<CurrentUser> {
        let Some(token) = self.session.get_token() else {
            self.forget_stale_user();
            return Ok(CurrentUser::default());
        };
        if let Some(user) = self.cached_user() {
            return Ok(user);
        }

        let pending = {
            let mut inflight = self.identity_inflight.borrow_mut();
            match inflight.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    debug!("[Shell] requesting identity");
                    let pending = fetch_identity(
                        Rc::clone(&self.client),
                        self.config.identity_url(),
                        token,
                    )
                    .boxed_local()
                    .shared();
                    *inflight = Some(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;
        {
            let mut inflight = self.identity_inflight.borrow_mut();
            if inflight.as_ref().is_some_and(|p| p.ptr_eq(&pending)) {
                *inflight = None;
            }
        }

        match result? {
            IdentityOutcome::User(user) => {
                info!("[Shell] identity resolved");
                self.update(|state| {
                    state.current_user = user.clone();
                    state.ready = true;
                });
                Ok(user)
            }
            IdentityOutcome::Unauthorized => {
                warn!("[Shell] identity endpoint answered 401, clearing session");
                self.session.clear_token();
                self.update(|state| {
                    state.current_user = CurrentUser::default();
                    state.ready = true;
                });
                Ok(CurrentUser::default())
            }
        }
    }

    /// 保存令牌并丢弃已缓存的用户
    ///
    /// 空令牌不会被保存，返回 `false`。
    pub fn sign_in(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            warn!("[Shell] refusing to store an empty token");
            return false;
        }
        self.session.set_token(token);
        info!("[Shell] token stored");
        self.update(|state| {
            state.current_user = CurrentUser::default();
            state.ready = false;
            state.banner = None;
        });
        true
    }

    pub fn sign_out(&self) {
        self.session.clear_token();
        info!("[Shell] signed out");
        self.update(|state| {
            state.current_user = CurrentUser::default();
            state.ready = false;
        });
    }

    pub fn dismiss_banner(&self) {
        self.update(|state| state.banner = None);
    }

    /// 令牌已在外部被移除（清空存储、其他标签页登出）时丢弃缓存的用户
    fn forget_stale_user(&self) {
        if self.session.get_token().is_some() || self.state.borrow().current_user.is_empty() {
            return;
        }
        info!("[Shell] token gone, forgetting cached user");
        self.update(|state| {
            state.current_user = CurrentUser::default();
            state.ready = false;
        });
    }

    /// **核心方法：导航**
    ///
    /// 流程：守卫（含身份查询）-> 路由匹配 -> 并发解析插槽组件。
    /// 守卫完成之前不会开始任何组件解析。
    pub async fn navigate(&self, path: &str) -> Navigation {
        let requested = normalize_path(path);
        self.forget_stale_user();
        let (target, route, guard_error) = self.run_guard(&requested).await;

        if guard_error.is_none() && self.state.borrow().banner.is_some() {
            self.dismiss_banner();
        }

        let path = target.as_str();
        let slots = join_all(route.slots.iter().map(|(slot, name)| async move {
            let content = match self.resolver.resolve(name).await {
                Ok(def) => SlotContent::Ready(def),
                Err(e) => {
                    error!("[Router] {} slot of {} failed: {}", slot, path, e);
                    SlotContent::Failed(e)
                }
            };
            (*slot, content)
        }))
        .await;

        info!("[Router] rendered {}", target);
        Navigation {
            requested,
            path: target,
            slots,
            error: guard_error,
        }
    }

    /// 执行守卫并跟随重定向，返回最终路径与路由
    async fn run_guard(&self, requested: &str) -> (String, &RouteDescriptor, Option<AppError>) {
        let mut target = requested.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let route = self.routes.match_path(&target);
            match self.guard.check(route, self).await {
                Ok(GuardDecision::Allow) => return (target, route, None),
                Ok(GuardDecision::Redirect { to, reason }) => {
                    info!("[Router] {} -> {} ({:?})", target, to, reason);
                    target = normalize_path(&to);
                }
                Err(e) => {
                    // 守卫失败必须呈现给用户：记录横幅并强制进入登录页
                    error!("[Router] guard failed for {}: {}", target, e);
                    self.update(|state| state.banner = Some(e.clone()));
                    let signin = self.config.signin_path.clone();
                    let route = self.routes.match_path(&signin);
                    return (signin, route, Some(e));
                }
            }
        }

        // 重定向环说明路由表配置有误：呈现错误并直接渲染登录页，不再经过守卫
        let e = AppError::InvalidRouteTable(format!("redirect loop starting at {}", requested));
        error!("[Router] {}", e);
        self.update(|state| state.banner = Some(e.clone()));
        let signin = self.config.signin_path.clone();
        let route = self.routes.match_path(&signin);
        (signin, route, Some(e))
    }
}

#[async_trait::async_trait(?Send)]
impl<C: HttpClient + 'static, S: SessionStore + 'static> IdentitySource for AppShell<C, S> {
    fn has_token(&self) -> bool {
        self.session.get_token().is_some()
    }

    fn cached_user(&self) -> Option<CurrentUser> {
        if !self.has_token() {
            return None;
        }
        let state = self.state.borrow();
        (!state.current_user.is_empty()).then(|| state.current_user.clone())
    }

    async fn get_user(&self) -> AppResult<CurrentUser> {
        AppShell::get_user(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::catalog;
    use crate::config::GuardPolicy;
    use crate::request::MockHttpClient;
    use crate::session::MemoryStore;
    use serde_json::json;
    use std::cell::Cell;

    const ME: &str = "/api/auth/me.json";
    const SIGNIN_HTML: &str = "/templates/signin.html";
    const DASHBOARD_HTML: &str = "/templates/dashboard.html";
    const NAVBAR_HTML: &str = "/templates/navbar.html";

    fn mock_templates(client: &MockHttpClient) {
        client.mock_response(SIGNIN_HTML, 200, "<form>{{ email }}</form>");
        client.mock_response(DASHBOARD_HTML, 200, "<main>{{ user.email }}</main>");
        client.mock_response(NAVBAR_HTML, 200, "<nav></nav>");
        client.mock_response("/templates/jobs.html", 200, "<ul></ul>");
    }

    fn shell_with(
        config: AppConfig,
        token: Option<&str>,
    ) -> (
        AppShell<MockHttpClient, MemoryStore>,
        Rc<MockHttpClient>,
        Rc<MemoryStore>,
    ) {
        let client = Rc::new(MockHttpClient::new());
        mock_templates(&client);
        let session = Rc::new(match token {
            Some(t) => MemoryStore::with_token(&config.token_key, t),
            None => MemoryStore::new(&config.token_key),
        });
        let shell = AppShell::new(config, Rc::clone(&client), Rc::clone(&session)).unwrap();
        (shell, client, session)
    }

    fn shell(
        token: Option<&str>,
    ) -> (
        AppShell<MockHttpClient, MemoryStore>,
        Rc<MockHttpClient>,
        Rc<MemoryStore>,
    ) {
        shell_with(AppConfig::default(), token)
    }

    #[tokio::test]
    async fn no_token_redirects_to_signin_before_any_protected_fetch() {
        let (shell, client, _) = shell(None);

        let nav = shell.navigate("/").await;

        assert_eq!(nav.path, "/signin");
        assert!(nav.redirected());
        assert_eq!(nav.component(Slot::Main).unwrap().name(), "signin");
        assert!(nav.slot(Slot::Header).is_none());
        assert_eq!(client.hits(SIGNIN_HTML), 1);
        assert_eq!(client.hits(DASHBOARD_HTML), 0);
        assert_eq!(client.hits(NAVBAR_HTML), 0);
        assert_eq!(client.hits(ME), 0);
        assert_eq!(client.requests.borrow().len(), 1);
    }

    #[tokio::test]
    async fn valid_token_renders_dashboard_and_signs_in() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));

        let nav = shell.navigate("/").await;

        assert_eq!(nav.path, "/");
        assert!(nav.error.is_none());
        assert!(shell.signed_in());
        assert!(shell.state().ready);
        assert_eq!(shell.state().current_user.email(), Some("a@b.com"));

        let dashboard = nav.component(Slot::Main).unwrap();
        assert_eq!(dashboard.name(), "dashboard");
        let scope = dashboard.scope(&shell.user_props());
        assert_eq!(dashboard.render(&scope), "<main>a@b.com</main>");

        assert_eq!(client.hits(ME), 1);
        assert_eq!(client.hits(DASHBOARD_HTML), 1);
        assert_eq!(client.hits(NAVBAR_HTML), 1);
    }

    #[tokio::test]
    async fn identity_request_precedes_component_fetches() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));

        shell.navigate("/jobs").await;

        let requests = client.requests.borrow();
        assert_eq!(requests[0].0, ME);
        assert!(requests[1..].iter().all(|(url, _)| url.starts_with("/templates/")));
    }

    #[tokio::test]
    async fn identity_request_carries_token() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));

        shell.get_user().await.unwrap();

        let requests = client.requests.borrow();
        assert_eq!(
            requests[0].1.get("Authorization").map(String::as_str),
            Some("Bearer abc")
        );
    }

    #[tokio::test]
    async fn get_user_is_idempotent() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));

        let first = shell.get_user().await.unwrap();
        let second = shell.get_user().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.hits(ME), 1);
    }

    #[tokio::test]
    async fn concurrent_get_user_shares_one_request() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));

        let (a, b) = futures::join!(shell.get_user(), shell.get_user());

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(client.hits(ME), 1);
    }

    #[tokio::test]
    async fn get_user_without_token_makes_no_request() {
        let (shell, client, _) = shell(None);
        let user = shell.get_user().await.unwrap();
        assert!(user.is_empty());
        assert!(client.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_clears_session_and_redirects() {
        let (shell, client, session) = shell(Some("stale"));
        client.mock_response(ME, 401, "");

        let nav = shell.navigate("/repos").await;

        assert_eq!(nav.path, "/signin");
        assert!(nav.error.is_none());
        assert!(!shell.signed_in());
        assert!(shell.state().ready);
        assert_eq!(session.get_token(), None);
        assert_eq!(client.hits("/templates/repos.html"), 0);

        // 令牌已清除，再次获取用户不会发请求
        shell.get_user().await.unwrap();
        assert_eq!(client.hits(ME), 1);
    }

    #[tokio::test]
    async fn backend_failure_is_surfaced_and_forces_signin() {
        let (shell, client, session) = shell(Some("abc"));
        client.mock_response(ME, 500, "oops");

        let nav = shell.navigate("/").await;

        assert_eq!(nav.path, "/signin");
        assert_eq!(nav.error.as_ref().and_then(AppError::status_code), Some(500));
        assert_eq!(
            shell.state().banner.and_then(|e| e.status_code()),
            Some(500)
        );
        assert!(!shell.signed_in());
        // 非 401 不清除令牌
        assert_eq!(session.get_token().as_deref(), Some("abc"));
        assert_eq!(client.hits(DASHBOARD_HTML), 0);
        assert_eq!(nav.component(Slot::Main).unwrap().name(), "signin");
    }

    #[tokio::test]
    async fn banner_cleared_by_next_successful_navigation() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_response(ME, 502, "");
        shell.navigate("/").await;
        assert!(shell.state().banner.is_some());

        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));
        let nav = shell.navigate("/").await;
        assert_eq!(nav.path, "/");
        assert!(shell.state().banner.is_none());
    }

    #[tokio::test]
    async fn template_failure_only_fails_its_slot() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));
        client.mock_response(NAVBAR_HTML, 404, "");

        let nav = shell.navigate("/").await;

        assert!(matches!(nav.slot(Slot::Header), Some(SlotContent::Failed(_))));
        assert_eq!(nav.component(Slot::Main).unwrap().name(), "dashboard");
    }

    #[tokio::test]
    async fn repeat_navigation_reuses_user_and_templates() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));

        shell.navigate("/").await;
        shell.navigate("/jobs").await;
        shell.navigate("/").await;

        assert_eq!(client.hits(ME), 1);
        assert_eq!(client.hits(NAVBAR_HTML), 1);
        assert_eq!(client.hits(DASHBOARD_HTML), 1);
    }

    #[tokio::test]
    async fn signed_in_user_is_sent_home_from_signin() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));
        shell.navigate("/").await;

        let nav = shell.navigate("/signin").await;
        assert_eq!(nav.path, "/");
        assert_eq!(client.hits(SIGNIN_HTML), 0);
    }

    #[tokio::test]
    async fn unknown_path_renders_not_found_when_authenticated() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));
        client.mock_response("/templates/not-found.html", 200, "<h1>404</h1>");

        let nav = shell.navigate("/nope").await;
        assert_eq!(nav.path, "/nope");
        assert_eq!(nav.component(Slot::Main).unwrap().name(), "not-found");
    }

    #[tokio::test]
    async fn local_only_policy_skips_identity_call() {
        let config = AppConfig {
            guard_policy: GuardPolicy::LocalOnly,
            ..AppConfig::default()
        };
        let (shell, client, _) = shell_with(config, Some("abc"));

        let nav = shell.navigate("/").await;

        assert_eq!(nav.path, "/");
        assert_eq!(client.hits(ME), 0);
        assert!(!shell.signed_in());
    }

    #[tokio::test]
    async fn sign_in_then_navigate_home() {
        let (shell, client, session) = shell(None);
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));

        assert!(!shell.sign_in("   "));
        assert_eq!(session.get_token(), None);

        assert!(shell.sign_in("a@b.com"));
        let nav = shell.navigate("/").await;
        assert_eq!(nav.path, "/");
        assert!(shell.signed_in());

        shell.sign_out();
        assert!(!shell.signed_in());
        assert_eq!(session.get_token(), None);
        assert_eq!(shell.navigate("/").await.path, "/signin");
    }

    #[tokio::test]
    async fn listeners_observe_state_changes() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));

        let seen = Rc::new(Cell::new(false));
        let flag = Rc::clone(&seen);
        shell.subscribe(move |state| {
            if state.signed_in() {
                flag.set(true);
            }
        });

        shell.navigate("/").await;
        assert!(seen.get());
    }

    #[tokio::test]
    async fn sign_out_forgets_user_and_token() {
        let (shell, client, session) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));
        shell.get_user().await.unwrap();
        assert!(shell.signed_in());

        shell.sign_out();

        assert!(!shell.signed_in());
        assert!(session.get_token().is_none());
        let nav = shell.navigate("/").await;
        assert_eq!(nav.path, "/signin");
        assert_eq!(client.hits(ME), 1);
    }

    #[tokio::test]
    async fn dismiss_banner_clears_error() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_response(ME, 503, "down");

        shell.navigate("/").await;
        assert!(shell.state().banner.is_some());

        shell.dismiss_banner();
        assert!(shell.state().banner.is_none());
    }

    #[tokio::test]
    async fn user_without_email_counts_as_signed_in() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "id": 7, "name": "deploy-bot" }));

        let home = shell.navigate("/").await;
        assert_eq!(home.path, "/");
        let user = shell.get_user().await.unwrap();
        assert!(user.email().is_none());
        assert!(!user.is_empty());
        assert!(shell.signed_in());

        // 非空用户离开登录页后停在首页，不会再被送回登录页
        let signin = shell.navigate("/signin").await;
        assert_eq!(signin.path, "/");
        let again = shell.navigate(&signin.path).await;
        assert_eq!(again.path, "/");
        assert_eq!(client.hits(ME), 1);
    }

    #[tokio::test]
    async fn removed_token_drops_cached_user() {
        let (shell, client, session) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));
        assert_eq!(shell.navigate("/").await.path, "/");

        session.clear_token();

        let signin = shell.navigate("/signin").await;
        assert_eq!(signin.path, "/signin");
        assert!(signin.error.is_none());
        assert!(!shell.signed_in());
        assert!(shell.state().banner.is_none());

        let home = shell.navigate("/").await;
        assert_eq!(home.path, "/signin");
        assert_eq!(client.hits(ME), 1);
    }

    #[tokio::test]
    async fn get_user_without_token_forgets_cached_user() {
        let (shell, client, session) = shell(Some("abc"));
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));
        shell.get_user().await.unwrap();

        session.clear_token();

        assert!(shell.get_user().await.unwrap().is_empty());
        assert!(!shell.signed_in());
        assert_eq!(client.hits(ME), 1);
    }

    #[tokio::test]
    async fn redirect_loop_stops_at_signin_with_error() {
        let config = AppConfig::default();
        let routes = RouteTable::new(vec![
            RouteDescriptor::exact("/signin")
                .slot(Slot::Main, catalog::SIGNIN)
                .public(),
            RouteDescriptor::catch_all()
                .slot(Slot::Main, catalog::NOT_FOUND)
                .public(),
        ])
        .unwrap();
        let client = Rc::new(MockHttpClient::new());
        mock_templates(&client);
        client.mock_json(ME, 200, json!({ "email": "a@b.com" }));
        let session = Rc::new(MemoryStore::with_token(&config.token_key, "abc"));
        let shell = AppShell::with_routes(config, Rc::clone(&client), session, routes);
        shell.get_user().await.unwrap();

        // 首页落在公开的兜底路由上：已登录用户被不断送回首页
        let nav = shell.navigate("/").await;

        assert_eq!(nav.path, "/signin");
        assert_eq!(
            nav.error.as_ref().map(AppError::error_code),
            Some("INVALID_ROUTE_TABLE")
        );
        assert!(shell.state().banner.is_some());
        assert_eq!(nav.component(Slot::Main).unwrap().name(), catalog::SIGNIN);
    }

    #[test]
    fn location_keeps_query_unless_redirected() {
        let kept = Navigation {
            requested: "/jobs".into(),
            path: "/jobs".into(),
            slots: Vec::new(),
            error: None,
        };
        assert_eq!(kept.location("/jobs/?page=2#top"), "/jobs?page=2#top");
        assert_eq!(kept.location("/jobs"), "/jobs");

        let redirected = Navigation {
            requested: "/jobs".into(),
            path: "/signin".into(),
            slots: Vec::new(),
            error: None,
        };
        assert_eq!(redirected.location("/jobs?page=2"), "/signin");
    }

    #[tokio::test]
    async fn non_object_identity_is_a_decode_error() {
        let (shell, client, _) = shell(Some("abc"));
        client.mock_json(ME, 200, json!(["not", "an", "object"]));

        let err = shell.get_user().await.unwrap_err();
        assert_eq!(err.error_code(), "DECODE_ERROR");
    }
}
