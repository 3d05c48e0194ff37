//! 异步组件
//!
//! 组件 = 服务端模板 + 本地蓝图（props / data / computed）。
//! 模板在首次使用时通过 HTTP 获取，解析结果在进程生命周期内按名称缓存。

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use log::{debug, error};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::request::{HttpClient, HttpRequest};

/// 组件作用域：data ∪ props ∪ computed
pub type Scope = serde_json::Map<String, Value>;

// =========================================================
// 蓝图 (Blueprint)
// =========================================================

/// 组件的类型化定义部分
///
/// 方法和生命周期钩子需要 DOM 与路由，由前端按组件名挂接。
#[derive(Debug)]
pub struct Blueprint {
    pub name: &'static str,
    /// 允许从父级传入的属性
    pub props: &'static [&'static str],
    /// 初始状态
    pub data: fn() -> Scope,
    /// 基于当前作用域派生的值
    pub computed: fn(&Scope) -> Scope,
}

fn no_data() -> Scope {
    Scope::new()
}

fn no_computed(_: &Scope) -> Scope {
    Scope::new()
}

pub mod catalog {
    use super::{Blueprint, Scope, no_computed, no_data, truthy};
    use serde_json::{Value, json};

    pub const NAVBAR: &str = "navbar";
    pub const DASHBOARD: &str = "dashboard";
    pub const SIGNIN: &str = "signin";
    pub const NOT_FOUND: &str = "not-found";
    pub const JOBS: &str = "jobs";
    pub const REPOS: &str = "repos";
    pub const SITES: &str = "sites";

    fn navbar_data() -> Scope {
        let mut scope = Scope::new();
        scope.insert("ready".into(), Value::Bool(false));
        scope
    }

    fn signin_data() -> Scope {
        match json!({ "email": "", "busy": false, "state": "" }) {
            Value::Object(map) => map,
            _ => Scope::new(),
        }
    }

    /// `ready`：用户信息中存在 email
    fn user_ready(scope: &Scope) -> Scope {
        let ready = scope
            .get("user")
            .and_then(|u| u.get("email"))
            .is_some_and(truthy);
        let mut computed = Scope::new();
        computed.insert("ready".into(), Value::Bool(ready));
        computed
    }

    static BLUEPRINTS: &[Blueprint] = &[
        Blueprint {
            name: NAVBAR,
            props: &["user"],
            data: navbar_data,
            computed: no_computed,
        },
        Blueprint {
            name: DASHBOARD,
            props: &["user"],
            data: no_data,
            computed: user_ready,
        },
        Blueprint {
            name: SIGNIN,
            props: &[],
            data: signin_data,
            computed: no_computed,
        },
        Blueprint {
            name: NOT_FOUND,
            props: &[],
            data: no_data,
            computed: no_computed,
        },
        Blueprint {
            name: JOBS,
            props: &["user"],
            data: no_data,
            computed: user_ready,
        },
        Blueprint {
            name: REPOS,
            props: &["user"],
            data: no_data,
            computed: user_ready,
        },
        Blueprint {
            name: SITES,
            props: &["user"],
            data: no_data,
            computed: user_ready,
        },
    ];

    pub fn blueprint(name: &str) -> Option<&'static Blueprint> {
        BLUEPRINTS.iter().find(|b| b.name == name)
    }
}

// =========================================================
// 已解析组件
// =========================================================

#[derive(Debug)]
pub struct ComponentDefinition {
    pub blueprint: &'static Blueprint,
    pub template: String,
}

impl ComponentDefinition {
    pub fn name(&self) -> &'static str {
        self.blueprint.name
    }

    /// 组装作用域：data，然后是声明过的 props，最后是 computed
    pub fn scope(&self, props: &Scope) -> Scope {
        let mut scope = (self.blueprint.data)();
        for prop in self.blueprint.props {
            if let Some(value) = props.get(*prop) {
                scope.insert((*prop).to_string(), value.clone());
            }
        }
        let computed = (self.blueprint.computed)(&scope);
        scope.extend(computed);
        scope
    }

    /// 渲染模板，`{{ a.b }}` 替换为作用域中经 HTML 转义的值
    pub fn render(&self, scope: &Scope) -> String {
        interpolate(&self.template, scope)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn lookup<'a>(scope: &'a Scope, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = scope.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn interpolate(template: &str, scope: &Scope) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let expr = after[..end].trim();
                if let Some(value) = lookup(scope, expr) {
                    out.push_str(&escape_html(&display(value)));
                }
                rest = &after[end + 2..];
            }
            None => {
                // 未闭合，原样输出
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

// =========================================================
// 模板获取
// =========================================================

pub struct TemplateFetcher<C: HttpClient> {
    client: Rc<C>,
    config: Rc<AppConfig>,
}

impl<C: HttpClient> TemplateFetcher<C> {
    pub fn new(client: Rc<C>, config: Rc<AppConfig>) -> Self {
        Self { client, config }
    }

    /// 一次 GET；网络错误或非 2xx 均失败，不重试
    pub async fn fetch(&self, name: &str) -> AppResult<String> {
        let url = self.config.template_url(name);
        let resp = self.client.send(HttpRequest::get(&url)).await?;
        if !resp.ok() {
            return Err(AppError::status(url, resp.status));
        }
        Ok(resp.body)
    }
}

// =========================================================
// 异步组件解析
// =========================================================

type PendingComponent = Shared<LocalBoxFuture<'static, AppResult<Arc<ComponentDefinition>>>>;

/// 惰性组件解析器
///
/// 同名组件共享同一个进行中的 Future：并发挂载和之后的挂载都只触发一次 GET。
/// 失败的结果会被移出缓存，下一次挂载重新获取。
pub struct ComponentResolver<C: HttpClient + 'static> {
    fetcher: Rc<TemplateFetcher<C>>,
    cache: RefCell<HashMap<String, PendingComponent>>,
}

impl<C: HttpClient + 'static> ComponentResolver<C> {
    pub fn new(fetcher: TemplateFetcher<C>) -> Self {
        Self {
            fetcher: Rc::new(fetcher),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, name: &str) -> AppResult<Arc<ComponentDefinition>> {
        let blueprint =
            catalog::blueprint(name).ok_or_else(|| AppError::UnknownComponent(name.to_string()))?;

        let pending = {
            let mut cache = self.cache.borrow_mut();
            match cache.get(name) {
                Some(pending) => {
                    debug!("component `{}` served from cache", name);
                    pending.clone()
                }
                None => {
                    let fetcher = Rc::clone(&self.fetcher);
                    let pending = async move {
                        let template = fetcher.fetch(blueprint.name).await?;
                        Ok::<_, AppError>(Arc::new(ComponentDefinition {
                            blueprint,
                            template,
                        }))
                    }
                    .boxed_local()
                    .shared();
                    cache.insert(name.to_string(), pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;
        if let Err(e) = &result {
            error!("failed to resolve component `{}`: {}", name, e);
            let mut cache = self.cache.borrow_mut();
            if cache.get(name).is_some_and(|p| p.ptr_eq(&pending)) {
                cache.remove(name);
            }
        }
        result
    }

    /// 已成功解析的组件（不触发请求）
    pub fn cached(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.cache
            .borrow()
            .get(name)
            .and_then(|p| p.peek().cloned())
            .and_then(Result::ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MockHttpClient;
    use serde_json::json;

    const SIGNIN_URL: &str = "/templates/signin.html";

    fn resolver(client: &Rc<MockHttpClient>) -> ComponentResolver<MockHttpClient> {
        let fetcher = TemplateFetcher::new(Rc::clone(client), Rc::new(AppConfig::default()));
        ComponentResolver::new(fetcher)
    }

    fn scope_of(value: Value) -> Scope {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn second_resolve_does_not_fetch_again() {
        let client = Rc::new(MockHttpClient::new());
        client.mock_response(SIGNIN_URL, 200, "<form></form>");
        let resolver = resolver(&client);

        let first = resolver.resolve("signin").await.unwrap();
        let second = resolver.resolve("signin").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.template, "<form></form>");
        assert_eq!(client.hits(SIGNIN_URL), 1);
        assert!(resolver.cached("signin").is_some());
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_request() {
        let client = Rc::new(MockHttpClient::new());
        client.mock_response(SIGNIN_URL, 200, "<form></form>");
        let resolver = resolver(&client);

        let (a, b) = futures::join!(resolver.resolve("signin"), resolver.resolve("signin"));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(client.hits(SIGNIN_URL), 1);
    }

    #[tokio::test]
    async fn non_2xx_fails_and_is_not_cached() {
        let client = Rc::new(MockHttpClient::new());
        client.mock_response(SIGNIN_URL, 500, "boom");
        let resolver = resolver(&client);

        let err = resolver.resolve("signin").await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert!(resolver.cached("signin").is_none());

        // 下一次挂载重新请求
        client.mock_response(SIGNIN_URL, 200, "<form></form>");
        assert!(resolver.resolve("signin").await.is_ok());
        assert_eq!(client.hits(SIGNIN_URL), 2);
    }

    #[tokio::test]
    async fn network_failure_propagates() {
        let client = Rc::new(MockHttpClient::new());
        client.mock_offline(SIGNIN_URL);
        let resolver = resolver(&client);

        let err = resolver.resolve("signin").await.unwrap_err();
        assert_eq!(err.error_code(), "NETWORK_ERROR");
    }

    #[tokio::test]
    async fn unknown_component_never_hits_network() {
        let client = Rc::new(MockHttpClient::new());
        let resolver = resolver(&client);

        let err = resolver.resolve("settings").await.unwrap_err();
        assert_eq!(err, AppError::UnknownComponent("settings".into()));
        assert!(client.requests.borrow().is_empty());
    }

    #[test]
    fn dashboard_scope_merges_props_and_computed() {
        let def = ComponentDefinition {
            blueprint: catalog::blueprint("dashboard").unwrap(),
            template: "<p>{{ user.email }}</p><i>{{ ready }}</i>".into(),
        };
        let props = scope_of(json!({ "user": { "email": "a@b.com" }, "ignored": 1 }));
        let scope = def.scope(&props);

        assert_eq!(scope.get("ready"), Some(&Value::Bool(true)));
        assert!(scope.get("ignored").is_none());
        assert_eq!(def.render(&scope), "<p>a@b.com</p><i>true</i>");

        let empty = def.scope(&Scope::new());
        assert_eq!(empty.get("ready"), Some(&Value::Bool(false)));
    }

    #[test]
    fn render_escapes_values_and_tolerates_bad_syntax() {
        let scope = scope_of(json!({ "name": "<b>&</b>", "n": 3, "nothing": null }));
        assert_eq!(
            interpolate("{{name}}|{{ n }}|{{ nothing }}|{{ missing.key }}|{{ open", &scope),
            "&lt;b&gt;&amp;&lt;/b&gt;|3|||{{ open"
        );
    }

    #[test]
    fn signin_starts_with_empty_form_state() {
        let signin = catalog::blueprint(catalog::SIGNIN).unwrap();
        let data = (signin.data)();
        assert_eq!(data.get("email"), Some(&json!("")));
        assert_eq!(data.get("busy"), Some(&json!(false)));
    }
}
