//! 路由定义模块 - 领域模型
//!
//! 纯数据，不依赖 DOM：路径模式到命名插槽的静态映射。
//! 匹配按声明顺序进行，首个命中者胜出；兜底路由必须最后声明。

use std::fmt::Display;

use crate::component::catalog;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// 页面布局中的命名区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Header,
    Main,
    Footer,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Header => "header",
            Slot::Main => "main",
            Slot::Footer => "footer",
        }
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// 精确匹配
    Exact(String),
    /// `*`，匹配任意路径
    CatchAll,
}

impl PathPattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => p == path,
            PathPattern::CatchAll => true,
        }
    }
}

/// 路由描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub pattern: PathPattern,
    /// 插槽 -> 组件名，按插槽顺序排列
    pub slots: Vec<(Slot, &'static str)>,
    /// **守卫依据：该路由是否需要认证**
    pub requires_auth: bool,
}

impl RouteDescriptor {
    pub fn exact(path: &str) -> Self {
        Self {
            pattern: PathPattern::Exact(path.to_string()),
            slots: Vec::new(),
            requires_auth: true,
        }
    }

    pub fn catch_all() -> Self {
        Self {
            pattern: PathPattern::CatchAll,
            slots: Vec::new(),
            requires_auth: true,
        }
    }

    pub fn slot(mut self, slot: Slot, component: &'static str) -> Self {
        self.slots.retain(|(s, _)| *s != slot);
        self.slots.push((slot, component));
        self.slots.sort_by_key(|(s, _)| *s);
        self
    }

    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    pub fn component(&self, slot: Slot) -> Option<&'static str> {
        self.slots
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, name)| *name)
    }
}

/// 不可变路由表
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    /// 构建并校验路由表
    ///
    /// 要求：非空；恰好一个兜底路由且位于最后；精确路径不重复；组件均在目录中。
    pub fn new(routes: Vec<RouteDescriptor>) -> AppResult<Self> {
        let last = routes
            .last()
            .ok_or_else(|| AppError::InvalidRouteTable("no routes declared".to_string()))?;

        if last.pattern != PathPattern::CatchAll {
            return Err(AppError::InvalidRouteTable(
                "the catch-all route must be declared last".to_string(),
            ));
        }

        let catch_alls = routes
            .iter()
            .filter(|r| r.pattern == PathPattern::CatchAll)
            .count();
        if catch_alls != 1 {
            return Err(AppError::InvalidRouteTable(format!(
                "expected exactly one catch-all route, found {}",
                catch_alls
            )));
        }

        let mut seen = Vec::new();
        for route in &routes {
            if let PathPattern::Exact(path) = &route.pattern {
                if seen.contains(&path) {
                    return Err(AppError::InvalidRouteTable(format!(
                        "duplicate route `{}`",
                        path
                    )));
                }
                seen.push(path);
            }
            for (_, name) in &route.slots {
                if catalog::blueprint(name).is_none() {
                    return Err(AppError::UnknownComponent(name.to_string()));
                }
            }
        }

        Ok(Self { routes })
    }

    /// gitdeploy 控制台的标准路由
    pub fn standard(config: &AppConfig) -> AppResult<Self> {
        let mut routes = vec![
            RouteDescriptor::exact(&config.home_path)
                .slot(Slot::Header, catalog::NAVBAR)
                .slot(Slot::Main, catalog::DASHBOARD),
            RouteDescriptor::exact(&config.signin_path)
                .slot(Slot::Main, catalog::SIGNIN)
                .public(),
        ];
        for (path, component) in [
            ("/jobs", catalog::JOBS),
            ("/repos", catalog::REPOS),
            ("/sites", catalog::SITES),
        ] {
            routes.push(
                RouteDescriptor::exact(path)
                    .slot(Slot::Header, catalog::NAVBAR)
                    .slot(Slot::Main, component),
            );
        }
        routes.push(RouteDescriptor::catch_all().slot(Slot::Main, catalog::NOT_FOUND));
        Self::new(routes)
    }

    /// 首个匹配者胜出；兜底路由保证总有结果
    pub fn match_path(&self, path: &str) -> &RouteDescriptor {
        let path = normalize_path(path);
        self.routes
            .iter()
            .find(|r| r.pattern.matches(&path))
            .unwrap_or_else(|| &self.routes[self.routes.len() - 1])
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }
}

/// 去掉查询串、片段和末尾的 `/`
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
