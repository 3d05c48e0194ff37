//! 运行时配置
//!
//! 所有字段都有默认值：页面上没有提供配置时，控制台按 gitdeploy 的默认布局运行。

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const DEFAULT_TEMPLATES_BASE: &str = "/templates";
const DEFAULT_IDENTITY_PATH: &str = "/api/auth/me.json";
const DEFAULT_TOKEN_KEY: &str = "token";
const DEFAULT_SIGNIN_PATH: &str = "/signin";
const DEFAULT_HOME_PATH: &str = "/";
const DEFAULT_MOUNT_SELECTOR: &str = ".app";
const DEFAULT_LOG_LEVEL: &str = "info";

/// 导航守卫策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolicy {
    /// 只检查本地令牌是否存在
    LocalOnly,
    /// 令牌存在时向身份接口确认
    #[default]
    Validated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 接口前缀，默认同源
    pub api_base: String,
    pub templates_base: String,
    pub identity_path: String,
    /// LocalStorage 中保存令牌的键
    pub token_key: String,
    pub signin_path: String,
    pub home_path: String,
    pub guard_policy: GuardPolicy,
    /// 应用挂载点的 CSS 选择器
    pub mount_selector: String,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            templates_base: DEFAULT_TEMPLATES_BASE.to_string(),
            identity_path: DEFAULT_IDENTITY_PATH.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            signin_path: DEFAULT_SIGNIN_PATH.to_string(),
            home_path: DEFAULT_HOME_PATH.to_string(),
            guard_policy: GuardPolicy::default(),
            mount_selector: DEFAULT_MOUNT_SELECTOR.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// 从 JSON 文本加载，缺失字段使用默认值
    pub fn from_json(raw: &str) -> AppResult<Self> {
        let mut config: AppConfig =
            serde_json::from_str(raw).map_err(|e| AppError::Config(e.to_string()))?;
        config.api_base = config.api_base.trim_end_matches('/').to_string();
        config.templates_base = config.templates_base.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        for (field, path) in [
            ("signin_path", &self.signin_path),
            ("home_path", &self.home_path),
            ("identity_path", &self.identity_path),
        ] {
            if !path.starts_with('/') {
                return Err(AppError::Config(format!(
                    "{} must start with '/': {}",
                    field, path
                )));
            }
        }
        if self.token_key.is_empty() {
            return Err(AppError::Config("token_key must not be empty".to_string()));
        }
        if self.signin_path == self.home_path {
            return Err(AppError::Config(
                "signin_path and home_path must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// 模板地址：`{api_base}{templates_base}/{name}.html`
    pub fn template_url(&self, name: &str) -> String {
        format!("{}{}/{}.html", self.api_base, self.templates_base, name)
    }

    pub fn identity_url(&self) -> String {
        format!("{}{}", self.api_base, self.identity_path)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
