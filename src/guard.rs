//! 导航守卫
//!
//! 每次导航执行一次，并且在目标路由的组件开始解析之前完成（包括身份查询的往返）。

use log::{debug, warn};

use crate::config::{AppConfig, GuardPolicy};
use crate::error::AppResult;
use crate::route::RouteDescriptor;
use crate::shell::CurrentUser;

/// 守卫所需的身份信息来源，由应用外壳实现
#[async_trait::async_trait(?Send)]
pub trait IdentitySource {
    /// 本地是否存在令牌
    fn has_token(&self) -> bool;

    /// 已解析且非空的用户（不触发请求）
    fn cached_user(&self) -> Option<CurrentUser>;

    /// 解析当前用户；401 时返回空用户
    async fn get_user(&self) -> AppResult<CurrentUser>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// 本地没有令牌
    MissingToken,
    /// 身份接口返回 401
    Unauthorized,
    /// 已登录用户访问登录页
    AlreadySignedIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect { to: String, reason: RedirectReason },
}

pub struct AuthGuard {
    policy: GuardPolicy,
    signin_path: String,
    home_path: String,
}

impl AuthGuard {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            policy: config.guard_policy,
            signin_path: config.signin_path.clone(),
            home_path: config.home_path.clone(),
        }
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    fn to_signin(&self, reason: RedirectReason) -> GuardDecision {
        GuardDecision::Redirect {
            to: self.signin_path.clone(),
            reason,
        }
    }

    /// **核心守卫逻辑**
    ///
    /// 返回 `Err` 仅当身份接口以 401 以外的状态失败；调用方负责呈现该错误。
    pub async fn check<I>(&self, route: &RouteDescriptor, identity: &I) -> AppResult<GuardDecision>
    where
        I: IdentitySource + ?Sized,
    {
        if !route.requires_auth {
            if self.policy == GuardPolicy::Validated
                && identity.has_token()
                && identity.cached_user().is_some()
            {
                debug!("[Guard] already signed in, leaving public route");
                return Ok(GuardDecision::Redirect {
                    to: self.home_path.clone(),
                    reason: RedirectReason::AlreadySignedIn,
                });
            }
            return Ok(GuardDecision::Allow);
        }

        if !identity.has_token() {
            debug!("[Guard] no token, redirecting to sign-in");
            return Ok(self.to_signin(RedirectReason::MissingToken));
        }

        match self.policy {
            GuardPolicy::LocalOnly => Ok(GuardDecision::Allow),
            GuardPolicy::Validated => {
                let user = identity.get_user().await?;
                if user.is_empty() {
                    warn!("[Guard] token rejected by identity endpoint");
                    Ok(self.to_signin(RedirectReason::Unauthorized))
                } else {
                    Ok(GuardDecision::Allow)
                }
            }
        }
    }
}
