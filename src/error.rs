use thiserror::Error;

// =========================================================
// 核心错误类型
// =========================================================

/// 控制台错误
///
/// 需要 `Clone`：组件解析和身份查询的结果通过共享 Future 分发给多个等待者。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// 网络层失败（请求未得到任何响应）
    #[error("network error on {url}: {message}")]
    Network { url: String, message: String },

    /// 服务端返回了非预期的状态码
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    /// 响应体无法解析
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// 路由表引用了目录中不存在的组件
    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    /// 路由表结构不合法
    #[error("invalid route table: {0}")]
    InvalidRouteTable(String),

    /// 配置解析失败
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AppError {
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// 机器可读的错误代码
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Network { .. } => "NETWORK_ERROR",
            AppError::Status { .. } => "UPSTREAM_STATUS",
            AppError::Decode { .. } => "DECODE_ERROR",
            AppError::UnknownComponent(_) => "UNKNOWN_COMPONENT",
            AppError::InvalidRouteTable(_) => "INVALID_ROUTE_TABLE",
            AppError::Config(_) => "INVALID_CONFIG",
        }
    }

    /// 若为 HTTP 状态错误，返回状态码
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AppError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
