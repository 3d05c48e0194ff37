use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

#[cfg(test)]
use std::cell::RefCell;

// =========================================================
// 核心抽象层 (HTTP Interface Abstraction)
// =========================================================

/// 控制台只发出 GET：模板和身份查询都是只读的
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
        }
    }
}

/// 通用 HTTP 请求结构
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }
}

/// 通用 HTTP 响应结构
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// 2xx
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_str(&self.body).map_err(|e| AppError::decode(&self.url, e.to_string()))
    }
}

/// HTTP 客户端特性 (Trait)
///
/// (?Send)：浏览器的 fetch Future 不是 Send 的，整个控制台运行在单线程事件循环上。
/// 实现只负责传输：任何收到的响应（包括 4xx/5xx）都返回 `Ok`，
/// 只有请求没有得到响应时才返回 `AppError::Network`。
#[async_trait::async_trait(?Send)]
pub trait HttpClient {
    async fn send(&self, req: HttpRequest) -> AppResult<HttpResponse>;
}

// =========================================================
// 测试工具: MockHttpClient
// =========================================================

#[cfg(test)]
pub struct MockHttpClient {
    // URL -> (Status, Body)
    responses: RefCell<HashMap<String, (u16, String)>>,
    // 模拟网络失败的 URL
    offline: RefCell<Vec<String>>,
    // 记录发出的请求 (URL, Headers)
    pub requests: RefCell<Vec<(String, HashMap<String, String>)>>,
}

#[cfg(test)]
impl MockHttpClient {
    pub fn new() -> Self {
        Self {
            responses: RefCell::new(HashMap::new()),
            offline: RefCell::new(Vec::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn mock_response(&self, url: &str, status: u16, body: &str) {
        self.responses
            .borrow_mut()
            .insert(url.to_string(), (status, body.to_string()));
    }

    pub fn mock_json(&self, url: &str, status: u16, body: serde_json::Value) {
        self.mock_response(url, status, &body.to_string());
    }

    pub fn mock_offline(&self, url: &str) {
        self.offline.borrow_mut().push(url.to_string());
    }

    /// 指定 URL 被请求的次数
    pub fn hits(&self, url: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|(u, _)| u == url)
            .count()
    }
}

#[cfg(test)]
#[async_trait::async_trait(?Send)]
impl HttpClient for MockHttpClient {
    async fn send(&self, req: HttpRequest) -> AppResult<HttpResponse> {
        self.requests
            .borrow_mut()
            .push((req.url.clone(), req.headers.clone()));

        // 让出一次，模拟真实请求的挂起点
        tokio::task::yield_now().await;

        if self.offline.borrow().contains(&req.url) {
            return Err(AppError::network(&req.url, "connection refused"));
        }

        let responses = self.responses.borrow();
        let (status, body) = responses
            .get(&req.url)
            .cloned()
            .unwrap_or_else(|| (404, "Not Found".to_string()));
        Ok(HttpResponse {
            url: req.url,
            status,
            body,
        })
    }
}
