//! HTTP 传输实现
//!
//! 使用 `web_sys::fetch` 实现引擎的 `HttpClient`。任何收到的响应都返回 `Ok`，
//! 状态码的解释由调用方负责。

use gitdeploy_console::{AppError, AppResult, HttpClient, HttpRequest, HttpResponse};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response};

/// 基于浏览器 fetch 的客户端
#[derive(Clone, Copy, Default)]
pub struct FetchHttpClient;

impl FetchHttpClient {
    async fn read_text(url: &str, response: &Response) -> AppResult<String> {
        let promise = response
            .text()
            .map_err(|e| AppError::decode(url, format!("{:?}", e)))?;

        let text = JsFuture::from(promise)
            .await
            .map_err(|e| AppError::decode(url, format!("{:?}", e)))?;

        text.as_string()
            .ok_or_else(|| AppError::decode(url, "response body is not a string"))
    }
}

#[async_trait::async_trait(?Send)]
impl HttpClient for FetchHttpClient {
    async fn send(&self, req: HttpRequest) -> AppResult<HttpResponse> {
        let url = req.url.clone();

        let headers =
            Headers::new().map_err(|e| AppError::network(&url, format!("创建 Headers 失败: {:?}", e)))?;
        for (key, value) in &req.headers {
            headers
                .set(key, value)
                .map_err(|e| AppError::network(&url, format!("设置 Header 失败: {:?}", e)))?;
        }

        let opts = RequestInit::new();
        opts.set_method(req.method.as_str());
        opts.set_headers(&headers.into());

        let request = Request::new_with_str_and_init(&url, &opts)
            .map_err(|e| AppError::network(&url, format!("{:?}", e)))?;

        let window =
            web_sys::window().ok_or_else(|| AppError::network(&url, "无法获取 window 对象"))?;

        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| AppError::network(&url, format!("{:?}", e)))?;

        let response: Response = resp_value
            .dyn_into()
            .map_err(|e| AppError::decode(&url, format!("Response 类型转换失败: {:?}", e)))?;

        let body = Self::read_text(&url, &response).await?;

        Ok(HttpResponse {
            url,
            status: response.status(),
            body,
        })
    }
}
