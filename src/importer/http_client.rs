// ==========================================
// 统计数据抽取 - HTTP/JSON 客户端
// ==========================================
// 职责: 统计 API / SPARQL 端点的阻塞式请求
// 红线: 非成功状态码记录请求后直接返回错误，不做自动重试
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// 默认超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> ImportResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImportError::HttpTransport(format!("无法创建 HTTP 客户端: {}", e)))?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
        })
    }

    /// GET 请求并解析 JSON
    pub fn get_json(&self, url: &str, params: &[(&str, &str)]) -> ImportResult<Value> {
        debug!(url = %url, "HTTP GET");
        let response = self
            .client
            .get(url)
            .query(params)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()?;
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        Self::read_json(url, &query, response)
    }

    /// POST JSON 请求并解析 JSON
    pub fn post_json(&self, url: &str, body: &Value) -> ImportResult<Value> {
        debug!(url = %url, "HTTP POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()?;
        Self::read_json(url, &body.to_string(), response)
    }

    fn read_json(url: &str, query: &str, response: Response) -> ImportResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_else(|_| "<无法读取响应体>".to_string());
            error!(
                url = %url,
                status = status.as_u16(),
                body = %body,
                query = %query,
                "HTTP 请求失败"
            );
            return Err(ImportError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Value>().map_err(|e| ImportError::ResponseFormat {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}
