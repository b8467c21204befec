use crate::domain::model::{AdhocFilter, InterpolationFormat, ScopedVars, TemplateVariable};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// 宿主提供的模板變數服務
pub trait TemplateSrv: Send + Sync {
    fn replace(
        &self,
        target: &str,
        scoped_vars: Option<&ScopedVars>,
        format: InterpolationFormat,
    ) -> String;

    fn variables(&self) -> Vec<TemplateVariable>;
}

/// 依資料來源名稱取得 ad-hoc 篩選條件
pub trait AdhocFilterSource: Send + Sync {
    fn adhoc_filters(&self, datasource_name: &str) -> Vec<AdhocFilter>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub with_credentials: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    /// 已解析的回應內容；空白或非 JSON 時為 null
    pub data: Value,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 後端回報的訊息：優先取 body 的 message 欄位，其次是字串 body，最後是狀態文字
    pub fn message(&self) -> String {
        match &self.data {
            Value::Object(obj) => match obj.get("message") {
                Some(Value::String(msg)) => return msg.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            },
            Value::String(text) if !text.is_empty() => return text.clone(),
            _ => {}
        }
        self.status_text.clone()
    }
}

/// 宿主的 HTTP 傳輸層。非 2xx 回應在這層不算錯誤。
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse>;
}
