use crate::config::{ConnectionConfig, DataSourceSettings};
use crate::domain::model::{
    AnnotationDescriptor, AnnotationQueryBody, AnnotationQueryRequest, InterpolationFormat,
    PreparedQuery, QueryRequest, ScopedVars, SearchRequest, TestResult, TestStatus, TextValuePair,
    VariableKind, VariableSnapshot,
};
use crate::domain::ports::{
    AdhocFilterSource, HttpMethod, HttpRequest, HttpResponse, HttpTransport, TemplateSrv,
};
use crate::utils::error::{DataSourceError, Result};
use serde_json::Value;

/// 將宿主的查詢、搜尋、標籤與標註請求轉送到 JSON 後端
pub struct DataSource<T: TemplateSrv, F: AdhocFilterSource, H: HttpTransport> {
    name: String,
    connection: ConnectionConfig,
    template_srv: T,
    adhoc_filters: F,
    transport: H,
}

impl<T: TemplateSrv, F: AdhocFilterSource, H: HttpTransport> DataSource<T, F, H> {
    pub fn new(settings: &DataSourceSettings, template_srv: T, adhoc_filters: F, transport: H) -> Self {
        Self {
            name: settings.name.clone(),
            connection: ConnectionConfig::from_settings(settings),
            template_srv,
            adhoc_filters,
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 丟棄佔位目標、插值查詢字串並附上 ad-hoc 篩選條件
    pub fn prepare_query(&self, request: QueryRequest) -> PreparedQuery {
        let QueryRequest {
            targets,
            scoped_vars,
            ..
        } = request;

        let targets = targets
            .into_iter()
            .filter(|target| target.target.is_some())
            .map(|mut target| {
                if let Some(Value::String(query)) = target.target.as_mut() {
                    *query = self.template_srv.replace(
                        query.as_str(),
                        Some(&scoped_vars),
                        InterpolationFormat::Regex,
                    );
                }
                target
            })
            .collect();

        PreparedQuery {
            targets,
            adhoc_filters: self.adhoc_filters.adhoc_filters(&self.name),
        }
    }

    pub async fn query(&self, request: QueryRequest) -> Result<Value> {
        let prepared = self.prepare_query(request);
        tracing::debug!(
            "🔎 {}: dispatching {} targets ({} ad-hoc filters)",
            self.name,
            prepared.targets.len(),
            prepared.adhoc_filters.len()
        );

        let body = serde_json::to_value(&prepared.targets)?;
        let response = self
            .do_request(HttpMethod::Post, Some("query"), Some(body))
            .await?;
        Ok(ensure_success(response)?.data)
    }

    /// 連線測試：只有 HTTP 200 視為成功，其他狀態回傳錯誤結果而不是 Err
    pub async fn test_datasource(&self) -> Result<TestResult> {
        let response = self.do_request(HttpMethod::Get, None, None).await?;

        if response.status == 200 {
            return Ok(TestResult {
                status: TestStatus::Success,
                message: "Data source is working".to_string(),
                title: "Success".to_string(),
            });
        }

        tracing::warn!(
            "⚠️ {}: connection test returned status {}",
            self.name,
            response.status
        );
        Ok(TestResult {
            status: TestStatus::Error,
            message: format!("Data source is not working: {}", response.message()),
            title: "Error".to_string(),
        })
    }

    pub async fn metric_find_query(
        &self,
        query: &str,
        kind: Option<&str>,
    ) -> Result<Vec<TextValuePair>> {
        let search = SearchRequest {
            kind: kind.map(str::to_string),
            target: self
                .template_srv
                .replace(query, None, InterpolationFormat::Regex),
        };

        let body = serde_json::to_value(&search)?;
        let response = self
            .do_request(HttpMethod::Post, Some("search"), Some(body))
            .await?;
        Ok(map_to_text_value(ensure_success(response)?.data))
    }

    pub async fn get_tag_keys(&self, options: Option<Value>) -> Result<Value> {
        let response = self
            .do_request(HttpMethod::Post, Some("tag-keys"), options)
            .await?;
        Ok(ensure_success(response)?.data)
    }

    pub async fn get_tag_values(&self, options: Value) -> Result<Value> {
        let response = self
            .do_request(HttpMethod::Post, Some("tag-values"), Some(options))
            .await?;
        Ok(ensure_success(response)?.data)
    }

    pub async fn annotation_query(&self, request: AnnotationQueryRequest) -> Result<Value> {
        let AnnotationQueryRequest {
            annotation,
            range,
            range_raw,
        } = request;

        let query = self.template_srv.replace(
            &annotation.text,
            Some(&ScopedVars::new()),
            InterpolationFormat::Glob,
        );

        let body = AnnotationQueryBody {
            annotation: AnnotationDescriptor {
                query,
                name: annotation.name,
                datasource: annotation.datasource,
                enable: annotation.enable,
                icon_color: annotation.icon_color,
            },
            range,
            range_raw,
            variables: self.get_variables(),
        };

        let body = serde_json::to_value(&body)?;
        let response = self
            .do_request(HttpMethod::Post, Some("annotations"), Some(body))
            .await?;
        Ok(ensure_success(response)?.data)
    }

    /// 建立目前模板變數的快照。ad-hoc 變數走獨立的篩選通道，不列入。
    pub fn get_variables(&self) -> VariableSnapshot {
        let mut snapshot = VariableSnapshot::new();

        for variable in self.template_srv.variables() {
            if !variable.kind.is_supported() {
                tracing::warn!("Variable of type \"{}\" is not supported", variable.kind);
                continue;
            }

            if variable.kind == VariableKind::Adhoc {
                continue;
            }

            let value = variable.resolved_value();
            snapshot.insert(
                variable.id.clone(),
                TextValuePair {
                    text: variable.current.text.clone(),
                    value,
                },
            );
        }

        snapshot
    }

    /// 以 JSON 格式插值；結果若被雙引號包住，解析成字串並去掉引號
    pub fn clean_match(&self, pattern: &str, scoped_vars: Option<&ScopedVars>) -> Result<String> {
        let replaced = self
            .template_srv
            .replace(pattern, scoped_vars, InterpolationFormat::Json);

        if replaced.starts_with('"') && replaced.ends_with('"') {
            return Ok(serde_json::from_str::<String>(&replaced)?);
        }
        Ok(replaced)
    }

    async fn do_request(
        &self,
        method: HttpMethod,
        path: Option<&str>,
        body: Option<Value>,
    ) -> Result<HttpResponse> {
        let url = match path {
            Some(path) => self.connection.endpoint(path),
            None => self.connection.base_url().to_string(),
        };

        self.transport
            .request(HttpRequest {
                method,
                url,
                body,
                headers: self.connection.headers().clone(),
                with_credentials: self.connection.with_credentials(),
            })
            .await
    }
}

fn ensure_success(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    Err(DataSourceError::HttpStatusError {
        status: response.status,
        message: response.message(),
    })
}

/// 將 /search 回應正規化為 text/value 配對；非陣列回應視為空結果
pub fn map_to_text_value(data: Value) -> Vec<TextValuePair> {
    match data {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| TextValuePair::from_search_item(index, item))
            .collect(),
        other => {
            tracing::warn!("Search response is not an array, ignoring: {}", other);
            Vec::new()
        }
    }
}
