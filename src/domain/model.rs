use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// 代表「全選」的哨兵值
pub const ALL_VALUE_MARKER: &str = "$__all";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextValuePair {
    pub text: Value,
    pub value: Value,
}

impl TextValuePair {
    pub fn new(text: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
        }
    }

    /// 將 /search 回應中的單一元素正規化。
    ///
    /// 判斷順序不可調換：帶有 text/value 的物件同時也是物件。
    pub fn from_search_item(index: usize, item: Value) -> Self {
        if let Value::Object(obj) = &item {
            let text = obj.get("text").filter(|v| is_truthy(v));
            let value = obj.get("value").filter(|v| is_truthy(v));
            if let (Some(text), Some(value)) = (text, value) {
                return Self::new(text.clone(), value.clone());
            }
        }

        match item {
            Value::Object(_) | Value::Array(_) => Self::new(item, index),
            scalar => Self::new(scalar.clone(), scalar),
        }
    }
}

/// 宿主語言的真值規則：null、false、0、"" 為假，其餘（含空物件與空陣列）為真
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// 值是否為全選標記：單一字串或只含標記的單元素陣列
pub fn is_all_marker(value: &Value) -> bool {
    match value {
        Value::String(s) => s == ALL_VALUE_MARKER,
        Value::Array(items) => items.len() == 1 && items[0].as_str() == Some(ALL_VALUE_MARKER),
        _ => false,
    }
}

pub type ScopedVars = HashMap<String, TextValuePair>;

/// 每次請求重新建立的變數快照，以變數 id 為鍵
pub type VariableSnapshot = BTreeMap<String, TextValuePair>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationFormat {
    Regex,
    Glob,
    Json,
    Raw,
}

impl FromStr for InterpolationFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "regex" => Ok(Self::Regex),
            "glob" => Ok(Self::Glob),
            "json" => Ok(Self::Json),
            "raw" => Ok(Self::Raw),
            other => Err(format!("Unknown interpolation format: {}", other)),
        }
    }
}

impl fmt::Display for InterpolationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Regex => "regex",
            Self::Glob => "glob",
            Self::Json => "json",
            Self::Raw => "raw",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VariableKind {
    Adhoc,
    Constant,
    Custom,
    Query,
    Textbox,
    Other(String),
}

impl VariableKind {
    pub fn is_supported(&self) -> bool {
        !matches!(self, VariableKind::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            VariableKind::Adhoc => "adhoc",
            VariableKind::Constant => "constant",
            VariableKind::Custom => "custom",
            VariableKind::Query => "query",
            VariableKind::Textbox => "textbox",
            VariableKind::Other(name) => name,
        }
    }
}

impl From<String> for VariableKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "adhoc" => VariableKind::Adhoc,
            "constant" => VariableKind::Constant,
            "custom" => VariableKind::Custom,
            "query" => VariableKind::Query,
            "textbox" => VariableKind::Textbox,
            _ => VariableKind::Other(value),
        }
    }
}

impl From<VariableKind> for String {
    fn from(kind: VariableKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 宿主管理的模板變數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVariable {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    #[serde(default)]
    pub current: TextValuePair,
    #[serde(default)]
    pub options: Vec<TextValuePair>,
    #[serde(default, alias = "allValue", skip_serializing_if = "Option::is_none")]
    pub all_value: Option<String>,
}

impl TemplateVariable {
    /// 目前值，全選標記已展開
    pub fn resolved_value(&self) -> Value {
        self.expand_all(&self.current.value)
    }

    /// 若值為全選標記，優先使用設定的 all 值；未設定或為空時取除第一個以外的所有選項值
    pub fn expand_all(&self, value: &Value) -> Value {
        if !is_all_marker(value) {
            return value.clone();
        }

        match self.all_value.as_deref() {
            Some(all) if !all.is_empty() => Value::String(all.to_string()),
            _ => Value::Array(
                self.options
                    .iter()
                    .skip(1)
                    .map(|option| option.value.clone())
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdhocFilter {
    pub key: String,
    pub operator: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// 結束於現在、長度為 duration 的區間；超出可表示的時間範圍時回傳 None
    pub fn last(duration: chrono::Duration) -> Option<Self> {
        let to = Utc::now();
        let from = to.checked_sub_signed(duration)?;
        Some(Self { from, to })
    }
}

/// 使用者輸入的原始時間範圍，例如 "now-6h" 到 "now"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTimeRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTarget {
    #[serde(rename = "refId", default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// 查詢字串；缺少時視為佔位目標
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryTarget {
    pub fn new(ref_id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            ref_id: Some(ref_id.into()),
            target: Some(Value::String(target.into())),
            extra: Map::new(),
        }
    }

    pub fn placeholder(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: Some(ref_id.into()),
            target: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub targets: Vec<QueryTarget>,
    pub range: TimeRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_raw: Option<RawTimeRange>,
    #[serde(default)]
    pub scoped_vars: ScopedVars,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 已過濾、已插值並附上 ad-hoc 篩選條件的查詢
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedQuery {
    pub targets: Vec<QueryTarget>,
    pub adhoc_filters: Vec<AdhocFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationDefinition {
    pub name: String,
    #[serde(default)]
    pub datasource: Value,
    #[serde(default)]
    pub enable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationQueryRequest {
    pub annotation: AnnotationDefinition,
    pub range: TimeRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_raw: Option<RawTimeRange>,
}

/// 送往 /annotations 的標註描述
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationDescriptor {
    pub query: String,
    pub name: String,
    pub datasource: Value,
    pub enable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationQueryBody {
    pub annotation: AnnotationDescriptor,
    pub range: TimeRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_raw: Option<RawTimeRange>,
    pub variables: VariableSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub status: TestStatus,
    pub message: String,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variable(all_value: Option<&str>, current: Value) -> TemplateVariable {
        TemplateVariable {
            id: "host".to_string(),
            kind: VariableKind::Custom,
            current: TextValuePair::new("All", current),
            options: vec![
                TextValuePair::new("All", ALL_VALUE_MARKER),
                TextValuePair::new("web-1", "web-1"),
                TextValuePair::new("web-2", "web-2"),
            ],
            all_value: all_value.map(str::to_string),
        }
    }

    #[test]
    fn test_search_item_with_text_and_value() {
        let pair = TextValuePair::from_search_item(0, json!({"text": "a", "value": "b"}));
        assert_eq!(pair, TextValuePair::new("a", "b"));
    }

    #[test]
    fn test_search_item_plain_object_uses_index() {
        let pair = TextValuePair::from_search_item(3, json!({"foo": 1}));
        assert_eq!(pair.text, json!({"foo": 1}));
        assert_eq!(pair.value, json!(3));
    }

    #[test]
    fn test_search_item_with_falsy_value_falls_back_to_index() {
        let pair = TextValuePair::from_search_item(1, json!({"text": "zero", "value": 0}));
        assert_eq!(pair.text, json!({"text": "zero", "value": 0}));
        assert_eq!(pair.value, json!(1));
    }

    #[test]
    fn test_search_item_scalars_are_echoed() {
        assert_eq!(
            TextValuePair::from_search_item(0, json!("x")),
            TextValuePair::new("x", "x")
        );
        assert_eq!(
            TextValuePair::from_search_item(5, json!(42)),
            TextValuePair::new(42, 42)
        );
        assert_eq!(
            TextValuePair::from_search_item(2, Value::Null),
            TextValuePair::new(Value::Null, Value::Null)
        );
    }

    #[test]
    fn test_search_item_array_uses_index() {
        let pair = TextValuePair::from_search_item(2, json!(["a", "b"]));
        assert_eq!(pair, TextValuePair::new(json!(["a", "b"]), 2));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!(-1.5)));
    }

    #[test]
    fn test_all_marker_detection() {
        assert!(is_all_marker(&json!("$__all")));
        assert!(is_all_marker(&json!(["$__all"])));
        assert!(!is_all_marker(&json!(["$__all", "web-1"])));
        assert!(!is_all_marker(&json!("web-1")));
        assert!(!is_all_marker(&json!([])));
    }

    #[test]
    fn test_expand_all_without_all_value_lists_options_minus_first() {
        let var = variable(Some(""), json!("$__all"));
        assert_eq!(var.resolved_value(), json!(["web-1", "web-2"]));

        let var = variable(None, json!(["$__all"]));
        assert_eq!(var.resolved_value(), json!(["web-1", "web-2"]));
    }

    #[test]
    fn test_expand_all_prefers_configured_all_value() {
        let var = variable(Some(".*"), json!("$__all"));
        assert_eq!(var.resolved_value(), json!(".*"));
    }

    #[test]
    fn test_expand_all_leaves_mixed_selection_untouched() {
        let var = variable(None, json!(["$__all", "web-2"]));
        assert_eq!(var.resolved_value(), json!(["$__all", "web-2"]));
    }

    #[test]
    fn test_variable_kind_round_trip_keeps_unknown_name() {
        let var: TemplateVariable = serde_json::from_value(json!({
            "id": "iv",
            "type": "interval",
            "current": {"text": "1m", "value": "1m"}
        }))
        .unwrap();
        assert_eq!(var.kind, VariableKind::Other("interval".to_string()));
        assert!(!var.kind.is_supported());
        assert_eq!(var.kind.to_string(), "interval");
    }

    #[test]
    fn test_query_target_keeps_extra_fields() {
        let target: QueryTarget = serde_json::from_value(json!({
            "refId": "A",
            "target": "select * from processes",
            "type": "table",
            "hide": false
        }))
        .unwrap();
        assert_eq!(target.extra.get("type"), Some(&json!("table")));

        let out = serde_json::to_value(&target).unwrap();
        assert_eq!(out["hide"], json!(false));
        assert_eq!(out["refId"], json!("A"));
    }

    #[test]
    fn test_last_range_rejects_unrepresentable_duration() {
        let range = TimeRange::last(chrono::Duration::hours(6)).unwrap();
        assert_eq!(range.to - range.from, chrono::Duration::hours(6));
        assert!(TimeRange::last(chrono::Duration::MAX).is_none());
    }

    #[test]
    fn test_interpolation_format_parse() {
        assert_eq!("glob".parse::<InterpolationFormat>(), Ok(InterpolationFormat::Glob));
        assert!("csv".parse::<InterpolationFormat>().is_err());
    }
}
