use crate::domain::model::{AdhocFilter, InterpolationFormat, ScopedVars, TemplateVariable};
use crate::domain::ports::{AdhocFilterSource, TemplateSrv};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// $var、[[var]]、[[var:fmt]]、${var}、${var:fmt}
static VARIABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(\w+)|\[\[(\w+?)(?::(\w+))?\]\]|\$\{(\w+)(?::(\w+))?\}")
        .expect("variable pattern is valid")
});

/// 以固定變數集合實作宿主的模板服務，用於 CLI 與測試
#[derive(Debug, Clone, Default)]
pub struct StaticTemplateSrv {
    variables: Vec<TemplateVariable>,
    adhoc_filters: HashMap<String, Vec<AdhocFilter>>,
}

impl StaticTemplateSrv {
    pub fn new(variables: Vec<TemplateVariable>) -> Self {
        Self {
            variables,
            adhoc_filters: HashMap::new(),
        }
    }

    pub fn with_adhoc_filter(mut self, datasource_name: &str, filter: AdhocFilter) -> Self {
        self.adhoc_filters
            .entry(datasource_name.to_string())
            .or_default()
            .push(filter);
        self
    }

    fn lookup(&self, name: &str, scoped_vars: Option<&ScopedVars>) -> Option<Value> {
        if let Some(scoped) = scoped_vars.and_then(|vars| vars.get(name)) {
            return Some(scoped.value.clone());
        }

        self.variables
            .iter()
            .find(|variable| variable.id == name)
            .map(TemplateVariable::resolved_value)
    }
}

impl TemplateSrv for StaticTemplateSrv {
    fn replace(
        &self,
        target: &str,
        scoped_vars: Option<&ScopedVars>,
        format: InterpolationFormat,
    ) -> String {
        VARIABLE_PATTERN
            .replace_all(target, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(4))
                    .map(|m| m.as_str())
                    .unwrap_or_default();

                let explicit_format = caps.get(3).or_else(|| caps.get(5)).and_then(|m| {
                    match m.as_str().parse::<InterpolationFormat>() {
                        Ok(format) => Some(format),
                        Err(e) => {
                            tracing::warn!("{} in '{}', using {}", e, &caps[0], format);
                            None
                        }
                    }
                });

                match self.lookup(name, scoped_vars) {
                    Some(value) => format_value(&value, explicit_format.unwrap_or(format)),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn variables(&self) -> Vec<TemplateVariable> {
        self.variables.clone()
    }
}

impl AdhocFilterSource for StaticTemplateSrv {
    fn adhoc_filters(&self, datasource_name: &str) -> Vec<AdhocFilter> {
        self.adhoc_filters
            .get(datasource_name)
            .cloned()
            .unwrap_or_default()
    }
}

pub fn format_value(value: &Value, format: InterpolationFormat) -> String {
    match format {
        InterpolationFormat::Json => value.to_string(),
        InterpolationFormat::Regex => match value {
            Value::Array(items) if items.len() == 1 => escape_regex(&scalar_text(&items[0])),
            Value::Array(items) => {
                let escaped: Vec<String> =
                    items.iter().map(|item| escape_regex(&scalar_text(item))).collect();
                format!("({})", escaped.join("|"))
            }
            other => escape_regex(&scalar_text(other)),
        },
        InterpolationFormat::Glob => match value {
            Value::Array(items) if items.len() > 1 => {
                let parts: Vec<String> = items.iter().map(scalar_text).collect();
                format!("{{{}}}", parts.join(","))
            }
            Value::Array(items) => items.first().map(scalar_text).unwrap_or_default(),
            other => scalar_text(other),
        },
        InterpolationFormat::Raw => match value {
            Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(","),
            other => scalar_text(other),
        },
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 跳脫正規表示式特殊字元（與宿主相同的字元集，不含 '-'）
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '^' | '$' | '*' | '+' | '?' | '.' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '/'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
