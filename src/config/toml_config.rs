use crate::adapters::template::StaticTemplateSrv;
use crate::config::DataSourceSettings;
use crate::domain::model::{AdhocFilter, TemplateVariable};
use crate::utils::error::{DataSourceError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_unique, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub datasource: DataSourceSettings,
    pub http: Option<HttpConfig>,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
    #[serde(default)]
    pub adhoc_filters: Vec<AdhocFilterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>,
}

/// 屬於某個資料來源的 ad-hoc 篩選條件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdhocFilterConfig {
    pub datasource: String,
    #[serde(flatten)]
    pub filter: AdhocFilter,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DataSourceError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DataSourceError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BACKEND_URL})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
            DataSourceError::ConfigError {
                message: format!("Invalid environment placeholder pattern: {}", e),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.http
            .as_ref()
            .and_then(|http| http.timeout_seconds)
            .map(Duration::from_secs)
    }

    /// 依設定的變數與 ad-hoc 篩選條件建立模板服務
    pub fn template_srv(&self) -> StaticTemplateSrv {
        let mut srv = StaticTemplateSrv::new(self.variables.clone());
        for entry in &self.adhoc_filters {
            srv = srv.with_adhoc_filter(&entry.datasource, entry.filter.clone());
        }
        srv
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.datasource.validate()?;

        for variable in &self.variables {
            validate_non_empty_string("variables.id", &variable.id)?;
        }
        validate_unique("variables.id", self.variables.iter().map(|v| v.id.as_str()))?;

        for entry in &self.adhoc_filters {
            validate_non_empty_string("adhoc_filters.datasource", &entry.datasource)?;
            validate_non_empty_string("adhoc_filters.key", &entry.filter.key)?;
        }

        if let Some(timeout) = self.http.as_ref().and_then(|h| h.timeout_seconds) {
            validate_positive_number("http.timeout_seconds", timeout, 1)?;
        }

        Ok(())
    }
}
