#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::utils::error::Result;
use crate::utils::validation::{validate_base_url, validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 資料來源實例設定，由宿主在建立實例時提供
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSourceSettings {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub with_credentials: bool,
    #[serde(default)]
    pub basic_auth: Option<String>,
}

impl Validate for DataSourceSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("datasource.name", &self.name)?;
        validate_base_url("datasource.url", self.url.as_deref().unwrap_or_default())?;
        Ok(())
    }
}

/// 建立後不再變動的連線設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    base_url: String,
    with_credentials: bool,
    headers: BTreeMap<String, String>,
}

impl ConnectionConfig {
    pub fn from_settings(settings: &DataSourceSettings) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(auth) = settings.basic_auth.as_deref().filter(|a| !a.is_empty()) {
            headers.insert("Authorization".to_string(), auth.to_string());
        }

        Self {
            base_url: settings.url.clone().unwrap_or_default(),
            with_credentials: settings.with_credentials,
            headers,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn with_credentials(&self) -> bool {
        self.with_credentials
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}
