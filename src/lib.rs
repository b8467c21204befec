pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{ReqwestTransport, StaticTemplateSrv};
pub use config::{ConnectionConfig, DataSourceSettings, TomlConfig};
pub use crate::core::datasource::DataSource;
pub use utils::error::{DataSourceError, Result};
