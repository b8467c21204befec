use clap::Parser;
use json_datasource::config::cli::{scoped_vars, Command};
use json_datasource::domain::model::{
    AnnotationDefinition, AnnotationQueryRequest, QueryRequest, QueryTarget,
};
use json_datasource::utils::error::ErrorCategory;
use json_datasource::utils::{logger, validation::Validate};
use json_datasource::{CliConfig, DataSource, ReqwestTransport, Result, TomlConfig};
use serde_json::{Map, Value};

async fn run(cli: CliConfig) -> Result<Value> {
    let config = TomlConfig::from_file(&cli.config)?;
    config.validate()?;
    tracing::debug!(
        "Loaded data source '{}' ({} variables)",
        config.datasource.name,
        config.variables.len()
    );

    let template_srv = config.template_srv();
    let transport = ReqwestTransport::new().with_timeout(config.timeout());
    let datasource = DataSource::new(
        &config.datasource,
        template_srv.clone(),
        template_srv,
        transport,
    );

    let output = match cli.command {
        Command::Test => serde_json::to_value(datasource.test_datasource().await?)?,
        Command::Query {
            targets,
            vars,
            time,
        } => {
            let (range, range_raw) = time.range()?;
            let targets = targets
                .iter()
                .enumerate()
                .map(|(i, target)| QueryTarget::new(ref_id(i), target.as_str()))
                .collect();
            let request = QueryRequest {
                targets,
                range,
                range_raw: Some(range_raw),
                scoped_vars: scoped_vars(&vars),
                extra: Map::new(),
            };
            datasource.query(request).await?
        }
        Command::Search { query, kind } => serde_json::to_value(
            datasource
                .metric_find_query(&query, kind.as_deref())
                .await?,
        )?,
        Command::TagKeys { body } => {
            let options = body
                .as_deref()
                .map(|b| serde_json::from_str::<Value>(b))
                .transpose()?;
            datasource.get_tag_keys(options).await?
        }
        Command::TagValues { body } => {
            datasource
                .get_tag_values(serde_json::from_str(&body)?)
                .await?
        }
        Command::Annotations {
            name,
            text,
            icon_color,
            time,
        } => {
            let (range, range_raw) = time.range()?;
            let request = AnnotationQueryRequest {
                annotation: AnnotationDefinition {
                    name,
                    datasource: Value::String(datasource.name().to_string()),
                    enable: true,
                    icon_color,
                    text,
                },
                range,
                range_raw: Some(range_raw),
            };
            datasource.annotation_query(request).await?
        }
        Command::Variables => serde_json::to_value(datasource.get_variables())?,
        Command::CleanMatch { pattern } => {
            Value::String(datasource.clean_match(&pattern, None)?)
        }
    };

    Ok(output)
}

/// A, B, ... Z, AA, AB ...
fn ref_id(index: usize) -> String {
    let letter = (b'A' + (index % 26) as u8) as char;
    if index < 26 {
        letter.to_string()
    } else {
        format!("{}{}", ref_id(index / 26 - 1), letter)
    }
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting json-datasource CLI");

    match run(cli).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Could not render output: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!("❌ Request failed: {} (Category: {:?})", e, e.category());
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());

            let exit_code = match e.category() {
                ErrorCategory::Configuration => 2,
                ErrorCategory::Network | ErrorCategory::Backend => 3,
                ErrorCategory::Data | ErrorCategory::System => 1,
            };
            std::process::exit(exit_code);
        }
    }
}
