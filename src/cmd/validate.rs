//! `tollgate validate`: check a configuration file for errors.
//!
//! Parses and validates the config file, reporting results in either
//! human-readable text or machine-readable JSON format.

use std::path::Path;

use serde::Serialize;

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::model::Config;
use crate::config::sources::parse_config_str;
use crate::config::validation;
use crate::error::{GatewayError, ValidationError};

#[derive(Debug, Serialize)]
struct Report<'a> {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    routes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cors: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<ReportedError<'a>>,
}

#[derive(Debug, Serialize)]
struct ReportedError<'a> {
    route: &'a str,
    field: &'a str,
    message: &'a str,
    suggestion: Option<&'a str>,
}

impl<'a> Report<'a> {
    fn valid(config: &'a Config) -> Self {
        Self {
            valid: true,
            routes: Some(config.routes.len()),
            identity: Some(&config.gateway.identity),
            cors: Some(config.gateway.cors.enabled),
            errors: Vec::new(),
        }
    }

    fn invalid(errors: &'a [ValidationError]) -> Self {
        Self {
            valid: false,
            routes: None,
            identity: None,
            cors: None,
            errors: errors
                .iter()
                .map(|e| ReportedError {
                    route: &e.route,
                    field: &e.field,
                    message: &e.message,
                    suggestion: e.suggestion.as_deref(),
                })
                .collect(),
        }
    }
}

pub fn execute(args: &ValidateArgs) -> Result<(), GatewayError> {
    let path = &args.config;
    let config = load(path)?;

    if let Err(errors) = validation::validate(&config) {
        match args.format {
            ValidateFormat::Text => {
                eprintln!("\u{2717} {} has {} errors\n", path.display(), errors.len());
                for error in &errors {
                    eprintln!("{error}");
                }
            }
            ValidateFormat::Json => print_json(&Report::invalid(&errors)),
        }
        return Err(GatewayError::ConfigValidation { errors });
    }

    match args.format {
        ValidateFormat::Text => println!(
            "\u{2713} {}",
            validation::format_validation_report(&path.display().to_string(), &config)
        ),
        ValidateFormat::Json => print_json(&Report::valid(&config)),
    }
    Ok(())
}

fn load(path: &Path) -> Result<Config, GatewayError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GatewayError::ConfigFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            GatewayError::Io(e)
        }
    })?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    parse_config_str(ext, &content, &path.display().to_string())
}

fn print_json(report: &Report<'_>) {
    match serde_json::to_string(report) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to encode report: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> Config {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn valid_report_summarises_gateway() {
        let config = config(r#"{"routes": [{"path": "/api/*", "upstream": "http://a:80"}]}"#);
        let json = serde_json::to_value(Report::valid(&config)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"valid": true, "routes": 1, "identity": "tollgate", "cors": true})
        );
    }

    #[test]
    fn invalid_report_lists_errors() {
        let config = config(r#"{"routes": [{"path": "api", "upstream": "http://a:80"}]}"#);
        let errors = validation::validate(&config).unwrap_err();
        let json = serde_json::to_value(Report::invalid(&errors)).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"][0]["field"], "path");
        assert_eq!(json["errors"][0]["suggestion"], "did you mean '/api'?");
        assert!(json.get("routes").is_none());
    }

    #[test]
    fn missing_file_is_reported_by_path() {
        let args = ValidateArgs {
            config: "definitely-not-here.yaml".into(),
            format: ValidateFormat::Text,
        };
        assert!(matches!(
            execute(&args),
            Err(GatewayError::ConfigFileNotFound { .. })
        ));
    }
}
