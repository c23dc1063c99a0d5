//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for structural
//! errors such as empty routes, invalid paths, duplicate entries, bad HTTP
//! methods, malformed upstream URLs, zero timeouts or body limits and identity/CORS
//! values that cannot be sent as headers. Returns a list of
//! [`ValidationError`] values with per-field suggestions.

use axum::http::HeaderValue;
use url::Url;

use super::model::Config;
use crate::error::ValidationError;

pub const VALID_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "*",
];

/// Validate a single route path. Returns `Ok(())` or a human-readable error.
pub fn validate_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("path cannot be empty".into());
    }
    if !path.starts_with('/') && path != "*" {
        return Err(format!(
            "path must start with '/' or be '*' (did you mean '/{path}'?)"
        ));
    }
    Ok(())
}

/// Validate an upstream base URL. Returns `Ok(())` or a human-readable error.
pub fn validate_upstream_url(url: &str) -> Result<(), String> {
    let test_url = replace_params_for_validation(url);
    match Url::parse(&test_url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else if parsed.query().is_some() {
                Err("upstream URL cannot carry a query string".into())
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

/// Validate an HTTP method string. Returns `Ok(())` or a human-readable error.
pub fn validate_method(method: &str) -> Result<(), String> {
    let upper = method.to_uppercase();
    if VALID_METHODS.contains(&upper.as_str()) {
        Ok(())
    } else {
        Err(format!("'{method}' is not a valid HTTP method"))
    }
}

fn root_error(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        route: "(root)".into(),
        field: field.into(),
        message: message.into(),
        suggestion: None,
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let gateway = &config.gateway;
    if gateway.identity.trim().is_empty() {
        errors.push(root_error("gateway.identity", "identity cannot be empty"));
    }
    let header_fields = [
        ("gateway.identity", &gateway.identity),
        ("gateway.cors.allow_origin", &gateway.cors.allow_origin),
        ("gateway.cors.allow_methods", &gateway.cors.allow_methods),
        ("gateway.cors.allow_headers", &gateway.cors.allow_headers),
    ];
    for (field, value) in header_fields {
        if HeaderValue::from_str(value).is_err() {
            errors.push(root_error(field, "value cannot be sent as an HTTP header"));
        }
    }

    if config.defaults.timeout == 0 {
        errors.push(root_error("defaults.timeout", "timeout must be greater than 0"));
    }
    if config.defaults.max_body == 0 {
        errors.push(root_error("defaults.max_body", "max_body must be greater than 0"));
    }

    if config.routes.is_empty() {
        errors.push(root_error("routes", "at least one route must be defined"));
        return Err(errors);
    }

    let mut seen_paths = std::collections::HashSet::new();

    for (i, route) in config.routes.iter().enumerate() {
        let route_id = if route.path.is_empty() {
            format!("routes[{i}]")
        } else {
            route.path.clone()
        };

        if let Err(msg) = validate_path(&route.path) {
            errors.push(ValidationError {
                route: route_id.clone(),
                field: "path".into(),
                message: msg,
                suggestion: if !route.path.is_empty() && !route.path.starts_with('/') {
                    Some(format!("did you mean '/{}'?", route.path))
                } else {
                    None
                },
            });
        }

        if !seen_paths.insert(&route.path) {
            errors.push(ValidationError {
                route: route_id.clone(),
                field: "path".into(),
                message: "duplicate route path".into(),
                suggestion: None,
            });
        }

        for method in &route.methods {
            if let Err(msg) = validate_method(method) {
                errors.push(ValidationError {
                    route: route_id.clone(),
                    field: "methods".into(),
                    message: msg,
                    suggestion: None,
                });
            }
        }

        if let Err(msg) = validate_upstream_url(&route.upstream) {
            errors.push(ValidationError {
                route: route_id.clone(),
                field: "upstream".into(),
                message: msg,
                suggestion: None,
            });
        }

        if route.strip_prefix && !route.path.ends_with('*') {
            errors.push(ValidationError {
                route: route_id.clone(),
                field: "strip_prefix".into(),
                message: "strip_prefix only applies to wildcard routes".into(),
                suggestion: Some(format!(
                    "use path '{}/*'",
                    route.path.trim_end_matches('/')
                )),
            });
        }

        if route.timeout == Some(0) {
            errors.push(ValidationError {
                route: route_id.clone(),
                field: "timeout".into(),
                message: "timeout must be greater than 0".into(),
                suggestion: Some("remove it to use defaults.timeout".into()),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Replace `:param` patterns with a valid placeholder for URL validation.
fn replace_params_for_validation(url: &str) -> String {
    let mut result = String::with_capacity(url.len());
    let mut chars = url.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ':' && chars.peek().is_some_and(|c| c.is_alphabetic() || *c == '_') {
            result.push_str("_p");
            while chars
                .peek()
                .is_some_and(|c| c.is_alphanumeric() || *c == '_')
            {
                chars.next();
            }
        } else {
            result.push(ch);
        }
    }
    result
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let cors = if config.gateway.cors.enabled {
        format!("allow-origin {}", config.gateway.cors.allow_origin)
    } else {
        "disabled".to_string()
    };
    let mut lines = vec![
        format!("  {} routes", config.routes.len()),
        format!("  identity: {}", config.gateway.identity),
        format!("  cors: {cors}\n"),
    ];

    for route in &config.routes {
        let methods = route.methods.join(", ");
        let timeout = route.timeout.map_or_else(
            || format!("{}ms (default)", config.defaults.timeout),
            |t| format!("{t}ms"),
        );
        let strip = if route.strip_prefix {
            " (prefix stripped)"
        } else {
            ""
        };

        lines.push(format!("  {}  -> {}{strip}", route.path, route.upstream));
        lines.push(format!("    methods: {methods}"));
        lines.push(format!("    timeout: {timeout}"));
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}
