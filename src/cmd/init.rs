//! `tollgate init`: generate a starter configuration file.
//!
//! Creates a YAML, JSON, or TOML config file with either minimal
//! or fully documented templates.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::GatewayError;

pub fn execute(args: &InitArgs) -> Result<(), GatewayError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("tollgate.{}", args.format.extension())));

    if output.exists() {
        return Err(GatewayError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format, args.full))?;
    println!("Created {}", output.display());
    Ok(())
}

#[must_use]
pub const fn template(format: &ConfigFormat, full: bool) -> &'static str {
    match (format, full) {
        (ConfigFormat::Yaml, false) => YAML_MINIMAL,
        (ConfigFormat::Yaml, true) => YAML_FULL,
        (ConfigFormat::Json, false) => JSON_MINIMAL,
        (ConfigFormat::Json, true) => JSON_FULL,
        (ConfigFormat::Toml, false) => TOML_MINIMAL,
        (ConfigFormat::Toml, true) => TOML_FULL,
    }
}

const YAML_MINIMAL: &str = r#"# tollgate config

routes:
  - path: "/api/*"
    upstream: "http://localhost:8080"
"#;

const YAML_FULL: &str = r#"# tollgate config
#
# All values shown are defaults. Uncomment and modify as needed.

# Headers written by the gateway on every request and response
gateway:
  identity: "tollgate"           # X-Proxy-By upstream, X-Powered-By downstream
  # trust_request_id: false      # Reuse a well-formed inbound X-Request-ID
  # scheme: "http"               # Reported upstream as X-Forwarded-Proto
  # cors:
  #   enabled: true
  #   allow_origin: "*"
  #   allow_methods: "GET, POST, PUT, DELETE, OPTIONS"
  #   allow_headers: "Content-Type, Authorization"

# Global defaults applied to all routes unless overridden
defaults:
  timeout: 30000                 # Upstream timeout in ms
  # max_body: 1048576            # Larger request bodies get a 413
  # strip_hop_by_hop: true       # Strip Connection, TE, etc.

routes:
  # Prefix route: /api/users -> http://localhost:8080/api/users
  - path: "/api/*"
    upstream: "http://localhost:8080"

  # Full: all options shown
  # - path: "/api/python/*"
  #   methods: ["GET", "POST"]    # Default: ["*"] (all methods)
  #   upstream: "http://localhost:5001"
  #   strip_prefix: true          # /api/python/users -> /users
  #   timeout: 10000              # Override defaults.timeout

  # Parameters can be carried into the upstream host
  # - path: "/tenants/:tenant"
  #   upstream: "http://:tenant.internal:8080"
"#;

const JSON_MINIMAL: &str = r#"{
  "routes": [
    { "path": "/api/*", "upstream": "http://localhost:8080" }
  ]
}
"#;

const JSON_FULL: &str = r#"{
  "gateway": {
    "identity": "tollgate",
    "trust_request_id": false,
    "scheme": "http",
    "cors": {
      "enabled": true,
      "allow_origin": "*",
      "allow_methods": "GET, POST, PUT, DELETE, OPTIONS",
      "allow_headers": "Content-Type, Authorization"
    }
  },
  "defaults": {
    "timeout": 30000,
    "max_body": 1048576,
    "strip_hop_by_hop": true
  },
  "routes": [
    {
      "path": "/api/*",
      "methods": ["*"],
      "upstream": "http://localhost:8080",
      "strip_prefix": false
    }
  ]
}
"#;

const TOML_MINIMAL: &str = r#"# tollgate config

[[routes]]
path = "/api/*"
upstream = "http://localhost:8080"
"#;

const TOML_FULL: &str = r#"# tollgate config
#
# All values shown are defaults. Uncomment and modify as needed.

[gateway]
# identity = "tollgate"
# trust_request_id = false
# scheme = "http"

[gateway.cors]
# enabled = true
# allow_origin = "*"
# allow_methods = "GET, POST, PUT, DELETE, OPTIONS"
# allow_headers = "Content-Type, Authorization"

[defaults]
# timeout = 30000
# max_body = 1048576
# strip_hop_by_hop = true

[[routes]]
path = "/api/*"
upstream = "http://localhost:8080"
# methods = ["*"]
# strip_prefix = false
# timeout = 30000
"#;
