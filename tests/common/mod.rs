//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use gateway_config_engine::{Document, Engine, GenerationSources, ValueTree};

/// A complete, valid global document.
pub const GLOBAL_CONFIG: &str = r#"
[proxy]
id = "gateway-01"
log_level = "info"
pipelines_path = "pipelines"

[network.default]
enable_wireguard = false

[network.default.http]
bind_address = "0.0.0.0"
bind_port = 8080

[management]
enabled = true
network = "default"

[storage]
backend = "filesystem"
path = "/var/lib/gateway"

[services.http]
module = "gateway.services.http"

[targets.api]
authentication = "oauth"
timeout_secs = 60

[targets.api.connection]
host = "api.example.com"
port = 443
protocol = "https"

[peers.clinic]
authentication = "basic"

[peers.clinic.connection]
host = "clinic.example.com"

[authentications.oauth]
method = "oauth2"
token_url = "https://auth.example.com/token"

[authentications.basic]
method = "basic"
username = "svc"
password_file = "/run/secrets/svc"

[policies.baseline]
rules = ["allow_internal", "rate_limit"]

[rules.allow_internal]
type = "ip_allow"
[rules.allow_internal.options]
cidrs = ["10.0.0.0/8"]

[rules.rate_limit]
type = "rate_limit"
[rules.rate_limit.options]
limit = 100
"#;

/// A complete, valid pipeline document for [`GLOBAL_CONFIG`].
pub const PIPELINE_MAIN: &str = r#"
[pipelines.main]
networks = ["default"]
endpoints = ["inbound"]
backends = ["my_api"]
middleware = ["guard"]

[endpoints.inbound]
service = "http"
peer_ref = "clinic"
path_prefix = "/fhir"

[backends.my_api]
service = "http"
target_ref = "api"
timeout_secs = 120

[backends.my_api.options]
base_url = "https://api.example.com/v2"

[middleware.guard]
type = "policies"
policies = ["baseline"]
"#;

pub fn tree(src: &str) -> ValueTree {
    toml::from_str(src).expect("fixture is valid TOML")
}

pub fn document(name: &str, src: &str) -> Document {
    Document::new(name, tree(src))
}

pub fn engine() -> Engine {
    Engine::bundled().expect("bundled schemas load")
}

pub fn sources(global: &str, pipelines: &[(&str, &str)]) -> GenerationSources {
    GenerationSources {
        global: document("config.toml", global),
        pipelines: pipelines.iter().map(|(name, src)| document(name, src)).collect(),
    }
}

/// Write a generation to `dir`: `config.toml` plus `pipelines/<name>`.
pub fn write_generation(dir: &Path, global: &str, pipelines: &[(&str, &str)]) -> PathBuf {
    let config = dir.join("config.toml");
    fs::write(&config, global).expect("write config");
    let pipelines_dir = dir.join("pipelines");
    fs::create_dir_all(&pipelines_dir).expect("create pipelines dir");
    for (name, src) in pipelines {
        fs::write(pipelines_dir.join(name), src).expect("write pipeline");
    }
    config
}
