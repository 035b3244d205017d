use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile { path: String, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    ParseFile { path: String, source: serde_yaml::Error },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
