use super::types::Configuration;

/// The lowest-precedence layer: hard-coded defaults, overridden by file,
/// then env, then cli (`mod.rs::load`).
pub fn defaults() -> Configuration {
    Configuration::default()
}
