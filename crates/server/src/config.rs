use crate::gemini::DEFAULT_MODEL;
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "localhost:8000";
pub const DEFAULT_TEMPERATURE: f64 = 0.8;

/// Server settings shared by every connection
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Listen address
    pub addr: String,
    /// Model id passed to the backend
    pub model: String,
    pub temperature: f64,
    /// When set, every LOAD context is written here as pretty JSON
    pub dump_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            dump_path: None,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.addr.trim().is_empty() {
            return Err("addr must not be empty".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            ));
        }
        Ok(())
    }
}
