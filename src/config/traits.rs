use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One `[section]` of the TOML configuration
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<()>;
}

/// Rates read from configuration must be finite and non-negative
pub(crate) fn check_rate(section: &str, name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(crate::error::DistevoError::Configuration(format!(
            "{}.{} must be a finite non-negative number, got {}",
            section, name, value
        )));
    }
    Ok(())
}
