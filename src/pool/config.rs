//! Pool sizing configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Largest slab count or slab capacity a 16-bit id can address
pub const MAX_ID_SPACE: usize = 1 << 16;

/// Default slots per slab
pub const DEFAULT_SLAB_CAPACITY: usize = 1 << 8;

/// Default slab table size
pub const DEFAULT_MAX_SLABS: usize = 1 << 8;

/// Environment variable prefix for [`PoolConfig::load`]
pub const ENV_PREFIX: &str = "SLABPTR";

/// Shape of a [`SlabPool`](super::SlabPool)
///
/// Both values are fixed for the lifetime of a pool. Together they bound
/// the number of addressable elements to `max_slabs * slab_capacity - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Slots per slab
    pub slab_capacity: usize,
    /// Number of entries in the slab table
    pub max_slabs: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            slab_capacity: DEFAULT_SLAB_CAPACITY,
            max_slabs: DEFAULT_MAX_SLABS,
        }
    }
}

impl PoolConfig {
    pub fn new(slab_capacity: usize, max_slabs: usize) -> Self {
        Self {
            slab_capacity,
            max_slabs,
        }
    }

    /// Check that both ids fit in 16 bits and neither dimension is empty
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_ID_SPACE).contains(&self.slab_capacity) {
            return Err(Error::InvalidConfig(format!(
                "slab_capacity must be in 1..={}, got {}",
                MAX_ID_SPACE, self.slab_capacity
            )));
        }
        if !(1..=MAX_ID_SPACE).contains(&self.max_slabs) {
            return Err(Error::InvalidConfig(format!(
                "max_slabs must be in 1..={}, got {}",
                MAX_ID_SPACE, self.max_slabs
            )));
        }
        Ok(())
    }

    /// Usable slots, excluding the reserved null slot
    pub fn capacity(&self) -> usize {
        self.max_slabs * self.slab_capacity - 1
    }

    /// Parse and validate a TOML document
    ///
    /// ```toml
    /// slab_capacity = 512
    /// max_slabs = 128
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| Error::Config(format!("Failed to parse pool config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Layer defaults, an optional config file and `SLABPTR_*` environment
    /// variables, in that order of precedence
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            let path = path.as_ref();
            debug!(path = ?path, "Loading pool config file");
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let config: Self = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(format!("Failed to load pool config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.slab_capacity, 256);
        assert_eq!(config.max_slabs, 256);
        assert_eq!(config.capacity(), 65535);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds() {
        assert!(PoolConfig::new(0, 4).validate().is_err());
        assert!(PoolConfig::new(4, 0).validate().is_err());
        assert!(PoolConfig::new(MAX_ID_SPACE + 1, 1).validate().is_err());
        assert!(PoolConfig::new(1, MAX_ID_SPACE + 1).validate().is_err());
        assert!(PoolConfig::new(MAX_ID_SPACE, MAX_ID_SPACE)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_from_toml() -> Result<()> {
        let config = PoolConfig::from_toml_str("slab_capacity = 512\nmax_slabs = 16\n")?;
        assert_eq!(config, PoolConfig::new(512, 16));

        // Missing keys fall back to defaults
        let config = PoolConfig::from_toml_str("max_slabs = 4")?;
        assert_eq!(config.slab_capacity, DEFAULT_SLAB_CAPACITY);
        assert_eq!(config.max_slabs, 4);
        Ok(())
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        assert!(matches!(
            PoolConfig::from_toml_str("slab_capacity = 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            PoolConfig::from_toml_str("slab_capacity = \"big\""),
            Err(Error::Config(_))
        ));
    }
}
