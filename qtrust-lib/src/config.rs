//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! [classification]
//! natural_person = [0, 5, 8, 11]
//! legal_person = [1, 12]
//! tsa = [3]
//!
//! [cache]
//! idle_time_before_stop_secs = 30
//!
//! [revocation]
//! ocsp_time_interval_allowed_secs = 60
//! check_crl_issuer = true
//! ```

use crate::QtrustError;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

const DEFAULT_IDLE_TIME_BEFORE_STOP_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub classification: ClassificationRanges,
    pub cache: CacheConfig,
    pub revocation: RevocationConfig,
}

/// Integer values of the legacy `clasificacion` mapping, grouped by the
/// `certClassification` they translate to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassificationRanges {
    pub natural_person: BTreeSet<i64>,
    pub legal_person: BTreeSet<i64>,
    pub esig: BTreeSet<i64>,
    pub eseal: BTreeSet<i64>,
    pub wsa: BTreeSet<i64>,
    pub tsa: BTreeSet<i64>,
}

impl Default for ClassificationRanges {
    fn default() -> Self {
        Self {
            natural_person: [0, 5, 8, 11].into_iter().collect(),
            legal_person: [1, 12].into_iter().collect(),
            esig: BTreeSet::new(),
            eseal: BTreeSet::new(),
            wsa: BTreeSet::new(),
            tsa: [3].into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds the retired principal cache is kept alive after a swap.
    pub idle_time_before_stop_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            idle_time_before_stop_secs: DEFAULT_IDLE_TIME_BEFORE_STOP_SECS,
        }
    }
}

impl CacheConfig {
    /// Drain delay before disposing a retired cache. Zero falls back to the default.
    pub fn drain_delay(&self) -> Duration {
        match self.idle_time_before_stop_secs {
            0 => Duration::from_secs(DEFAULT_IDLE_TIME_BEFORE_STOP_SECS),
            secs => Duration::from_secs(secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RevocationConfig {
    /// Clock skew tolerated around OCSP thisUpdate/nextUpdate.
    pub ocsp_time_interval_allowed_secs: u64,
    /// Require CRLs to be signed by a digital identity of the TSL.
    pub check_crl_issuer: bool,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            ocsp_time_interval_allowed_secs: 60,
            check_crl_issuer: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, QtrustError> {
        toml::from_str(text).map_err(|e| QtrustError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, QtrustError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
