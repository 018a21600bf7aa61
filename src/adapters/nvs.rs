//! NVS adapter — persists [`NodeConfig`] as a JSON string.
//!
//! Config validation runs before every write and after every read, so an
//! out-of-range value never reaches the control loop from storage.

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::NodeConfig;

const CONFIG_NAMESPACE: &str = "nest";
const CONFIG_KEY: &str = "nodecfg";
const MAX_BLOB_SIZE: usize = 1024;

pub struct NvsConfigStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsConfigStore {
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, ConfigError> {
        let nvs = EspNvs::new(partition, CONFIG_NAMESPACE, true).map_err(|e| {
            warn!("NVS open failed: {}", e);
            ConfigError::IoError
        })?;
        Ok(Self { nvs })
    }
}

impl ConfigPort for NvsConfigStore {
    fn load(&self) -> Result<NodeConfig, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let raw = self
            .nvs
            .get_str(CONFIG_KEY, &mut buf)
            .map_err(|_| ConfigError::IoError)?
            .ok_or(ConfigError::NotFound)?;
        let cfg: NodeConfig = serde_json::from_str(raw).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("NvsConfigStore: loaded {} bytes", raw.len());
        Ok(cfg)
    }

    fn save(&mut self, config: &NodeConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_string(config).map_err(|_| ConfigError::Corrupted)?;
        if json.len() >= MAX_BLOB_SIZE {
            return Err(ConfigError::ValidationFailed("serialized config too large"));
        }
        self.nvs
            .set_str(CONFIG_KEY, &json)
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsConfigStore: saved {} bytes", json.len());
        Ok(())
    }
}
