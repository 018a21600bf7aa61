//! WiFi station-mode adapter.
//!
//! Association happens once at boot with a bounded number of blocking
//! attempts.  Afterwards [`WifiLink`] only reports liveness; when the link
//! is found down it kicks off a non-blocking reconnect, spaced by an
//! exponential backoff counted in liveness checks.

use anyhow::{Context, anyhow};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use crate::app::ports::LinkPort;
use crate::config::NetworkConfig;

const BOOT_CONNECT_ATTEMPTS: u32 = 5;
const MAX_BACKOFF_CHECKS: u32 = 32;

fn validate_ssid(ssid: &str) -> anyhow::Result<()> {
    if ssid.is_empty() || ssid.len() > 32 || !ssid.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
        return Err(anyhow!("SSID invalid (must be 1-32 printable ASCII bytes)"));
    }
    Ok(())
}

pub struct WifiLink {
    wifi: EspWifi<'static>,
    backoff: u32,
    skip: u32,
}

impl WifiLink {
    /// Configure the station and associate.  Returns even if association
    /// failed; the link then reports down and keeps retrying.
    pub fn start(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        net: &NetworkConfig,
    ) -> anyhow::Result<Self> {
        validate_ssid(net.wifi_ssid)?;
        let mut esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
        {
            let mut wifi = BlockingWifi::wrap(&mut esp_wifi, sysloop)?;
            let auth_method = if net.wifi_password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            wifi.set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: net
                    .wifi_ssid
                    .try_into()
                    .map_err(|_| anyhow!("wifi ssid too long"))?,
                password: net
                    .wifi_password
                    .try_into()
                    .map_err(|_| anyhow!("wifi password too long"))?,
                auth_method,
                ..Default::default()
            }))?;
            wifi.start().context("wifi start")?;

            for attempt in 1..=BOOT_CONNECT_ATTEMPTS {
                match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
                    Ok(()) => {
                        info!("WiFi connected to '{}' (attempt {})", net.wifi_ssid, attempt);
                        break;
                    }
                    Err(e) => {
                        warn!("WiFi attempt {}/{} failed: {}", attempt, BOOT_CONNECT_ATTEMPTS, e);
                        let _ = wifi.disconnect();
                    }
                }
            }
        }
        Ok(Self {
            wifi: esp_wifi,
            backoff: 1,
            skip: 0,
        })
    }
}

impl LinkPort for WifiLink {
    fn is_up(&mut self) -> bool {
        if self.wifi.is_connected().unwrap_or(false) {
            self.backoff = 1;
            self.skip = 0;
            return true;
        }
        if self.skip > 0 {
            self.skip -= 1;
            return false;
        }
        warn!("WiFi down, reconnecting");
        if let Err(e) = self.wifi.connect() {
            warn!("WiFi reconnect request failed: {}", e);
        }
        self.skip = self.backoff;
        self.backoff = (self.backoff * 2).min(MAX_BACKOFF_CHECKS);
        false
    }
}
