//! Config Handler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::module::define;

/// Provides TOML config file handling.
pub mod toml {

    use super::{default_config, ConfigError};
    use crate::module::define;
    use std::fs;
    use std::path::Path;

    /// Loads a configuration file from the given directory.
    /// If not found, generates a default config file.
    /// Runs before the logger starts, so it logs nothing.
    ///
    /// # Arguments
    ///
    /// * `dir` - The directory where the configuration file is located or should be created.
    ///
    pub fn load(dir: &str) -> Result<super::Config, ConfigError> {
        let path = Path::new(dir).join(define::path::CONF_FILE);

        if !path.is_file() {
            // Keep the comments of the default file, they are the only documentation users see.
            fs::write(&path, default_config())?;
        }

        let conf_str = fs::read_to_string(&path)?;
        let conf: super::Config = toml::from_str(&conf_str)?;
        conf.api.platform()?;
        Ok(conf)
    }

    /// Saves a configuration file to the given directory.
    ///
    /// # Arguments
    ///
    /// * `dir` - The directory where the configuration file should be saved.
    /// * `conf` - The configuration data to be saved.
    ///
    pub fn save(dir: &str, conf: &super::Config) -> Result<(), ConfigError> {
        let toml_str = toml::to_string(conf)?;
        let path = crate::module::util::path::join(&[dir, define::path::CONF_FILE]);
        fs::write(path, toml_str)?;
        Ok(())
    }
}

/// Errors raised while reading or writing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] ::toml::de::Error),
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] ::toml::ser::Error),
    #[error("unknown platform '{0}' (expected auto, web or device)")]
    UnknownPlatform(String),
    #[error("unknown location source '{0}' (expected gpsd or fixed)")]
    UnknownLocationSource(String),
}

/// Represents the configuration data structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub system: System,
    pub api: Api,
    pub camera: Camera,
    pub library: Library,
    pub location: Location,
}

/// Represents system-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct System {
    pub log_level: String,
}

/// Represents inference-service configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Api {
    pub platform: String,
    pub web_base_url: String,
    pub device_base_url: String,
    pub timeout_secs: u64,
}

/// Platform the client runs as. Decides which base url is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Web,
    Device,
}

impl Platform {
    /// Platform of the current build target.
    pub fn current() -> Platform {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            Platform::Device
        } else {
            Platform::Web
        }
    }
}

impl Api {
    /// Resolve the configured platform. `auto` follows the build target.
    pub fn platform(&self) -> Result<Platform, ConfigError> {
        match self.platform.to_lowercase().as_str() {
            "auto" => Ok(Platform::current()),
            "web" => Ok(Platform::Web),
            "device" => Ok(Platform::Device),
            other => Err(ConfigError::UnknownPlatform(other.to_string())),
        }
    }

    /// Base url of the inference service for the resolved platform.
    pub fn base_url(&self) -> Result<&str, ConfigError> {
        let url = match self.platform()? {
            Platform::Web => self.web_base_url.as_str(),
            Platform::Device => self.device_base_url.as_str(),
        };
        Ok(url.trim_end_matches('/'))
    }
}

/// Represents camera-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Camera {
    pub device: String,
    pub grab_times: u8,
    pub width: u16,
    pub height: u16,
}

/// Represents photo library configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Library {
    /// Empty means the `img` directory inside the data directory.
    pub dir: String,
}

/// Represents location-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Location {
    pub enabled: bool,
    pub source: String,
    pub gpsd_addr: String,
    pub timeout_secs: u64,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters. Zero or less means unknown.
    pub accuracy: f64,
    pub geocode: bool,
    pub geocoder_url: String,
    pub user_agent: String,
}

/// Default configuration data in TOML format.
///
/// Addresses and timeouts come from `define`, the user agent from the package version.
fn default_config() -> String {
    format!(
        r#"[system]
  log_level = 'INFO' # Log level ('ERROR', 'WARN', 'INFO', 'DEBUG', 'TRACE')

[api]
  platform = 'auto' # 'web', 'device' or 'auto' (device on Android/iOS, web elsewhere)
  web_base_url = '{web_base_url}' # Inference service seen from the same host
  device_base_url = 'http://192.168.1.100:5000' # Inference service seen from a phone on the LAN
  timeout_secs = {api_timeout} # Upload timeout, no retry

[camera]
  device = '/dev/video0' # V4L2 device node
  grab_times = 2 # Number of grabs, the last one is kept
  width = 1280 # Image width
  height = 720 # Image height

[library]
  dir = '' # Photo library directory (empty for <data dir>/img)

[location]
  enabled = true # Allow the client to read the device location
  source = 'gpsd' # 'gpsd' or 'fixed'
  gpsd_addr = '{gpsd_addr}' # gpsd daemon address
  timeout_secs = {fix_timeout} # Seconds to wait for a fix
  latitude = 0.0 # Fixed source latitude
  longitude = 0.0 # Fixed source longitude
  accuracy = 0.0 # Fixed source accuracy in meters (0 for unknown)
  geocode = true # Reverse geocode the position into an address
  geocoder_url = '{geocoder_url}' # Nominatim instance
  user_agent = '{name}/{version}' # Sent to the geocoder
"#,
        web_base_url = define::api::WEB_BASE_URL,
        api_timeout = define::api::TIMEOUT_SECS,
        gpsd_addr = define::location::GPSD_ADDR,
        fix_timeout = define::location::FIX_TIMEOUT_SECS,
        geocoder_url = define::location::NOMINATIM_URL,
        name = define::system::NAME,
        version = env!("CARGO_PKG_VERSION"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn default() -> Config {
        ::toml::from_str(&default_config()).unwrap()
    }

    #[test]
    fn run_load() {
        let dir = tempfile::tempdir().unwrap();
        let dir = dir.path().to_str().unwrap();
        let res = toml::load(dir).unwrap();
        assert_eq!(res.system.log_level, "INFO");
        assert_eq!(res.api.timeout_secs, 30);
        assert_eq!(res.location.source, "gpsd");
        // The default file is written with its comments.
        let written = fs::read_to_string(format!("{}/conf.toml", dir)).unwrap();
        assert!(written.contains("# Upload timeout"));
    }

    #[test]
    fn default_file_uses_defined_values() {
        let parsed = default();
        assert_eq!(parsed.api.web_base_url, define::api::WEB_BASE_URL);
        assert_eq!(parsed.api.timeout_secs, define::api::TIMEOUT_SECS);
        assert_eq!(parsed.location.gpsd_addr, define::location::GPSD_ADDR);
        assert_eq!(parsed.location.timeout_secs, define::location::FIX_TIMEOUT_SECS);
        assert_eq!(parsed.location.geocoder_url, define::location::NOMINATIM_URL);
        assert_eq!(parsed.camera.device, "/dev/video0");
        assert!(parsed.library.dir.is_empty());
    }

    #[test]
    fn user_agent_follows_package_version() {
        let dir = tempfile::tempdir().unwrap();
        let res = toml::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(
            res.location.user_agent,
            format!("cropscan/{}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn run_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let dir = dir.path().to_str().unwrap();
        let mut conf = default();
        conf.api.platform = "device".to_string();
        conf.location.source = "fixed".to_string();
        toml::save(dir, &conf).unwrap();

        let res = toml::load(dir).unwrap();
        assert_eq!(res.api.platform().unwrap(), Platform::Device);
        assert_eq!(res.location.source, "fixed");
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("conf.toml"), "[system\nlog_level = 1").unwrap();
        let res = toml::load(dir.path().to_str().unwrap());
        assert!(matches!(res, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn base_url_follows_platform() {
        let mut api = default().api;
        api.platform = "web".to_string();
        assert_eq!(api.base_url().unwrap(), "http://127.0.0.1:5000");

        api.platform = "Device".to_string();
        api.device_base_url = "http://10.0.0.2:5000/".to_string();
        assert_eq!(api.base_url().unwrap(), "http://10.0.0.2:5000");

        api.platform = "tablet".to_string();
        assert!(matches!(
            api.base_url(),
            Err(ConfigError::UnknownPlatform(p)) if p == "tablet"
        ));
    }

    #[test]
    fn auto_platform_is_web_on_desktop() {
        let api = default().api;
        if cfg!(any(target_os = "android", target_os = "ios")) {
            assert_eq!(api.platform().unwrap(), Platform::Device);
        } else {
            assert_eq!(api.platform().unwrap(), Platform::Web);
        }
    }
}
