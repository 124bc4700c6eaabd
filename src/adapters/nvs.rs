//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] over a fixed 512-byte configuration image:
//!
//! ```text
//!  0      1        2..4          4..4+len
//! ┌──────┬────────┬─────────────┬──────────────────────┐
//! │ 0xAA │ layout │ len (LE u16)│ postcard(DeviceConfig)│  … 0xFF padding
//! └──────┴────────┴─────────────┴──────────────────────┘
//! ```
//!
//! - **`target_os = "espidf"`**: the image is one blob in the `doorbell`
//!   NVS namespace. Commits are atomic per `nvs_commit()`.
//! - **`not(target_os = "espidf")`**: the image lives in RAM, for host
//!   tests and simulation.
//!
//! Every record is range-checked before it is written.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::DeviceConfig;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Size of the reserved configuration region.
pub const IMAGE_SIZE: usize = 512;

/// Byte 0 once a record has been written.
pub const VALIDITY_MARKER: u8 = 0xAA;

/// Bumped whenever the record layout changes; older images read as
/// corrupted and are replaced by defaults.
pub const LAYOUT_VERSION: u8 = 1;

const HEADER_LEN: usize = 4;

/// Erased flash reads as all ones.
const ERASED: u8 = 0xFF;

pub type ConfigImage = [u8; IMAGE_SIZE];

// ── Image codec ───────────────────────────────────────────────

/// Serialize `config` into a full image.
pub fn encode_image(config: &DeviceConfig) -> Result<ConfigImage, ConfigError> {
    let mut image = [ERASED; IMAGE_SIZE];
    let used = postcard::to_slice(config, &mut image[HEADER_LEN..])
        .map_err(|_| ConfigError::StorageFull)?
        .len();
    let len = u16::try_from(used).map_err(|_| ConfigError::StorageFull)?;
    image[0] = VALIDITY_MARKER;
    image[1] = LAYOUT_VERSION;
    image[2..HEADER_LEN].copy_from_slice(&len.to_le_bytes());
    Ok(image)
}

/// Parse an image written by [`encode_image`].
pub fn decode_image(image: &[u8]) -> Result<DeviceConfig, ConfigError> {
    if image.len() < HEADER_LEN || image[0] != VALIDITY_MARKER {
        return Err(ConfigError::NotFound);
    }
    if image[1] != LAYOUT_VERSION {
        warn!("NvsAdapter: layout {} != {}", image[1], LAYOUT_VERSION);
        return Err(ConfigError::Corrupted);
    }
    let len = usize::from(u16::from_le_bytes([image[2], image[3]]));
    let body = image
        .get(HEADER_LEN..HEADER_LEN + len)
        .ok_or(ConfigError::Corrupted)?;
    postcard::from_bytes(body).map_err(|_| ConfigError::Corrupted)
}

// ── Adapter ───────────────────────────────────────────────────

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    image: ConfigImage,
}

#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"doorbell\0";

#[cfg(target_os = "espidf")]
const IMAGE_KEY: &[u8] = b"cfgimage\0";

impl NvsAdapter {
    /// Create the adapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS use.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
            Ok(Self {})
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsAdapter: simulation backend");
            Ok(Self {
                image: [ERASED; IMAGE_SIZE],
            })
        }
    }

    /// Simulation backend pre-loaded with `image` (a previous "boot").
    #[cfg(not(target_os = "espidf"))]
    pub fn with_image(image: ConfigImage) -> Self {
        Self { image }
    }

    /// Current raw image.
    #[cfg(not(target_os = "espidf"))]
    pub fn image(&self) -> &ConfigImage {
        &self.image
    }

    /// Open the namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn load_image(&self) -> Result<ConfigImage, ConfigError> {
        let result = Self::with_nvs_handle(false, |handle| {
            let mut image = [ERASED; IMAGE_SIZE];
            let mut size = IMAGE_SIZE;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    IMAGE_KEY.as_ptr() as *const _,
                    image.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(image)
        });
        match result {
            Ok(image) => Ok(image),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(ConfigError::NotFound),
            Err(e) => {
                warn!("NvsAdapter: NVS read error {e}");
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn load_image(&self) -> Result<ConfigImage, ConfigError> {
        Ok(self.image)
    }

    #[cfg(target_os = "espidf")]
    fn store_image(&mut self, image: Option<&ConfigImage>) -> Result<(), ConfigError> {
        let result = Self::with_nvs_handle(true, |handle| {
            let ret = match image {
                Some(image) => unsafe {
                    nvs_set_blob(
                        handle,
                        IMAGE_KEY.as_ptr() as *const _,
                        image.as_ptr() as *const _,
                        image.len(),
                    )
                },
                None => unsafe { nvs_erase_all(handle) },
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|e| {
            warn!("NvsAdapter: NVS write error {e}");
            ConfigError::IoError
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn store_image(&mut self, image: Option<&ConfigImage>) -> Result<(), ConfigError> {
        self.image = image.copied().unwrap_or([ERASED; IMAGE_SIZE]);
        Ok(())
    }
}

impl ConfigPort for NvsAdapter {
    fn read_validity_marker(&self) -> bool {
        self.load_image()
            .map(|image| image[0] == VALIDITY_MARKER)
            .unwrap_or(false)
    }

    fn read_config(&self) -> Result<DeviceConfig, ConfigError> {
        let image = self.load_image()?;
        let config = decode_image(&image)?;
        info!("NvsAdapter: loaded config");
        Ok(config)
    }

    fn write_config(&mut self, config: &DeviceConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let image = encode_image(config)?;
        self.store_image(Some(&image))?;
        info!("NvsAdapter: config saved");
        Ok(())
    }

    fn erase_all(&mut self) -> Result<(), ConfigError> {
        self.store_image(None)?;
        warn!("NvsAdapter: configuration region erased");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_or_init, InputMode};

    fn filled_config() -> DeviceConfig {
        let mut cfg = DeviceConfig::default();
        cfg.wifi.ssid = "s".repeat(32).as_str().try_into().unwrap();
        cfg.wifi.password = "p".repeat(64).as_str().try_into().unwrap();
        cfg.backup_wifi.ssid = "t".repeat(32).as_str().try_into().unwrap();
        cfg.backup_wifi.password = "q".repeat(64).as_str().try_into().unwrap();
        cfg.broker.server = "m".repeat(64).as_str().try_into().unwrap();
        cfg.backup_broker.server = "n".repeat(64).as_str().try_into().unwrap();
        cfg.broker_user = "u".repeat(32).as_str().try_into().unwrap();
        cfg.broker_password = "x".repeat(64).as_str().try_into().unwrap();
        cfg.input_mode = InputMode::Analog;
        cfg
    }

    #[test]
    fn fresh_store_has_no_marker() {
        let nvs = NvsAdapter::new().unwrap();
        assert!(!nvs.read_validity_marker());
        assert_eq!(nvs.read_config(), Err(ConfigError::NotFound));
    }

    #[test]
    fn write_sets_marker_and_header() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write_config(&DeviceConfig::default()).unwrap();
        assert!(nvs.read_validity_marker());
        let image = nvs.image();
        assert_eq!(image[0], VALIDITY_MARKER);
        assert_eq!(image[1], LAYOUT_VERSION);
        assert_eq!(nvs.read_config().unwrap(), DeviceConfig::default());
    }

    #[test]
    fn largest_record_fits_the_region() {
        let cfg = filled_config();
        let image = encode_image(&cfg).unwrap();
        assert_eq!(decode_image(&image).unwrap(), cfg);
    }

    #[test]
    fn invalid_record_is_not_written() {
        let mut nvs = NvsAdapter::new().unwrap();
        let mut cfg = DeviceConfig::default();
        cfg.door.volume_percent = 101;
        assert!(matches!(
            nvs.write_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
        assert!(!nvs.read_validity_marker());
    }

    #[test]
    fn layout_mismatch_reads_as_corrupted() {
        let mut image = encode_image(&DeviceConfig::default()).unwrap();
        image[1] = LAYOUT_VERSION + 1;
        let nvs = NvsAdapter::with_image(image);
        assert!(nvs.read_validity_marker());
        assert_eq!(nvs.read_config(), Err(ConfigError::Corrupted));
    }

    #[test]
    fn truncated_length_reads_as_corrupted() {
        let mut image = encode_image(&DeviceConfig::default()).unwrap();
        image[2..4].copy_from_slice(&600u16.to_le_bytes());
        assert_eq!(decode_image(&image), Err(ConfigError::Corrupted));
    }

    #[test]
    fn erase_clears_marker() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write_config(&DeviceConfig::default()).unwrap();
        nvs.erase_all().unwrap();
        assert!(!nvs.read_validity_marker());
    }

    #[test]
    fn settings_survive_a_reboot() {
        let mut nvs = NvsAdapter::new().unwrap();
        let mut cfg = load_or_init(&mut nvs, false);
        cfg.door.track = 7;
        cfg.debug_enabled = true;
        nvs.write_config(&cfg).unwrap();

        let mut rebooted = NvsAdapter::with_image(*nvs.image());
        let loaded = load_or_init(&mut rebooted, false);
        assert_eq!(loaded.door.track, 7);
        assert!(loaded.debug_enabled);
    }

    #[test]
    fn factory_reset_restores_defaults() {
        let mut nvs = NvsAdapter::new().unwrap();
        let mut cfg = DeviceConfig::default();
        cfg.door.track = 7;
        nvs.write_config(&cfg).unwrap();

        let loaded = load_or_init(&mut nvs, true);
        assert_eq!(loaded, DeviceConfig::default());
        assert!(nvs.read_validity_marker());
    }
}
