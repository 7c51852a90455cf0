//! Where the image lives and how loudly the engine logs.
//!
//! Defaults can be overridden from the environment:
//!
//! | variable       | meaning                               | default    |
//! |----------------|---------------------------------------|------------|
//! | `FATVOL_IMAGE` | path of the backing image             | `fat.part` |
//! | `FATVOL_LOG`   | `off`, `error`, `warn`, `info`, `debug`, `trace` | `info` |

use std::path::PathBuf;
use std::str::FromStr;

use log::{LevelFilter, warn};

use crate::disk::ImageFile;
use crate::error::Result;
use crate::logger;
use crate::volume::Volume;

pub const DEFAULT_IMAGE: &str = "fat.part";
pub const IMAGE_VAR: &str = "FATVOL_IMAGE";
pub const LOG_VAR: &str = "FATVOL_LOG";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeConfig {
    pub image_path: PathBuf,
    pub log_level:  LevelFilter,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self { image_path: PathBuf::from(DEFAULT_IMAGE), log_level: LevelFilter::Info }
    }
}

impl VolumeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any variable source. Unset or empty variables keep
    /// their defaults; an unparsable log level is reported and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup(IMAGE_VAR).filter(|p| !p.is_empty()) {
            config.image_path = PathBuf::from(path);
        }
        if let Some(level) = lookup(LOG_VAR).filter(|l| !l.is_empty()) {
            match LevelFilter::from_str(&level) {
                Ok(level) => config.log_level = level,
                Err(_) => warn!("ignoring {LOG_VAR}={level}"),
            }
        }
        config
    }

    pub fn image(&self) -> ImageFile {
        ImageFile::new(&self.image_path)
    }

    /// Attach to the configured image, which must already be formatted.
    pub fn open(&self) -> Result<Volume<ImageFile>> {
        Volume::open(self.image())
    }

    /// Format the configured image, creating it if needed.
    pub fn create(&self) -> Result<Volume<ImageFile>> {
        Volume::create(self.image())
    }

    pub fn init_logging(&self) -> core::result::Result<(), log::SetLoggerError> {
        logger::init(self.log_level)
    }
}
