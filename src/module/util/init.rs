//! This module is responsible for preparing the resources needed by the application, such as directories, configurations, logs, etc.
//!

use thiserror::Error;

pub mod resource {
    use super::{AppProperty, InitError};
    use crate::module::define;
    use crate::module::util::{conf, path};

    /// Initialize the application resources and return an AppProperty instance containing paths and configurations.
    ///
    pub fn init() -> Result<AppProperty, InitError> {
        let data_dir = path::dir::create_data_dir()?;
        init_in(&data_dir)
    }

    /// Same as `init`, rooted at an explicit data directory.
    pub fn init_in(data_dir: &str) -> Result<AppProperty, InitError> {
        let conf_file = path::join(&[data_dir, define::path::CONF_FILE]);
        let created_conf = !std::path::Path::new(&conf_file).is_file();
        let conf = conf::toml::load(data_dir)?;
        let paths = path::dir::create_app_sub_dir(data_dir, &conf.library.dir)?;
        Ok(AppProperty {
            path: paths,
            conf,
            created_conf,
        })
    }
}

/// Failure to prepare the application resources.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("can't prepare data directory: {0}")]
    Dir(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] crate::module::util::conf::ConfigError),
}

/// This struct represents the properties of the app, such as paths and configurations.
///
#[derive(Debug, Clone)]
pub struct AppProperty {
    pub path: crate::module::util::path::AppPath, // The paths of the app resources
    pub conf: crate::module::util::conf::Config,  // The configurations of the app
    pub created_conf: bool,                       // The default config was written by this run
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn init_creates_config_and_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let property = resource::init_in(tmp.path().to_str().unwrap()).unwrap();

        assert!(tmp.path().join("conf.toml").is_file());
        assert!(Path::new(&property.path.dir.img).is_dir());
        assert!(Path::new(&property.path.dir.log).is_dir());
        assert_eq!(property.conf.camera.device, "/dev/video0");
    }

    #[test]
    fn only_first_init_writes_config() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        assert!(resource::init_in(dir).unwrap().created_conf);
        assert!(!resource::init_in(dir).unwrap().created_conf);
    }
}
