//! Module for Constants and Paths Definitions
//!
//! This module defines various constants and paths used throughout the application.

/// System Constants
pub mod system {
    /// Name of the system
    pub const NAME: &str = "cropscan";
}

/// File Paths
pub mod path {

    // Image Directory (doubles as the photo library)
    pub const IMG_DIR: &str = "img";

    // Log Directory
    pub const LOG_DIR: &str = "log";

    // Configuration File
    pub const CONF_FILE: &str = "conf.toml";

    // Prefix of images taken with the camera
    pub const CAPTURE_PREFIX: &str = "scan";
}

/// Inference Service
pub mod api {
    // Upload endpoint, relative to the base url
    pub const UPLOAD_PATH: &str = "/upload_plant";

    // Multipart field carrying the photograph
    pub const IMAGE_FIELD: &str = "image";

    // Multipart field carrying the location text
    pub const LOCATION_FIELD: &str = "location";

    // Base url used when running as a web client
    pub const WEB_BASE_URL: &str = "http://127.0.0.1:5000";

    // Request ceiling in seconds (mobile networks are slow)
    pub const TIMEOUT_SECS: u64 = 30;
}

/// Location Services
pub mod location {
    // Default gpsd address
    pub const GPSD_ADDR: &str = "127.0.0.1:2947";

    // Public Nominatim instance
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

    // Seconds to wait for a fix
    pub const FIX_TIMEOUT_SECS: u64 = 15;
}

/// Image file extensions accepted from the library.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "heic", "gif", "bmp"];
