//! This module contains all the sub-modules of the project.

pub mod define; // Definition module: Contains definitions and constants used throughout the project.
pub mod device; // Device module: Permissions, camera and photo library.
pub mod flow; // Flow module: Scan screen orchestration and navigation.
pub mod location; // Location module: Position fixes and reverse geocoding.
pub mod session; // Session module: State shared between screens.
pub mod submit; // Submit module: Upload to the inference service.
pub mod util; // Utility module: Provides various utility functions and helpers.

#[cfg(test)]
pub mod testing;
