//! Location Resolver.
//!
//! Turns a single position fix into the text sent along with a photograph:
//! a postal-style address followed by the raw coordinate, or the coordinate
//! alone when nothing better is known.

pub mod gpsd;
pub mod nominatim;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::module::device::permission::{Permission, PermissionProvider};
use crate::module::util::conf::ConfigError;
use crate::module::util::init::AppProperty;

/// A single position reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: Option<f64>,
}

/// Reverse geocoded address. Empty fields are skipped when formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub street_number: String,
    pub street: String,
    pub subregion: String,
    pub district: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
}

/// Location as shown to the user and sent to the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub display: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
}

impl ResolvedLocation {
    /// A location typed in by the user, without coordinates.
    pub fn manual(display: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            latitude: None,
            longitude: None,
            accuracy: None,
        }
    }
}

/// Location failures. Both are retried by the user, never automatically.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Reverse geocoding failure. Never surfaces, the coordinate is used instead.
#[derive(Debug, Error)]
#[error("reverse geocoding failed: {0}")]
pub struct GeocodeError(pub String);

/// Source of position fixes.
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn current_position(&self) -> Result<Position, LocationError>;
}

/// Coordinate to address lookup. `Ok(None)` means nothing was found.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, position: &Position) -> Result<Option<Address>, GeocodeError>;
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Position);

#[async_trait]
impl PositionProvider for FixedPosition {
    async fn current_position(&self) -> Result<Position, LocationError> {
        Ok(self.0)
    }
}

pub struct LocationResolver {
    permissions: Arc<dyn PermissionProvider>,
    position: Box<dyn PositionProvider>,
    geocoder: Option<Box<dyn Geocoder>>,
}

impl LocationResolver {
    pub fn new(
        permissions: Arc<dyn PermissionProvider>,
        position: Box<dyn PositionProvider>,
        geocoder: Option<Box<dyn Geocoder>>,
    ) -> Self {
        Self {
            permissions,
            position,
            geocoder,
        }
    }

    /// Build the resolver described by the `[location]` config section.
    pub fn from_property(
        property: &AppProperty,
        permissions: Arc<dyn PermissionProvider>,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let conf = &property.conf.location;
        let position: Box<dyn PositionProvider> = match conf.source.to_lowercase().as_str() {
            "gpsd" => Box::new(gpsd::Gpsd::new(
                conf.gpsd_addr.clone(),
                Duration::from_secs(conf.timeout_secs),
            )),
            "fixed" => Box::new(FixedPosition(Position {
                latitude: conf.latitude,
                longitude: conf.longitude,
                accuracy: (conf.accuracy > 0.0).then_some(conf.accuracy),
            })),
            other => return Err(ConfigError::UnknownLocationSource(other.to_string())),
        };
        let geocoder: Option<Box<dyn Geocoder>> = match conf.geocode {
            true => Some(Box::new(nominatim::Nominatim::new(
                client,
                conf.geocoder_url.clone(),
                conf.user_agent.clone(),
            ))),
            false => None,
        };
        Ok(Self::new(permissions, position, geocoder))
    }

    /// Ask for permission, take one fix and describe it.
    pub async fn resolve_location(&self) -> Result<ResolvedLocation, LocationError> {
        if !self
            .permissions
            .request(Permission::Location)
            .await
            .is_granted()
        {
            return Err(LocationError::PermissionDenied);
        }

        let position = self.position.current_position().await?;
        log::debug!("Position fix: {:?}", position);

        let address = match &self.geocoder {
            Some(geocoder) => match geocoder.reverse(&position).await {
                Ok(address) => address,
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            },
            None => None,
        };

        let display = format_location(address.as_ref(), &position);
        log::info!("Resolved location: {}", display);
        Ok(ResolvedLocation {
            display,
            latitude: Some(position.latitude),
            longitude: Some(position.longitude),
            accuracy: position.accuracy,
        })
    }
}

/// `lat, lon` with six decimals, followed by ` ±Nm` when the accuracy is known.
pub fn coordinate_text(position: &Position) -> String {
    let mut text = format!("{:.6}, {:.6}", position.latitude, position.longitude);
    if let Some(accuracy) = position.accuracy {
        text.push_str(&format!(" ±{:.0}m", accuracy));
    }
    text
}

/// Street, subregion, district or city, region and postal code, in that order.
pub fn address_text(address: &Address) -> String {
    let street = match (address.street_number.trim(), address.street.trim()) {
        ("", name) => name.to_string(),
        (_, "") => String::new(),
        (number, name) => format!("{} {}", number, name),
    };
    let locality = match address.district.trim() {
        "" => address.city.trim(),
        district => district,
    };
    [
        street.as_str(),
        address.subregion.trim(),
        locality,
        address.region.trim(),
        address.postal_code.trim(),
    ]
    .iter()
    .filter(|segment| !segment.is_empty())
    .copied()
    .collect::<Vec<&str>>()
    .join(", ")
}

/// Display text for a position and its address, if one was found.
pub fn format_location(address: Option<&Address>, position: &Position) -> String {
    let coordinate = coordinate_text(position);
    match address.map(address_text) {
        Some(text) if !text.is_empty() => format!("{} ({})", text, coordinate),
        _ => coordinate,
    }
}
