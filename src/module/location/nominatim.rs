//! Nominatim reverse geocoder.

use async_trait::async_trait;
use serde::Deserialize;

use super::{Address, GeocodeError, Geocoder, Position};

/// Reverse geocoder backed by a Nominatim instance.
#[derive(Debug, Clone)]
pub struct Nominatim {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<NominatimAddress>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NominatimAddress {
    house_number: Option<String>,
    road: Option<String>,
    county: Option<String>,
    state_district: Option<String>,
    suburb: Option<String>,
    city_district: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
}

impl NominatimAddress {
    fn into_address(self) -> Address {
        fn first(candidates: [Option<String>; 3]) -> String {
            candidates.into_iter().flatten().next().unwrap_or_default()
        }
        Address {
            street_number: self.house_number.unwrap_or_default(),
            street: self.road.unwrap_or_default(),
            subregion: first([self.county, self.state_district, None]),
            district: first([self.suburb, self.city_district, None]),
            city: first([self.city, self.town, self.village]),
            region: self.state.unwrap_or_default(),
            postal_code: self.postcode.unwrap_or_default(),
        }
    }
}

impl Nominatim {
    pub fn new(client: reqwest::Client, base_url: String, user_agent: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent,
        }
    }
}

#[async_trait]
impl Geocoder for Nominatim {
    async fn reverse(&self, position: &Position) -> Result<Option<Address>, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);
        let query = [
            ("format", "jsonv2".to_string()),
            ("lat", format!("{:.6}", position.latitude)),
            ("lon", format!("{:.6}", position.longitude)),
            ("addressdetails", "1".to_string()),
        ];
        let res = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&query)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| GeocodeError(e.to_string()))?;

        let body: ReverseResponse = res
            .json()
            .await
            .map_err(|e| GeocodeError(e.to_string()))?;
        if let Some(error) = body.error {
            log::debug!("Nominatim has no address: {}", error);
            return Ok(None);
        }
        Ok(body.address.map(NominatimAddress::into_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::testing::serve_once;

    fn position() -> Position {
        Position {
            latitude: 25.321,
            longitude: 82.987,
            accuracy: None,
        }
    }

    #[test]
    fn maps_nominatim_fields() {
        let raw: NominatimAddress = serde_json::from_str(
            r#"{"house_number":"7","road":"MG Road","state_district":"Varanasi",
                "town":"Lanka","state":"Uttar Pradesh","postcode":"221005","country":"India"}"#,
        )
        .unwrap();
        assert_eq!(
            raw.into_address(),
            Address {
                street_number: "7".to_string(),
                street: "MG Road".to_string(),
                subregion: "Varanasi".to_string(),
                district: String::new(),
                city: "Lanka".to_string(),
                region: "Uttar Pradesh".to_string(),
                postal_code: "221005".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn reverse_queries_the_service() {
        let (url, server) = serve_once(
            200,
            r#"{"display_name":"x","address":{"road":"MG Road","county":"Varanasi","state":"UP","postcode":"221005"}}"#,
        )
        .await;
        let geocoder = Nominatim::new(reqwest::Client::new(), url, "cropscan-test".to_string());

        let address = geocoder.reverse(&position()).await.unwrap().unwrap();
        assert_eq!(
            crate::module::location::address_text(&address),
            "MG Road, Varanasi, UP, 221005"
        );

        let request = String::from_utf8_lossy(&server.await.unwrap()).into_owned();
        assert!(request.starts_with("GET /reverse?format=jsonv2&lat=25.321000&lon=82.987000"));
        assert!(request.to_lowercase().contains("user-agent: cropscan-test"));
    }

    #[tokio::test]
    async fn unable_to_geocode_is_no_address() {
        let (url, _server) = serve_once(200, r#"{"error":"Unable to geocode"}"#).await;
        let geocoder = Nominatim::new(reqwest::Client::new(), url, "t".to_string());
        assert_eq!(geocoder.reverse(&position()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_error_is_an_error() {
        let (url, _server) = serve_once(503, "{}").await;
        let geocoder = Nominatim::new(reqwest::Client::new(), url, "t".to_string());
        assert!(geocoder.reverse(&position()).await.is_err());
    }
}
