//! `geocode`: turn a street address into coordinates.
//!
//! The lookup sits behind [`Geocoder`]. [`PlaceholderGeocoder`] returns
//! deterministic coordinates derived from the address so the dialogue can
//! be exercised end-to-end without a geocoding service; swap in a real
//! implementation with [`GeocodeAction::new`].

use async_trait::async_trait;
use ridedesk_core::action::{Action, parse_arguments};
use ridedesk_core::error::ActionError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::BackendError;
use crate::location::Coordinates;

pub const NAME: &str = "geocode";

/// Address → coordinates backend.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn locate(&self, street_address: &str) -> Result<Coordinates, BackendError>;
}

/// Deterministic stand-in: the same address always maps to the same point.
pub struct PlaceholderGeocoder;

#[async_trait]
impl Geocoder for PlaceholderGeocoder {
    async fn locate(&self, street_address: &str) -> Result<Coordinates, BackendError> {
        let normalized = street_address.trim().to_lowercase();
        let hash: u32 = normalized
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));

        // Spread over the populated latitudes, 4 decimal places.
        let latitude = -55.0 + (hash % 1_250_000) as f64 / 10_000.0;
        let longitude = -180.0 + ((hash / 7) % 3_600_000) as f64 / 10_000.0;
        Coordinates::new(latitude, longitude).map_err(BackendError::Unavailable)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct GeocodeArgs {
    street_address: String,
}

pub struct GeocodeAction {
    geocoder: Arc<dyn Geocoder>,
}

impl GeocodeAction {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }
}

impl Default for GeocodeAction {
    fn default() -> Self {
        Self::new(Arc::new(PlaceholderGeocoder))
    }
}

#[async_trait]
impl Action for GeocodeAction {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get latitude and longitude coordinates for a location or address"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "streetAddress": {
                    "type": "string",
                    "description": "A street address to convert into latitude and longitude coordinates"
                }
            },
            "required": ["streetAddress"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ActionError> {
        let args: GeocodeArgs = parse_arguments(NAME, arguments)?;
        if args.street_address.trim().is_empty() {
            return Err(ActionError::malformed(NAME, "streetAddress is blank"));
        }

        let point = self
            .geocoder
            .locate(&args.street_address)
            .await
            .map_err(|e| ActionError::failed(NAME, e.to_string()))?;
        debug!(address = %args.street_address, %point, "Geocoded address");

        Ok(serde_json::json!({
            "latitude": format!("{:.4}", point.latitude),
            "longitude": format!("{:.4}", point.longitude),
        })
        .to_string())
    }
}
