//! `create_new_reservation`: book a trip once time and both endpoints are known.
//!
//! Booking goes through [`ReservationDesk`]. The default
//! [`LoggingReservationDesk`] records the booking in the log and issues a
//! confirmation number; it does not dispatch anything.

use async_trait::async_trait;
use ridedesk_core::action::{Action, parse_arguments};
use ridedesk_core::error::ActionError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::BackendError;
use crate::location::{Coordinates, PickupTime};

pub const NAME: &str = "create_new_reservation";

/// A fully specified trip request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Reservation {
    #[serde(alias = "pickupDate")]
    pub pickup_date_time: PickupTime,
    pub pickup_location: Coordinates,
    pub dropoff_location: Coordinates,
}

/// What the desk hands back on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub number: String,
}

/// Reservation backend.
#[async_trait]
pub trait ReservationDesk: Send + Sync {
    async fn book(&self, reservation: &Reservation) -> Result<Confirmation, BackendError>;
}

/// Logs the booking and returns a fresh confirmation number.
pub struct LoggingReservationDesk;

#[async_trait]
impl ReservationDesk for LoggingReservationDesk {
    async fn book(&self, reservation: &Reservation) -> Result<Confirmation, BackendError> {
        let number = format!(
            "RD-{}",
            &uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
        );
        info!(
            confirmation = %number,
            pickup_time = %reservation.pickup_date_time,
            pickup = %reservation.pickup_location,
            dropoff = %reservation.dropoff_location,
            "Reservation created"
        );
        Ok(Confirmation { number })
    }
}

pub struct ReservationAction {
    desk: Arc<dyn ReservationDesk>,
}

impl ReservationAction {
    pub fn new(desk: Arc<dyn ReservationDesk>) -> Self {
        Self { desk }
    }
}

impl Default for ReservationAction {
    fn default() -> Self {
        Self::new(Arc::new(LoggingReservationDesk))
    }
}

fn location_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "description": description,
        "properties": {
            "latitude": { "type": "string", "description": "latitude coordinate" },
            "longitude": { "type": "string", "description": "longitude coordinate" }
        },
        "required": ["latitude", "longitude"]
    })
}

#[async_trait]
impl Action for ReservationAction {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Create a new trip reservation for a passenger"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pickupDateTime": {
                    "type": "string",
                    "format": "date-time",
                    "description": "Date of the passenger's pickup, expressed in local timezone, including both date AND time"
                },
                "pickupLocation": location_schema("Location the passenger's trip is originating from"),
                "dropoffLocation": location_schema("Location the passenger's trip is destined for")
            },
            "required": ["pickupDateTime", "pickupLocation", "dropoffLocation"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ActionError> {
        let reservation: Reservation = parse_arguments(NAME, arguments)?;
        if reservation.pickup_location == reservation.dropoff_location {
            return Err(ActionError::malformed(
                NAME,
                "pickupLocation and dropoffLocation are the same place",
            ));
        }

        let confirmation = self
            .desk
            .book(&reservation)
            .await
            .map_err(|e| ActionError::failed(NAME, e.to_string()))?;

        Ok(format!(
            "Reservation created! Confirmation number {} for pickup at {}.",
            confirmation.number, reservation.pickup_date_time
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingDesk {
        booked: Mutex<Vec<Reservation>>,
    }

    #[async_trait]
    impl ReservationDesk for RecordingDesk {
        async fn book(&self, reservation: &Reservation) -> Result<Confirmation, BackendError> {
            self.booked.lock().await.push(reservation.clone());
            Ok(Confirmation {
                number: "RD-TEST".into(),
            })
        }
    }

    struct FullDesk;

    #[async_trait]
    impl ReservationDesk for FullDesk {
        async fn book(&self, _reservation: &Reservation) -> Result<Confirmation, BackendError> {
            Err(BackendError::Rejected("no vehicles available at 09:00".into()))
        }
    }

    fn valid_args() -> serde_json::Value {
        serde_json::json!({
            "pickupDateTime": "2024-01-01T09:00:00",
            "pickupLocation": {"latitude": "40.7128", "longitude": "-74.0060"},
            "dropoffLocation": {"latitude": 40.6413, "longitude": -73.7781}
        })
    }

    #[tokio::test]
    async fn creates_reservation() {
        let desk = Arc::new(RecordingDesk::default());
        let action = ReservationAction::new(desk.clone());

        let output = action.execute(valid_args()).await.unwrap();
        assert!(output.contains("Reservation created"));
        assert!(output.contains("RD-TEST"));
        assert!(output.contains("2024-01-01T09:00:00"));

        let booked = desk.booked.lock().await;
        assert_eq!(booked.len(), 1);
        assert!((booked[0].dropoff_location.latitude - 40.6413).abs() < 1e-9);
    }

    #[tokio::test]
    async fn default_desk_issues_confirmation() {
        let output = ReservationAction::default().execute(valid_args()).await.unwrap();
        assert!(output.contains("Confirmation number RD-"));
    }

    #[tokio::test]
    async fn accepts_pickup_date_alias() {
        let mut args = valid_args();
        let time = args["pickupDateTime"].take();
        args.as_object_mut().unwrap().remove("pickupDateTime");
        args["pickupDate"] = time;

        assert!(ReservationAction::default().execute(args).await.is_ok());
    }

    #[tokio::test]
    async fn missing_pickup_time_is_malformed() {
        let mut args = valid_args();
        args.as_object_mut().unwrap().remove("pickupDateTime");

        let desk = Arc::new(RecordingDesk::default());
        let err = ReservationAction::new(desk.clone())
            .execute(args)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::MalformedArguments { .. }));
        assert!(desk.booked.lock().await.is_empty());
    }

    #[tokio::test]
    async fn date_without_time_is_malformed() {
        let mut args = valid_args();
        args["pickupDateTime"] = serde_json::json!("2024-01-01");
        let err = ReservationAction::default().execute(args).await.unwrap_err();
        assert!(
            matches!(err, ActionError::MalformedArguments { ref reason, .. } if reason.contains("time of day"))
        );
    }

    #[tokio::test]
    async fn identical_endpoints_are_malformed() {
        let mut args = valid_args();
        args["dropoffLocation"] = args["pickupLocation"].clone();
        let err = ReservationAction::default().execute(args).await.unwrap_err();
        assert!(matches!(err, ActionError::MalformedArguments { .. }));
    }

    #[tokio::test]
    async fn desk_rejection_is_execution_failure() {
        let err = ReservationAction::new(Arc::new(FullDesk))
            .execute(valid_args())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::ExecutionFailed { .. }));
    }
}
