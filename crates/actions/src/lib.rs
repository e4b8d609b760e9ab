//! Booking actions for RideDesk.
//!
//! The model may request exactly two actions:
//! - `geocode`: street address → coordinates
//! - `create_new_reservation`: pickup time + endpoints → confirmation
//!
//! Both parse their arguments strictly and reach their backend through a
//! trait, so the stubs here can be replaced without touching the dialogue.

pub mod error;
pub mod geocode;
pub mod location;
pub mod reservation;

pub use error::BackendError;
pub use geocode::{GeocodeAction, Geocoder, PlaceholderGeocoder};
pub use location::{Coordinates, PickupTime};
pub use reservation::{
    Confirmation, LoggingReservationDesk, Reservation, ReservationAction, ReservationDesk,
};

use ridedesk_core::action::ActionRegistry;
use std::sync::Arc;

/// Registry with both booking actions on their default backends.
pub fn default_registry() -> ActionRegistry {
    registry_with(Arc::new(PlaceholderGeocoder), Arc::new(LoggingReservationDesk))
}

/// Registry with both booking actions on the given backends.
pub fn registry_with(
    geocoder: Arc<dyn Geocoder>,
    desk: Arc<dyn ReservationDesk>,
) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(GeocodeAction::new(geocoder)));
    registry.register(Arc::new(ReservationAction::new(desk)));
    registry
}
