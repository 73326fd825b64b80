//! Domain factories for creating domain entities and value objects.

use super::{RoomName, error::ValueObjectError};

/// Factory for generating RoomName instances.
///
/// Used when a participant asks for a room without naming one, separating the
/// generation concern from the validation logic in RoomName.
pub struct RoomNameFactory;

impl RoomNameFactory {
    /// Generate a new room code from a random UUID v4.
    ///
    /// # Returns
    ///
    /// A Result containing a new RoomName of the form `room-` followed by the
    /// 32 hex digits of the UUID
    ///
    /// # Errors
    ///
    /// This method should not fail in practice, but returns Result for consistency
    /// with the domain error handling pattern.
    pub fn generate() -> Result<RoomName, ValueObjectError> {
        RoomName::new(format!("room-{}", uuid::Uuid::new_v4().simple()))
    }
}
