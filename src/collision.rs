//! Sensor readings.
//!
//! These hold the results of physics queries (an overlap test and a sphere
//! cast) used for ground and steep-wall detection.

use bevy::prelude::*;

/// Raw ground readings written by the backend's sensor system each tick.
///
/// The grounding probe decides which of these readings counts, depending on
/// whether the character is currently in a grounded or airborne state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroundSensors {
    /// A sphere one radius below the feet overlaps ground geometry.
    pub overlap: bool,
    /// Normal of the surface hit by the downward sphere cast, if any.
    pub surface_normal: Option<Vec3>,
    /// The body collaborator reported contact after its last move.
    pub body_grounded: bool,
}

impl GroundSensors {
    /// Normalized surface normal, world up when nothing usable was hit.
    pub fn normal(&self) -> Vec3 {
        self.surface_normal
            .map(Vec3::normalize_or_zero)
            .filter(|n| *n != Vec3::ZERO)
            .unwrap_or(Vec3::Y)
    }
}
