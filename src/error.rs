//! Configuration faults.
//!
//! The controller has no recoverable error channel at runtime. Everything
//! that can go wrong is a wiring or tuning mistake, detected either when a
//! [`CharacterControllerBundle`](crate::CharacterControllerBundle) is built
//! or when a freshly spawned controller is validated. A faulty controller
//! never ticks.

use bevy::prelude::*;
use thiserror::Error;

/// Errors raised while validating a character controller setup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    /// A tuning constant is out of range or not finite.
    #[error("invalid controller config: `{field}` {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },

    /// The camera entity injected at construction does not exist.
    #[error("camera entity {0} does not exist")]
    MissingCamera(Entity),

    /// The camera entity exists but has no `Transform` to read or drive.
    #[error("camera entity {0} has no Transform")]
    CameraWithoutTransform(Entity),

    /// The body entity lacks a component the physics backend needs.
    #[error("body entity {entity} is missing required component `{component}`")]
    MissingBodyComponent {
        entity: Entity,
        component: &'static str,
    },

    /// The config could not be parsed.
    #[error("failed to parse controller config: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ControllerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Marker inserted on controllers that passed validation.
///
/// Every tick system filters on this marker.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct ControllerReady;

/// Inserted instead of [`ControllerReady`] when validation fails.
#[derive(Component, Debug, Clone)]
pub struct ControllerFault(pub ControllerError);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_message_names_field() {
        let err = ControllerError::InvalidConfig {
            field: "gravity",
            reason: "must be positive and finite",
        };
        assert_eq!(
            err.to_string(),
            "invalid controller config: `gravity` must be positive and finite"
        );
    }

    #[test]
    fn json_errors_convert_to_parse() {
        let json_err = serde_json::from_str::<f32>("nope").unwrap_err();
        let err: ControllerError = json_err.into();
        assert!(matches!(err, ControllerError::Parse(_)));
    }
}
