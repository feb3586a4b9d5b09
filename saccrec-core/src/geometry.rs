//! Conversions between physical screen distances, pixels and visual angles.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Integer pixel coordinate on the stimulus screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Scales `value_cm` along an axis that is `axis_length_cm` long and spans
/// `axis_length_px` pixels.
pub fn cm_to_pixels(
    axis_length_cm: f64,
    axis_length_px: u32,
    value_cm: f64,
) -> Result<f64, GeometryError> {
    if axis_length_cm.is_nan() || axis_length_cm <= 0.0 {
        return Err(GeometryError::InvalidGeometry {
            axis: "axis length",
            value: axis_length_cm,
        });
    }
    Ok(value_cm * f64::from(axis_length_px) / axis_length_cm)
}

/// Viewing distance at which two targets `saccadic_distance_cm` apart are
/// each seen `angle_degrees` away from the center.
pub fn distance_to_subject(
    saccadic_distance_cm: f64,
    angle_degrees: f64,
) -> Result<f64, GeometryError> {
    check_angle(angle_degrees)?;
    let half = saccadic_distance_cm / 2.0;
    Ok(half * (90.0 - angle_degrees).to_radians().sin() / angle_degrees.to_radians().sin())
}

/// Horizontal distance from the center that subtends `angle_degrees` for a
/// subject sitting `distance_cm` away. Inverse of [`distance_to_subject`].
pub fn saccadic_half_offset(distance_cm: f64, angle_degrees: f64) -> Result<f64, GeometryError> {
    check_angle(angle_degrees)?;
    Ok(distance_cm * angle_degrees.to_radians().sin() / (90.0 - angle_degrees).to_radians().sin())
}

fn check_angle(angle_degrees: f64) -> Result<(), GeometryError> {
    if angle_degrees > 0.0 && angle_degrees < 90.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidAngle(angle_degrees))
    }
}

/// Physical description of the stimulus screen and of where the subject sits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenGeometry {
    width_cm: f64,
    width_px: u32,
    height_px: u32,
    distance_cm: f64,
}

impl ScreenGeometry {
    pub fn new(
        width_cm: f64,
        height_cm: f64,
        width_px: u32,
        height_px: u32,
        distance_cm: f64,
    ) -> Result<Self, GeometryError> {
        let positive = |axis: &'static str, value: f64| {
            if value > 0.0 {
                Ok(())
            } else {
                Err(GeometryError::InvalidGeometry { axis, value })
            }
        };
        positive("width", width_cm)?;
        positive("height", height_cm)?;
        positive("horizontal resolution", f64::from(width_px))?;
        positive("vertical resolution", f64::from(height_px))?;
        positive("distance to subject", distance_cm)?;

        Ok(Self {
            width_cm,
            width_px,
            height_px,
            distance_cm,
        })
    }

    pub fn distance_cm(&self) -> f64 {
        self.distance_cm
    }

    pub fn cm_to_pixels_x(&self, value_cm: f64) -> Result<f64, GeometryError> {
        cm_to_pixels(self.width_cm, self.width_px, value_cm)
    }

    pub fn center(&self) -> PixelPoint {
        PixelPoint::new((self.width_px / 2) as i32, (self.height_px / 2) as i32)
    }
}
