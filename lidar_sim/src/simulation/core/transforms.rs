// lidar_sim/src/simulation/core/transforms.rs

//! Conversions between the ENU frame used by `lidar_core` and configs
//! (x east, y north, z up) and Bevy's world frame (x right, y up, z back).

use bevy::prelude::{Dir3, GlobalTransform, Quat as BevyQuat, Transform as BevyTransform, Vec3 as BevyVec3};
use lidar_core::perception::SensorRay;
use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use std::f64::consts::FRAC_PI_2;

/// Rotation taking ENU basis vectors to their Bevy coordinates:
/// -90 degrees about X, so ENU up becomes Bevy +Y and ENU north Bevy -Z.
fn enu_frame_to_bevy_frame() -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2)
}

// =========================================================================
// == Vectors ==
// =========================================================================

/// Converts a 3D coordinate vector from ENU to Bevy world.
pub fn enu_vector_to_bevy_vector(enu_vec: &Vector3<f64>) -> BevyVec3 {
    BevyVec3::new(
        enu_vec.x as f32,  // East -> Bevy X
        enu_vec.z as f32,  // Up -> Bevy Y
        -enu_vec.y as f32, // North -> Bevy -Z
    )
}

/// Converts a 3D coordinate vector from Bevy world to ENU.
pub fn bevy_vector_to_enu_vector(bevy_vec: &BevyVec3) -> Vector3<f64> {
    Vector3::new(bevy_vec.x as f64, -bevy_vec.z as f64, bevy_vec.y as f64)
}

// =========================================================================
// == Orientations & Poses ==
// =========================================================================

/// Converts an object's orientation from the ENU frame to the Bevy frame.
pub fn enu_quat_to_bevy_quat(enu_quat: &UnitQuaternion<f64>) -> BevyQuat {
    let q = enu_frame_to_bevy_frame();
    let bevy = q * enu_quat * q.inverse();
    BevyQuat::from_xyzw(
        bevy.coords.x as f32,
        bevy.coords.y as f32,
        bevy.coords.z as f32,
        bevy.coords.w as f32,
    )
}

/// Converts an object's orientation from the Bevy frame to the ENU frame.
pub fn bevy_quat_to_enu_quat(bevy_quat: &BevyQuat) -> UnitQuaternion<f64> {
    let bevy = UnitQuaternion::from_quaternion(Quaternion::new(
        bevy_quat.w as f64,
        bevy_quat.x as f64,
        bevy_quat.y as f64,
        bevy_quat.z as f64,
    ));
    let q = enu_frame_to_bevy_frame();
    q.inverse() * bevy * q
}

/// Converts a full ENU pose to a Bevy `Transform`.
pub fn enu_iso_to_bevy_transform(enu_pose: &Isometry3<f64>) -> BevyTransform {
    BevyTransform {
        translation: enu_vector_to_bevy_vector(&enu_pose.translation.vector),
        rotation: enu_quat_to_bevy_quat(&enu_pose.rotation),
        scale: BevyVec3::ONE,
    }
}

/// Converts a Bevy `Transform` to a full ENU pose.
pub fn bevy_transform_to_enu_iso(transform: &BevyTransform) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::from(bevy_vector_to_enu_vector(&transform.translation)),
        bevy_quat_to_enu_quat(&transform.rotation),
    )
}

pub fn bevy_global_transform_to_enu_iso(transform: &GlobalTransform) -> Isometry3<f64> {
    bevy_transform_to_enu_iso(&transform.compute_transform())
}

// =========================================================================
// == Rays ==
// =========================================================================

/// World-space Bevy direction of a sensor-frame ray, given the sensor's
/// world rotation. `None` for a degenerate direction.
pub fn sensor_ray_to_bevy_direction(ray: &SensorRay, sensor_rotation: BevyQuat) -> Option<Dir3> {
    let local = enu_vector_to_bevy_vector(&ray.direction);
    Dir3::new(sensor_rotation * local).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn assert_bevy_vec3_approx_eq(a: BevyVec3, b: BevyVec3) {
        assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-5);
        assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-5);
        assert_abs_diff_eq!(a.z, b.z, epsilon = 1e-5);
    }

    #[test]
    fn enu_axes_map_to_bevy_axes() {
        assert_bevy_vec3_approx_eq(enu_vector_to_bevy_vector(&Vector3::x()), BevyVec3::X);
        assert_bevy_vec3_approx_eq(enu_vector_to_bevy_vector(&Vector3::y()), BevyVec3::NEG_Z);
        assert_bevy_vec3_approx_eq(enu_vector_to_bevy_vector(&Vector3::z()), BevyVec3::Y);
    }

    #[test]
    fn vector_conversion_round_trips() {
        let v = Vector3::new(1.5, -2.0, 0.25);
        let back = bevy_vector_to_enu_vector(&enu_vector_to_bevy_vector(&v));
        assert_abs_diff_eq!(back, v, epsilon = 1e-6);
    }

    #[test]
    fn quaternion_conversion_matches_frame_change() {
        // Yaw of 90 degrees about ENU up is a rotation about Bevy +Y.
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
        let bevy = enu_quat_to_bevy_quat(&yaw);
        let expected = BevyQuat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!(bevy.dot(expected).abs() > 1.0 - 1e-5);

        let back = bevy_quat_to_enu_quat(&bevy);
        assert_abs_diff_eq!(back.angle_to(&yaw), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn pose_round_trips_through_bevy_transform() {
        let pose = Isometry3::new(Vector3::new(2.0, 3.0, 0.5), Vector3::new(0.0, 0.0, 0.3));
        let transform = enu_iso_to_bevy_transform(&pose);
        assert_bevy_vec3_approx_eq(transform.translation, BevyVec3::new(2.0, 0.5, -3.0));

        let back = bevy_transform_to_enu_iso(&transform);
        assert_abs_diff_eq!(back.translation.vector, pose.translation.vector, epsilon = 1e-5);
        assert_abs_diff_eq!(back.rotation.angle_to(&pose.rotation), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn forward_ray_of_yawed_sensor_points_north() {
        let ray = SensorRay {
            id: 0,
            direction: Vector3::x(),
        };
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
        let direction = sensor_ray_to_bevy_direction(&ray, enu_quat_to_bevy_quat(&yaw)).unwrap();
        assert_bevy_vec3_approx_eq(*direction, BevyVec3::NEG_Z);
    }

    #[test]
    fn degenerate_ray_has_no_direction() {
        let ray = SensorRay {
            id: 0,
            direction: Vector3::zeros(),
        };
        assert!(sensor_ray_to_bevy_direction(&ray, BevyQuat::IDENTITY).is_none());
    }
}
