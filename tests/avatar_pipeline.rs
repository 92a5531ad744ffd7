use std::f32::consts::FRAC_PI_2;

use nalgebra::{Matrix4, UnitQuaternion, Vector3};

use facepuppet::avatar::{AvatarPose, AvatarPoseMapper, AvatarRig, SceneArena, SmoothingFactor};
use facepuppet::config::{MapperConfig, RigConfig};
use facepuppet::face_transform::{compose, decompose_slice};
use facepuppet::{FaceDetection, FrameLoop, FrameOutcome};

// f32 angle_to bottoms out around 1e-3 rad, compare components instead
fn same_rotation(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, eps: f32) -> bool {
    (a.coords - b.coords).amax() < eps || (a.coords + b.coords).amax() < eps
}

fn translate_rotate_z_scale() -> Matrix4<f32> {
    Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0))
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2).to_homogeneous()
        * Matrix4::new_scaling(2.0)
}

#[test]
fn decomposes_translated_rotated_scaled_matrix() {
    let m = translate_rotate_z_scale();

    // detector layout is column-major, translation at 12..15
    let flat = m.as_slice();
    assert_eq!(&flat[12..15], &[1.0, 2.0, 3.0]);

    let result = decompose_slice(flat).unwrap();

    assert!((result.translation - Vector3::new(1.0, 2.0, 3.0)).amax() < 1e-6);
    assert!((result.scale - Vector3::repeat(2.0)).amax() < 1e-6);

    let expected = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
    assert!(same_rotation(&result.orientation(), &expected, 1e-5));
    assert!((compose(&result) - m).amax() < 1e-5);
}

#[test]
fn mirrored_pose_is_a_reflection_of_the_plain_one() {
    let mapper = AvatarPoseMapper::new(MapperConfig::default());
    let m = Matrix4::new_translation(&Vector3::new(4.0, -1.0, -45.0))
        * UnitQuaternion::from_euler_angles(0.2, 0.5, -0.1).to_homogeneous();
    let transform = decompose_slice(m.as_slice()).unwrap();

    let plain = mapper.raw_pose(&transform, false);
    let mirrored = mapper.raw_pose(&transform, true);

    assert_eq!(mirrored.orientation.i, plain.orientation.i);
    assert_eq!(mirrored.orientation.j, -plain.orientation.j);
    assert_eq!(mirrored.orientation.k, -plain.orientation.k);
    assert_eq!(mirrored.orientation.w, plain.orientation.w);
    assert_eq!(mirrored.position.x, -plain.position.x);
    assert_eq!(mirrored.position.y, plain.position.y);
    assert_eq!(mirrored.scale, plain.scale);
}

#[test]
fn collapsed_frame_keeps_the_avatar_in_place() {
    let config = RigConfig::default();
    let mut scene = SceneArena::avatar(&config);
    let rig = AvatarRig::resolve(&scene, &config).unwrap();
    let mut frames = FrameLoop::new(MapperConfig::default());

    let good = Matrix4::new_translation(&Vector3::new(2.0, 3.0, -40.0));
    let first = frames
        .drive(&FaceDetection::new(0, good.as_slice().to_vec()), &rig, &mut scene)
        .unwrap();
    let placed = scene.node(rig.root).unwrap().clone();

    let collapsed = Matrix4::new_nonuniform_scaling(&Vector3::new(1e-9, 1.0, 1.0));
    let second = frames
        .drive(&FaceDetection::new(33, collapsed.as_slice().to_vec()), &rig, &mut scene)
        .unwrap();

    assert_eq!(second, FrameOutcome::Held(first.pose()));
    assert_eq!(scene.node(rig.root).unwrap(), &placed);
    let held = second.pose().unwrap();
    assert!(held.position.iter().all(|v| v.is_finite()));
}

#[test]
fn smoothing_converges_on_a_still_face() {
    let mapper = AvatarPoseMapper::new(MapperConfig::default());
    let m = Matrix4::new_translation(&Vector3::new(10.0, 0.0, -50.0))
        * UnitQuaternion::from_euler_angles(0.0, 0.7, 0.0).to_homogeneous();
    let transform = decompose_slice(m.as_slice()).unwrap();
    let target = mapper.raw_pose(&transform, false);

    let mut pose = AvatarPose::default();
    for _ in 0..40 {
        pose = mapper
            .map(&transform, false, Some(&pose), SmoothingFactor::new(0.3))
            .unwrap();
    }

    assert!((pose.position - target.position).amax() < 1e-4);
    assert!(same_rotation(&pose.orientation, &target.orientation, 1e-4));
    assert!((pose.scale - target.scale).abs() < 1e-4);
}
