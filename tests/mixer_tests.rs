//! Animation Mixer Tests
//!
//! Tests for:
//! - Writing sampled transform and morph values into a character
//! - Weight normalization above 1 and rest-pose fill below 1
//! - Partial rotation weights blending from the current pose
//! - Stopped clips and unknown targets being ignored
//! - update() advancing clips before applying

use glam::{Quat, Vec3};

use signmix::animation::clip::{AnimationClip, TargetReference, TargetedCurve};
use signmix::animation::curve::{Curve, CurveData, TargetProperty};
use signmix::animation::mixer::AnimationMixer;
use signmix::animation::tracks::{InterpolationMode, KeyframeTrack};
use signmix::character::{Character, Transform};
use signmix::config::ResolverOptions;
use signmix::retarget::Retargeter;

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn avatar() -> Character {
    let mut c = Character::new("avatar");
    c.add_joint("Spine");
    c.add_node(
        "Prop",
        Transform {
            position: Vec3::new(1.0, 1.0, 1.0),
            ..Default::default()
        },
    );
    let face = c.add_mesh("Face");
    c.add_morph_target(face, "smile").unwrap();
    c
}

fn spine_clip(name: &str, reach: f32) -> AnimationClip {
    let curve = Curve::new(
        "Spine.position",
        TargetProperty::Position,
        CurveData::Vector3(KeyframeTrack::new(
            vec![0.0, 60.0],
            vec![Vec3::ZERO, Vec3::splat(reach)],
            InterpolationMode::Linear,
        )),
        60.0,
    );
    AnimationClip::new(name, vec![TargetedCurve::new(TargetReference::unbound("Spine"), curve)])
}

fn smile_clip(value: f32) -> AnimationClip {
    let curve = Curve::new(
        "smile.influence",
        TargetProperty::Influence,
        CurveData::Scalar(KeyframeTrack::new(vec![0.0, 60.0], vec![value, value], InterpolationMode::Linear)),
        60.0,
    );
    AnimationClip::new("smile", vec![TargetedCurve::new(TargetReference::unbound("smile"), curve)])
}

fn spine_position(character: &Character) -> Vec3 {
    let node = character.find_node_by_name("Spine").unwrap();
    character.node(node).unwrap().transform.position
}

fn smile_influence(character: &Character) -> f32 {
    let key = character.find_morph_target_by_name("smile").unwrap();
    character.morph_target(key).unwrap().influence
}

// ============================================================================
// Apply
// ============================================================================

#[test]
fn single_clip_writes_sampled_values() {
    let mut character = avatar();
    let mut clip = spine_clip("reach", 6.0);
    clip.start();
    clip.go_to_frame(30.0);

    let mut mixer = AnimationMixer::new();
    let written = mixer.apply(&mut [&mut clip], &mut character);

    assert_eq!(written, 1);
    let pos = spine_position(&character);
    assert!(approx(pos.x, 3.0), "Expected 3.0, got {pos}");
}

#[test]
fn retargeted_clips_drive_bound_targets() {
    let mut character = avatar();
    let source = smile_clip(0.8);
    let mut bound = Retargeter::new(&character, ResolverOptions::default()).retarget(&source, "bound");
    bound.start();

    AnimationMixer::new().apply(&mut [&mut bound], &mut character);

    assert!(approx(smile_influence(&character), 0.8));
}

#[test]
fn weights_above_one_are_normalized() {
    let mut character = avatar();
    let mut a = spine_clip("a", 2.0);
    let mut b = spine_clip("b", 4.0);
    for clip in [&mut a, &mut b] {
        clip.start();
        clip.go_to_frame(60.0);
    }

    AnimationMixer::new().apply(&mut [&mut a, &mut b], &mut character);

    let pos = spine_position(&character);
    assert!(approx(pos.x, 3.0), "Expected 3.0, got {pos}");
}

#[test]
fn weights_below_one_keep_part_of_current_pose() {
    let mut character = avatar();
    let mut clip = spine_clip("light", 4.0);
    clip.set_weight(0.25);
    clip.start();
    clip.go_to_frame(60.0);

    AnimationMixer::new().apply(&mut [&mut clip], &mut character);

    let pos = spine_position(&character);
    assert!(approx(pos.x, 1.0), "Expected 1.0, got {pos}");
}

#[test]
fn stopped_and_weightless_clips_are_ignored() {
    let mut character = avatar();
    let mut stopped = spine_clip("stopped", 4.0);
    let mut silent = smile_clip(1.0);
    silent.set_weight(0.0);
    silent.start();

    let written = AnimationMixer::new().apply(&mut [&mut stopped, &mut silent], &mut character);

    assert_eq!(written, 0);
    assert!(approx(spine_position(&character).x, 0.0));
    assert!(approx(smile_influence(&character), 0.0));
}

#[test]
fn unknown_targets_are_skipped() {
    let mut character = avatar();
    let curve = Curve::new(
        "Tail.position",
        TargetProperty::Position,
        CurveData::Vector3(KeyframeTrack::new(vec![0.0], vec![Vec3::ONE], InterpolationMode::Linear)),
        60.0,
    );
    let mut clip = AnimationClip::new("tail", vec![TargetedCurve::new(TargetReference::unbound("Tail"), curve)]);
    clip.start();

    assert_eq!(AnimationMixer::new().apply(&mut [&mut clip], &mut character), 0);
}

#[test]
fn rotations_are_written_normalized() {
    let mut character = avatar();
    let curve = Curve::new(
        "Spine.rotation",
        TargetProperty::Rotation,
        CurveData::Quaternion(KeyframeTrack::new(
            vec![0.0, 60.0],
            vec![Quat::IDENTITY, Quat::from_rotation_z(1.0)],
            InterpolationMode::Linear,
        )),
        60.0,
    );
    let mut clip = AnimationClip::new("turn", vec![TargetedCurve::new(TargetReference::unbound("Spine"), curve)]);
    clip.start();
    clip.go_to_frame(60.0);

    AnimationMixer::new().apply(&mut [&mut clip], &mut character);

    let node = character.find_node_by_name("Spine").unwrap();
    let rotation = character.node(node).unwrap().transform.rotation;
    assert!(approx(rotation.length(), 1.0));
    assert!(rotation.angle_between(Quat::from_rotation_z(1.0)) < 1e-3);
}

#[test]
fn partial_rotation_weight_blends_from_current_pose() {
    let mut character = avatar();
    let curve = Curve::new(
        "Spine.rotation",
        TargetProperty::Rotation,
        CurveData::Quaternion(KeyframeTrack::new(
            vec![0.0],
            vec![Quat::from_rotation_z(1.0)],
            InterpolationMode::Linear,
        )),
        60.0,
    );
    let mut clip = AnimationClip::new("turn", vec![TargetedCurve::new(TargetReference::unbound("Spine"), curve)]);
    clip.set_weight(0.25);
    clip.start();

    AnimationMixer::new().apply(&mut [&mut clip], &mut character);

    let node = character.find_node_by_name("Spine").unwrap();
    let rotation = character.node(node).unwrap().transform.rotation;
    let angle = rotation.angle_between(Quat::from_rotation_z(0.25));
    assert!(angle < 1e-3, "Expected rotZ(0.25), drifted by {angle}");
}

// ============================================================================
// Update
// ============================================================================

#[test]
fn update_advances_then_applies() {
    let mut character = avatar();
    let mut clip = spine_clip("reach", 6.0);
    clip.start();

    let mut mixer = AnimationMixer::new();
    mixer.update(0.5, &mut [&mut clip], &mut character);

    let pos = spine_position(&character);
    assert!(approx(pos.x, 3.0), "Expected 3.0, got {pos}");
}

#[test]
fn unanimated_nodes_keep_their_transform() {
    let mut character = avatar();
    let mut clip = spine_clip("reach", 6.0);
    clip.start();

    AnimationMixer::new().update(0.5, &mut [&mut clip], &mut character);

    let prop = character.find_node_by_name("Prop").unwrap();
    assert!(approx(character.node(prop).unwrap().transform.position.x, 1.0));
}
