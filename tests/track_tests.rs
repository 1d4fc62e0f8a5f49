//! Keyframe and Playback Tests
//!
//! Tests for:
//! - KeyframeTrack linear/step/cubic interpolation on frame positions
//! - KeyframeCursor sequential access and binary search fallback
//! - Keyframe validation (strictly increasing frames, value counts)
//! - AnimationClip frame range, loop modes and weight ramp
//! - Clone independence

use std::f32::consts::PI;

use glam::{Quat, Vec3};

use signmix::animation::clip::{AnimationClip, LoopMode, PlaybackState, TargetReference, TargetedCurve};
use signmix::animation::curve::{Curve, CurveData, TargetProperty};
use signmix::animation::tracks::{InterpolationMode, Keyframe, KeyframeCursor, KeyframeTrack};
use signmix::animation::values::Interpolatable;
use signmix::errors::Error;

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn scalar_track(times: &[f32], values: &[f32]) -> KeyframeTrack<f32> {
    KeyframeTrack::new(times.to_vec(), values.to_vec(), InterpolationMode::Linear)
}

/// A clip with one scalar curve ramping 0 -> 60 over `[0, 60]` frames.
fn ramp_clip(name: &str) -> AnimationClip {
    let curve = Curve::new(
        "ramp",
        TargetProperty::Influence,
        CurveData::Scalar(scalar_track(&[0.0, 60.0], &[0.0, 60.0])),
        60.0,
    );
    AnimationClip::new(name, vec![TargetedCurve::new(TargetReference::unbound("smile"), curve)])
}

// ============================================================================
// KeyframeTrack: Linear / Step
// ============================================================================

#[test]
fn track_linear_f32_midpoint() {
    let track = scalar_track(&[0.0, 30.0], &[0.0, 10.0]);

    let mut cursor = KeyframeCursor::default();
    let val = track.sample_with_cursor(15.0, &mut cursor).unwrap();
    assert!(approx(val, 5.0), "Expected 5.0, got {val}");
}

#[test]
fn track_linear_clamps_outside_range() {
    let track = scalar_track(&[10.0, 20.0], &[1.0, 2.0]);

    assert!(approx(track.sample(0.0).unwrap(), 1.0));
    assert!(approx(track.sample(99.0).unwrap(), 2.0));
}

#[test]
fn track_step_holds_value() {
    let track = KeyframeTrack::new(vec![0.0, 10.0, 20.0], vec![0.0_f32, 100.0, 200.0], InterpolationMode::Step);

    let mut cursor = KeyframeCursor::default();
    assert!(approx(track.sample_with_cursor(0.0, &mut cursor).unwrap(), 0.0));
    assert!(approx(track.sample_with_cursor(9.9, &mut cursor).unwrap(), 0.0));
    assert!(approx(track.sample_with_cursor(10.0, &mut cursor).unwrap(), 100.0));
    assert!(approx(track.sample_with_cursor(15.0, &mut cursor).unwrap(), 100.0));
}

#[test]
fn track_linear_vec3() {
    let track = KeyframeTrack::new(
        vec![0.0, 60.0],
        vec![Vec3::ZERO, Vec3::new(10.0, 20.0, 30.0)],
        InterpolationMode::Linear,
    );

    let val = track.sample(30.0).unwrap();
    assert!(approx(val.x, 5.0));
    assert!(approx(val.y, 10.0));
    assert!(approx(val.z, 15.0));
}

#[test]
fn track_linear_quat_slerp() {
    let q0 = Quat::IDENTITY;
    let q1 = Quat::from_rotation_y(PI);
    let track = KeyframeTrack::new(vec![0.0, 60.0], vec![q0, q1], InterpolationMode::Linear);

    let val = track.sample(30.0).unwrap();
    let angle = val.angle_between(q0.slerp(q1, 0.5));
    assert!(angle < 0.01, "Quaternion slerp mismatch: angle={angle}");
}

#[test]
fn empty_track_samples_nothing() {
    let track = scalar_track(&[], &[]);
    assert!(track.sample(0.0).is_none());
    assert!(track.sample_linear(0.0).is_none());
}

// ============================================================================
// KeyframeTrack: Cubic Spline
// ============================================================================

#[test]
fn track_cubic_f32_endpoints() {
    // [in_tangent, value, out_tangent] per key
    let track = KeyframeTrack::new(
        vec![0.0, 60.0],
        vec![0.0_f32, 0.0, 1.0, 1.0, 10.0, 0.0],
        InterpolationMode::CubicSpline,
    );

    let mut cursor = KeyframeCursor::default();
    let v0 = track.sample_with_cursor(0.0, &mut cursor).unwrap();
    assert!(approx(v0, 0.0), "got {v0}");
    let v1 = track.sample_with_cursor(60.0, &mut cursor).unwrap();
    assert!(approx(v1, 10.0), "got {v1}");
}

#[test]
fn sample_linear_ignores_cubic_tangents() {
    let track = KeyframeTrack::new(
        vec![0.0, 60.0],
        vec![0.0_f32, 0.0, 50.0, 50.0, 10.0, 0.0],
        InterpolationMode::CubicSpline,
    );

    let val = track.sample_linear(30.0).unwrap();
    assert!(approx(val, 5.0), "Expected 5.0, got {val}");
}

// ============================================================================
// KeyframeCursor
// ============================================================================

#[test]
fn sample_matches_cursor_across_all_frames() {
    let track = scalar_track(&[0.0, 10.0, 20.0, 30.0, 40.0], &[0.0, 10.0, 5.0, 20.0, 15.0]);
    let mut cursor = KeyframeCursor::default();
    for i in 0..=40 {
        let frame = i as f32;
        let val_cursor = track.sample_with_cursor(frame, &mut cursor).unwrap();
        let val_sample = track.sample(frame).unwrap();
        assert!(
            approx(val_sample, val_cursor),
            "frame={frame}: sample()={val_sample} != sample_with_cursor()={val_cursor}"
        );
    }
}

#[test]
fn cursor_forward_then_jump_back() {
    let track = scalar_track(&[0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0], &[0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
    let mut cursor = KeyframeCursor::default();

    assert!(approx(track.sample_with_cursor(55.0, &mut cursor).unwrap(), 55.0));
    assert_eq!(cursor.last_index, 5);

    // Large jump back falls back to binary search
    assert!(approx(track.sample_with_cursor(5.0, &mut cursor).unwrap(), 5.0));
    assert_eq!(cursor.last_index, 0);
}

#[test]
fn stale_cursor_is_clamped() {
    let track = scalar_track(&[0.0, 10.0], &[0.0, 10.0]);
    let mut cursor = KeyframeCursor { last_index: 99 };
    let val = track.sample_with_cursor(5.0, &mut cursor).unwrap();
    assert!(approx(val, 5.0), "Expected 5.0, got {val}");
}

// ============================================================================
// Keyframe validation
// ============================================================================

#[test]
fn from_keyframes_rejects_non_increasing_frames() {
    let keys = [Keyframe::new(0.0, 1.0_f32), Keyframe::new(10.0, 2.0), Keyframe::new(10.0, 3.0)];
    let result = KeyframeTrack::from_keyframes(&keys, InterpolationMode::Linear);
    assert!(matches!(result, Err(Error::InvalidKeyframes(_))));
}

#[test]
fn try_new_rejects_value_count_mismatch() {
    let result = KeyframeTrack::try_new(vec![0.0, 1.0], vec![Vec3::ZERO], InterpolationMode::Linear);
    assert!(matches!(result, Err(Error::InvalidKeyframes(_))));
}

#[test]
fn keyframes_round_trip_through_set_keyframes() {
    let mut track = scalar_track(&[0.0, 30.0], &[1.0, 2.0]);
    let mut keys = track.keyframes();
    keys[1].value = 7.0;
    track.set_keyframes(&keys).unwrap();
    assert!(approx(track.sample(30.0).unwrap(), 7.0));
}

#[test]
fn append_requires_later_frames() {
    let mut track = scalar_track(&[0.0, 10.0], &[0.0, 1.0]);
    assert!(track.append(&scalar_track(&[5.0, 20.0], &[0.0, 1.0])).is_err());
    track.append(&scalar_track(&[20.0, 30.0], &[2.0, 3.0])).unwrap();
    assert_eq!(track.len(), 4);
    assert_eq!(track.last_frame(), Some(30.0));
}

#[test]
fn append_on_last_frame_replaces_that_key() {
    let mut track = scalar_track(&[0.0, 10.0], &[0.0, 1.0]);
    track.append(&scalar_track(&[10.0, 20.0], &[4.0, 2.0])).unwrap();

    assert_eq!(track.times, vec![0.0, 10.0, 20.0]);
    let joint = track.sample(10.0).unwrap();
    assert!(approx(joint, 4.0), "Expected 4.0, got {joint}");
}

#[test]
fn interpolatable_quat_zero_is_all_zero() {
    let q = Quat::zero();
    assert!(approx(q.length(), 0.0));
}

// ============================================================================
// AnimationClip: range and playback
// ============================================================================

#[test]
fn clip_range_spans_all_curves() {
    let mut clip = ramp_clip("a");
    let late = Curve::new(
        "late",
        TargetProperty::Influence,
        CurveData::Scalar(scalar_track(&[30.0, 90.0], &[0.0, 1.0])),
        60.0,
    );
    clip.push_curve(TargetedCurve::new(TargetReference::unbound("blink"), late));

    assert!(approx(clip.from(), 0.0));
    assert!(approx(clip.to(), 90.0));
    assert!(approx(clip.duration_seconds(), 1.5));
}

#[test]
fn empty_clip_has_zero_range() {
    let clip = AnimationClip::new("empty", Vec::new());
    assert!(clip.is_empty());
    assert!(approx(clip.duration_frames(), 0.0));
}

#[test]
fn loop_mode_once_stops_at_end() {
    let mut clip = ramp_clip("once");
    clip.loop_mode = LoopMode::Once;
    clip.start();

    assert!(!clip.advance(0.5));
    assert!(approx(clip.current_frame(), 30.0));
    assert!(clip.advance(1.0), "Once clip should report its end");
    assert_eq!(clip.state(), PlaybackState::Stopped);
    assert!(approx(clip.current_frame(), 60.0));
}

#[test]
fn loop_mode_loop_wraps() {
    let mut clip = ramp_clip("loop");
    clip.start();
    clip.advance(1.25);
    let frame = clip.current_frame();
    assert!(approx(frame, 15.0), "Expected 15.0, got {frame}");
    assert!(clip.is_playing());
}

#[test]
fn loop_mode_ping_pong_reflects() {
    let mut clip = ramp_clip("pingpong");
    clip.loop_mode = LoopMode::PingPong;
    clip.start();
    clip.advance(1.25);
    let frame = clip.current_frame();
    assert!(approx(frame, 45.0), "Expected 45.0, got {frame}");
}

#[test]
fn paused_clip_does_not_advance() {
    let mut clip = ramp_clip("paused");
    clip.start();
    clip.advance(0.25);
    clip.pause();
    clip.advance(0.25);
    assert!(approx(clip.current_frame(), 15.0));

    // start() resumes a paused clip where it was
    clip.start();
    clip.advance(0.25);
    assert!(approx(clip.current_frame(), 30.0));
}

#[test]
fn go_to_frame_is_clamped() {
    let mut clip = ramp_clip("scrub");
    clip.go_to_frame(500.0);
    assert!(approx(clip.current_frame(), 60.0));
    clip.go_to_frame(-5.0);
    assert!(approx(clip.current_frame(), 0.0));
}

#[test]
fn speed_ratio_scales_advance() {
    let mut clip = ramp_clip("fast");
    clip.speed_ratio = 2.0;
    clip.start();
    clip.advance(0.25);
    assert!(approx(clip.current_frame(), 30.0));
}

#[test]
fn sample_curve_reads_current_frame() {
    let mut clip = ramp_clip("sample");
    clip.go_to_frame(20.0);
    let Some(signmix::CurveValue::Scalar(value)) = clip.sample_curve(0) else {
        panic!("expected scalar sample");
    };
    assert!(approx(value, 20.0), "Expected 20.0, got {value}");
    assert!(clip.sample_curve(5).is_none());
}

// ============================================================================
// Weight ramp
// ============================================================================

#[test]
fn set_weight_without_blending_is_immediate() {
    let mut clip = ramp_clip("w");
    clip.set_weight(0.4);
    assert!(approx(clip.weight(), 0.4));
}

#[test]
fn enable_blending_ramps_weight_in() {
    let mut clip = ramp_clip("fade");
    clip.enable_blending(0.05);
    assert!(approx(clip.weight(), 0.0));

    clip.start();
    clip.advance(10.0 / 60.0);
    let w = clip.weight();
    assert!((w - 0.5).abs() < 1e-4, "Expected 0.5, got {w}");

    clip.advance(1.0);
    assert!(approx(clip.weight(), 1.0));

    // With blending on, set_weight only moves the target
    clip.set_weight(0.0);
    assert!(approx(clip.weight(), 1.0));
    assert!(approx(clip.target_weight(), 0.0));
}

// ============================================================================
// Clone independence
// ============================================================================

#[test]
fn clones_play_independently() {
    let original = ramp_clip("wave");
    let mut a = original.clone_as("wave_a");
    let b = original.clone_as("wave_b");

    a.start();
    a.go_to_frame(30.0);

    assert!(approx(a.current_frame(), 30.0));
    assert!(approx(b.current_frame(), 0.0));
    assert_eq!(b.state(), PlaybackState::Stopped);
    assert_ne!(a.id(), b.id());
}
