//! glTF Loader Tests
//!
//! Tests for:
//! - Node TRS channels becoming position / rotationQuaternion curves
//! - Key times converted from seconds to frames
//! - Character built from the first skin
//! - Embedded base64 buffers
//! - Load failures for missing files
//! - Full engine path (load, root lock, retarget)

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use glam::{Quat, Vec3};
use serde_json::json;

use signmix::animation::curve::{CurveData, TargetProperty};
use signmix::cache::CacheKey;
use signmix::errors::Error;
use signmix::loader::{ClipSource, GltfClipSource};
use signmix::AnimationEngine;

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn push_floats(bytes: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
}

/// A two-joint rig (`Hips -> Spine`) with one "wave" animation: Spine
/// translation and Hips rotation keyed at 0s and 1s.
fn wave_document() -> String {
    let turn = Quat::from_rotation_y(0.5);
    let mut bytes = Vec::new();
    push_floats(&mut bytes, &[0.0, 1.0]);
    push_floats(&mut bytes, &[0.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
    push_floats(&mut bytes, &[0.0, 0.0, 0.0, 1.0, turn.x, turn.y, turn.z, turn.w]);

    let doc = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "Hips", "children": [1] },
            { "name": "Spine", "translation": [0.0, 1.0, 0.0] }
        ],
        "skins": [{ "joints": [0, 1] }],
        "buffers": [{
            "byteLength": bytes.len(),
            "uri": format!("data:application/octet-stream;base64,{}", BASE64.encode(&bytes))
        }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 8, "byteLength": 24 },
            { "buffer": 0, "byteOffset": 32, "byteLength": 32 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0] },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3" },
            { "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC4" }
        ],
        "animations": [{
            "name": "wave",
            "samplers": [
                { "input": 0, "output": 1, "interpolation": "LINEAR" },
                { "input": 0, "output": 2, "interpolation": "LINEAR" }
            ],
            "channels": [
                { "sampler": 0, "target": { "node": 1, "path": "translation" } },
                { "sampler": 1, "target": { "node": 0, "path": "rotation" } }
            ]
        }]
    });
    doc.to_string()
}

/// Writes the document into a fresh directory and returns that directory.
fn write_fixture() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("signmix-gltf-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(dir.join("signs")).unwrap();
    std::fs::write(dir.join("signs").join("wave.gltf"), wave_document()).unwrap();
    dir
}

fn key() -> CacheKey {
    CacheKey::new("signs", "wave.gltf")
}

// ============================================================================
// Parsing
// ============================================================================

#[tokio::test]
async fn loads_node_channels_as_curves() {
    let root = write_fixture();
    let source = GltfClipSource::new(&root);

    let asset = source.load(&key(), 60.0).await.unwrap();

    assert_eq!(asset.clips.len(), 1);
    let clip = &asset.clips[0];
    assert_eq!(clip.name, "wave");
    assert_eq!(clip.curve_count(), 2);

    let spine = &clip.curves()[0];
    assert_eq!(spine.target.name(), "Spine");
    assert_eq!(spine.curve.property, TargetProperty::Position);
    assert_eq!(spine.curve.data.times(), &[0.0, 60.0]);
    let Some(signmix::CurveValue::Vector3(end)) = spine.curve.sample(60.0) else {
        panic!("expected vector3");
    };
    assert!(end.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), EPSILON), "got {end}");

    let hips = &clip.curves()[1];
    assert_eq!(hips.target.name(), "Hips");
    assert_eq!(hips.curve.property.as_str(), "rotationQuaternion");
    assert!(matches!(hips.curve.data, CurveData::Quaternion(_)));

    assert!(approx(clip.to(), 60.0));
    std::fs::remove_dir_all(root).ok();
}

#[tokio::test]
async fn key_times_follow_frame_rate() {
    let root = write_fixture();
    let asset = GltfClipSource::new(&root).load(&key(), 30.0).await.unwrap();

    assert_eq!(asset.clips[0].curves()[0].curve.data.times(), &[0.0, 30.0]);
    std::fs::remove_dir_all(root).ok();
}

#[tokio::test]
async fn builds_character_from_skin() {
    let root = write_fixture();
    let asset = GltfClipSource::new(&root).load(&key(), 60.0).await.unwrap();

    let character = asset.character.expect("skinned file should yield a character");
    assert_eq!(character.name, "wave");
    assert_eq!(character.joint_count(), 2);
    let spine = character.find_joint_by_name("Spine").unwrap();
    let node = character.joint(spine).unwrap().transform;
    let rest = character.node(node).unwrap().transform.position;
    assert!(approx(rest.y, 1.0));
    std::fs::remove_dir_all(root).ok();
}

#[tokio::test]
async fn missing_file_is_a_load_failure() {
    let source = GltfClipSource::new(std::env::temp_dir().join("signmix-does-not-exist"));
    let result = source.load(&key(), 60.0).await;
    assert!(matches!(result, Err(Error::LoadFailure { .. })));
}

#[tokio::test]
async fn malformed_json_is_a_load_failure() {
    let dir = std::env::temp_dir().join(format!("signmix-gltf-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("broken.gltf"), "{ not json").unwrap();

    let result = GltfClipSource::new(&dir).load(&CacheKey::new("", "broken.gltf"), 60.0).await;

    assert!(matches!(result, Err(Error::LoadFailure { .. })));
    std::fs::remove_dir_all(dir).ok();
}

// ============================================================================
// Engine path
// ============================================================================

#[tokio::test]
async fn engine_loads_locks_and_retargets() {
    let root = write_fixture();
    let source = GltfClipSource::new(&root);
    let character = source.load(&key(), 60.0).await.unwrap().character.unwrap();
    let engine = AnimationEngine::new(source);

    let clip = engine
        .load_retargeted("signs", "wave.gltf", &character, "wave_self")
        .await
        .unwrap();

    assert_eq!(clip.curve_count(), 2);
    let hips = clip
        .curves()
        .iter()
        .find(|tc| tc.target.name() == "Hips")
        .unwrap();
    let CurveData::Quaternion(track) = &hips.curve.data else {
        panic!("expected quaternion curve");
    };
    let locked = engine.config().root_lock.rotation;
    assert!(track.values.iter().all(|q| q.abs_diff_eq(locked, EPSILON)));
    std::fs::remove_dir_all(root).ok();
}
