//! glTF / GLB clip loader.
//!
//! Node TRS channels become `position` / `rotationQuaternion` / `scaling`
//! curves targeting the node name. Morph weight channels are split into one
//! scalar `influence` curve per morph target, named from the mesh's
//! `extras.targetNames` or `morphTarget<i>` when the file has no names.
//! Key times are converted from seconds to frames.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use glam::{Quat, Vec3};
use serde::Deserialize;

use crate::animation::clip::{AnimationClip, TargetReference, TargetedCurve};
use crate::animation::curve::{Curve, CurveData, TargetProperty};
use crate::animation::tracks::{InterpolationMode, KeyframeTrack};
use crate::cache::CacheKey;
use crate::character::{Character, NodeKey, Transform};
use crate::errors::{Error, Result};
use crate::loader::{ClipSource, LoadedAsset};

/// Reads `.glb` / `.gltf` files below a root directory.
pub struct GltfClipSource {
    root_path: PathBuf,
}

impl GltfClipSource {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            root_path: path.as_ref().to_path_buf(),
        }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

impl ClipSource for GltfClipSource {
    async fn load(&self, key: &CacheKey, frame_rate: f32) -> Result<LoadedAsset> {
        let dir = self.root_path.join(&key.directory);
        let path = dir.join(&key.filename);
        log::info!("Loading clips from '{}'", path.display());

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::load_failure(key.to_string(), e))?;
        let gltf = gltf::Gltf::from_slice(&bytes).map_err(|e| Error::load_failure(key.to_string(), e))?;
        let buffers = load_buffers(&gltf, &dir)
            .await
            .map_err(|e| Error::load_failure(key.to_string(), e))?;

        let asset = parse_document(&gltf, &buffers, key.stem(), frame_rate);
        if asset.clips.is_empty() {
            return Err(Error::load_failure(key.to_string(), "file contains no animation clips"));
        }
        log::info!(
            "Loaded {} clips from '{key}' ({} joints)",
            asset.clips.len(),
            asset.character.as_ref().map_or(0, Character::joint_count)
        );
        Ok(asset)
    }
}

async fn load_buffers(gltf: &gltf::Gltf, base_path: &Path) -> Result<Vec<Vec<u8>>> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf
                .blob
                .clone()
                .ok_or_else(|| Error::Gltf("missing binary chunk".to_string()))?,
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => decode_data_uri(uri)?,
            gltf::buffer::Source::Uri(uri) => tokio::fs::read(base_path.join(uri)).await?,
        };
        buffer_data.push(data);
    }
    Ok(buffer_data)
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| Error::DataUri("missing ',' separator".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(Error::DataUri(format!("unsupported encoding in '{header}'")));
    }
    Ok(BASE64.decode(payload)?)
}

#[derive(Deserialize, Default)]
struct MeshExtras {
    #[serde(rename = "targetNames", default)]
    target_names: Vec<String>,
}

fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map_or_else(|| format!("Node_{}", node.index()), str::to_string)
}

/// Morph target names of a mesh, falling back to `morphTarget<i>`.
fn morph_target_names(mesh: &gltf::Mesh) -> Vec<String> {
    let count = mesh
        .primitives()
        .map(|p| p.morph_targets().count())
        .max()
        .unwrap_or(0);
    let named: Vec<String> = mesh
        .extras()
        .as_ref()
        .and_then(|raw| serde_json::from_str::<MeshExtras>(raw.get()).ok())
        .map(|extras| extras.target_names)
        .unwrap_or_default();

    (0..count)
        .map(|i| named.get(i).cloned().unwrap_or_else(|| format!("morphTarget{i}")))
        .collect()
}

/// Builds the clips and character of an already parsed document.
fn parse_document(gltf: &gltf::Gltf, buffers: &[Vec<u8>], name: &str, frame_rate: f32) -> LoadedAsset {
    let character = build_character(gltf, name);
    let clips = gltf
        .animations()
        .filter_map(|anim| {
            let clip_name = anim
                .name()
                .map_or_else(|| format!("anim_{}", anim.index()), str::to_string);
            let curves = load_channels(&anim, buffers, frame_rate);
            if curves.is_empty() {
                log::warn!("Animation '{clip_name}' has no usable channels");
                return None;
            }
            Some(AnimationClip::new(clip_name, curves))
        })
        .collect();

    LoadedAsset {
        clips,
        character: Some(character).filter(|c| c.has_skeleton() || c.meshes().next().is_some()),
    }
}

fn build_character(gltf: &gltf::Gltf, name: &str) -> Character {
    let mut character = Character::new(name);

    let node_keys: Vec<NodeKey> = gltf
        .nodes()
        .map(|node| {
            let (t, r, s) = node.transform().decomposed();
            let transform = Transform {
                position: Vec3::from_array(t),
                rotation: Quat::from_array(r),
                scale: Vec3::from_array(s),
            };
            character.add_node(node_name(&node), transform)
        })
        .collect();

    if let Some(skin) = gltf.skins().next() {
        for joint in skin.joints() {
            character.add_joint_for_node(node_name(&joint), node_keys[joint.index()]);
        }
    }

    for node in gltf.nodes() {
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let mesh_key = character.add_mesh(node_name(&node));
        let initial = mesh.weights().unwrap_or(&[]);
        for (i, target_name) in morph_target_names(&mesh).into_iter().enumerate() {
            if let Some(key) = character.add_morph_target(mesh_key, target_name)
                && let (Some(target), Some(&w)) = (character.morph_target_mut(key), initial.get(i))
            {
                target.influence = w;
            }
        }
    }

    character
}

fn load_channels(anim: &gltf::Animation, buffers: &[Vec<u8>], frame_rate: f32) -> Vec<TargetedCurve> {
    let mut curves = Vec::new();

    for channel in anim.channels() {
        let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
        let target = channel.target();
        let node = target.node();
        let name = node_name(&node);

        let Some(inputs) = reader.read_inputs() else {
            log::warn!("Channel on '{name}' has no key times");
            continue;
        };
        let times: Vec<f32> = inputs.map(|t| t * frame_rate).collect();

        let interpolation = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Linear => InterpolationMode::Linear,
            gltf::animation::Interpolation::Step => InterpolationMode::Step,
            gltf::animation::Interpolation::CubicSpline => InterpolationMode::CubicSpline,
        };

        let Some(outputs) = reader.read_outputs() else {
            log::warn!("Channel on '{name}' has no key values");
            continue;
        };

        let built = match outputs {
            gltf::animation::util::ReadOutputs::Translations(iter) => {
                let values: Vec<Vec3> = iter.map(Vec3::from_array).collect();
                KeyframeTrack::try_new(times, values, interpolation).map(|t| {
                    vec![node_curve(&name, TargetProperty::Position, CurveData::Vector3(t), frame_rate)]
                })
            }
            gltf::animation::util::ReadOutputs::Rotations(rotations) => {
                let values: Vec<Quat> = rotations.into_f32().map(Quat::from_array).collect();
                KeyframeTrack::try_new(times, values, interpolation).map(|t| {
                    vec![node_curve(&name, TargetProperty::Rotation, CurveData::Quaternion(t), frame_rate)]
                })
            }
            gltf::animation::util::ReadOutputs::Scales(iter) => {
                let values: Vec<Vec3> = iter.map(Vec3::from_array).collect();
                KeyframeTrack::try_new(times, values, interpolation).map(|t| {
                    vec![node_curve(&name, TargetProperty::Scaling, CurveData::Vector3(t), frame_rate)]
                })
            }
            gltf::animation::util::ReadOutputs::MorphTargetWeights(weights) => {
                let names = node.mesh().map(|m| morph_target_names(&m)).unwrap_or_default();
                let flat: Vec<f32> = weights.into_f32().collect();
                split_morph_weights(&names, &times, &flat, interpolation, frame_rate)
            }
        };

        match built {
            Ok(built) => curves.extend(built),
            Err(e) => log::warn!("Skipping channel on '{name}': {e}"),
        }
    }

    curves
}

fn node_curve(name: &str, property: TargetProperty, data: CurveData, frame_rate: f32) -> TargetedCurve {
    let curve = Curve::new(format!("{name}.{property}"), property, data, frame_rate);
    TargetedCurve::new(TargetReference::unbound(name), curve)
}

/// Splits a flat weights accessor into one influence curve per morph target.
///
/// Layout per key is `[w0..wn]`, or for cubic splines
/// `[in0..inn, w0..wn, out0..outn]`.
fn split_morph_weights(
    names: &[String],
    times: &[f32],
    flat: &[f32],
    interpolation: InterpolationMode,
    frame_rate: f32,
) -> Result<Vec<TargetedCurve>> {
    let parts = if interpolation == InterpolationMode::CubicSpline { 3 } else { 1 };
    let stride = times.len() * parts;
    if stride == 0 || flat.len() % stride != 0 {
        return Err(Error::InvalidKeyframes(format!(
            "{} weights do not divide into {} keys",
            flat.len(),
            times.len()
        )));
    }
    let target_count = flat.len() / stride;

    (0..target_count)
        .map(|i| {
            let values: Vec<f32> = (0..stride).map(|k| flat[k * target_count + i]).collect();
            let track = KeyframeTrack::try_new(times.to_vec(), values, interpolation)?;
            let name = names.get(i).cloned().unwrap_or_else(|| format!("morphTarget{i}"));
            let curve = Curve::new(
                format!("{name}.influence"),
                TargetProperty::Influence,
                CurveData::Scalar(track),
                frame_rate,
            );
            Ok(TargetedCurve::new(TargetReference::unbound(name), curve))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morph_weights_split_per_target() {
        let names = vec!["smile".to_string(), "blink".to_string()];
        let flat = [0.0, 1.0, 0.5, 0.25];
        let curves = split_morph_weights(&names, &[0.0, 60.0], &flat, InterpolationMode::Linear, 60.0).unwrap();
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[1].target.name(), "blink");
        let CurveData::Scalar(track) = &curves[1].curve.data else {
            panic!("expected scalar curve");
        };
        assert_eq!(track.values, vec![1.0, 0.25]);
    }

    #[test]
    fn data_uri_requires_base64() {
        assert!(decode_data_uri("data:application/octet-stream;base64,AAAA").is_ok());
        assert!(matches!(decode_data_uri("data:text/plain,abc"), Err(Error::DataUri(_))));
    }
}
