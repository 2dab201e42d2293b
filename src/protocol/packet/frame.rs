//! FRAMEOFDATA records and their version-gated codec.
//!
//! Frame payloads arrive over lossy UDP and may be truncated or
//! corrupted, so every decoder here is tolerant: it consumes from a
//! shared cursor, stops at the first shortfall, and returns whatever
//! was decoded up to that point. Counts that are negative or above
//! [`MAX_MARKERS_PER_SET`] abandon the remainder of the payload so a
//! corrupt field can never drive an allocation.
//!
//! Which fields exist in each record is strictly a function of the
//! negotiated version; see [`ProtocolVersion`] for the gate matrix.
//! Encoders mirror the decoders' gating and exist mainly for tests
//! and benchmarks, but also make the layout rules explicit in both
//! directions.

use bytes::{Buf, BufMut, Bytes};

use crate::protocol::{
    constants::{FrameParams, MAX_MARKERS_PER_SET, RigidBodyParams},
    packet::DecodeError,
    version::ProtocolVersion,
    wire::{NatnetEncodable, Quat, Vec3, put_cstring, read_cstring},
};

/// Frame sequence header: the 4-byte frame number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FramePrefix {
    pub frame_number: i32,
}

/// A named group of raw marker positions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkerSet {
    pub model_name: String,
    pub positions: Vec<Vec3>,
}

/// The pre-3.0 "other markers" block of unlabeled positions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LegacyMarkers {
    pub positions: Vec<Vec3>,
}

/// Constituent marker of a legacy (major < 3) rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyMarker {
    pub position: Vec3,
    pub id: Option<i32>,
    pub size: Option<f32>,
}

/// One tracked rigid body within a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub id: i32,
    pub position: Vec3,
    /// Orientation quaternion in wire order (x, y, z, w).
    pub orientation: Quat,
    /// Inline marker sub-block; populated only pre-3.0.
    pub markers: Vec<RigidBodyMarker>,
    /// Mean marker error, present from 2.0 when bytes remain.
    pub mean_error: Option<f32>,
    /// Bit 0 of the trailing param field; defaults to true when the
    /// field is absent.
    pub tracking_valid: bool,
}

/// A hierarchy of rigid bodies sharing one skeleton id.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub id: i32,
    pub rigid_bodies: Vec<RigidBody>,
}

/// An individually identified marker (2.4 and later).
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMarker {
    /// Composite id: model id in the high 16 bits, marker id in the low.
    pub id: i32,
    pub position: Vec3,
    pub size: f32,
    pub params: i16,
    /// Fit residual in millimeters (3.0+, zero before).
    pub residual_mm: f32,
}

impl LabeledMarker {
    pub fn model_id(&self) -> i32 {
        self.id >> 16
    }

    pub fn marker_id(&self) -> i32 {
        self.id & 0xFFFF
    }
}

/// Ordered per-channel sample sequences of an analog source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalogChannel {
    pub samples: Vec<f32>,
}

/// Force-plate analog channel samples (2.9+).
#[derive(Debug, Clone, PartialEq)]
pub struct ForcePlate {
    pub id: i32,
    pub channels: Vec<AnalogChannel>,
}

/// Generic analog device channel samples (2.11+).
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: i32,
    pub channels: Vec<AnalogChannel>,
}

/// Frame trailer metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameSuffix {
    pub timecode: i32,
    pub timecode_sub: i32,
    /// Seconds; f32 on the wire before 2.7, f64 after.
    pub timestamp: f64,
    pub stamp_camera_mid_exposure: i64,
    pub stamp_data_received: i64,
    pub stamp_transmit: i64,
    pub precision_timestamp_secs: i32,
    pub precision_timestamp_frac: i32,
    pub params: FrameParams,
}

impl FrameSuffix {
    pub fn is_recording(&self) -> bool {
        self.params.contains(FrameParams::RECORDING)
    }

    pub fn tracked_models_changed(&self) -> bool {
        self.params.contains(FrameParams::TRACKED_MODELS_CHANGED)
    }
}

/// Aggregate of one decoded FRAMEOFDATA payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoCapFrame {
    pub prefix: FramePrefix,
    pub marker_sets: Vec<MarkerSet>,
    pub legacy_markers: LegacyMarkers,
    pub rigid_bodies: Vec<RigidBody>,
    pub skeletons: Vec<Skeleton>,
    pub labeled_markers: Vec<LabeledMarker>,
    pub force_plates: Vec<ForcePlate>,
    pub devices: Vec<Device>,
    pub suffix: FrameSuffix,
}

fn read_count(src: &mut Bytes) -> Option<i32> {
    if src.remaining() < 4 {
        return None;
    }
    Some(src.get_i32_le())
}

/// Validates a corruption-prone count field. On failure the cursor is
/// drained so the caller abandons the remainder of the payload.
fn checked_count(src: &mut Bytes, count: i32) -> Result<usize, DecodeError> {
    if !(0..=MAX_MARKERS_PER_SET).contains(&count) {
        tracing::debug!(count, "malformed count field, abandoning payload");
        let len = src.remaining();
        src.advance(len);
        return Err(DecodeError::MalformedCount(count));
    }
    Ok(count as usize)
}

fn drain(src: &mut Bytes) {
    let len = src.remaining();
    src.advance(len);
}

/// 4.1+ prefixes several blocks with an unpacked-size field the
/// decoder does not need; skip it when present.
fn skip_size_prefix(src: &mut Bytes, version: ProtocolVersion) {
    if version.has_packed_size_prefix() && src.remaining() >= 4 {
        let _ = src.get_i32_le();
    }
}

fn put_size_prefix(dst: &mut impl BufMut, version: ProtocolVersion) {
    if version.has_packed_size_prefix() {
        dst.put_i32_le(0);
    }
}

impl FramePrefix {
    pub fn decode(src: &mut Bytes) -> Self {
        Self {
            frame_number: read_count(src).unwrap_or_default(),
        }
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_i32_le(self.frame_number);
    }
}

fn decode_marker_sets(src: &mut Bytes, version: ProtocolVersion) -> Vec<MarkerSet> {
    let mut sets = Vec::new();
    let Some(set_count) = read_count(src) else {
        return sets;
    };
    skip_size_prefix(src, version);
    for _ in 0..set_count.max(0) {
        let Ok(model_name) = read_cstring(src) else {
            drain(src);
            return sets;
        };
        let Some(raw_count) = read_count(src) else {
            return sets;
        };
        let Ok(marker_count) = checked_count(src, raw_count) else {
            return sets;
        };
        let mut positions = Vec::with_capacity(marker_count);
        for _ in 0..marker_count {
            if src.remaining() < 12 {
                drain(src);
                return sets;
            }
            positions.push([src.get_f32_le(), src.get_f32_le(), src.get_f32_le()]);
        }
        sets.push(MarkerSet {
            model_name,
            positions,
        });
    }
    sets
}

fn encode_marker_sets(sets: &[MarkerSet], dst: &mut impl BufMut, version: ProtocolVersion) {
    dst.put_i32_le(sets.len() as i32);
    put_size_prefix(dst, version);
    for set in sets {
        put_cstring(&set.model_name, dst);
        dst.put_i32_le(set.positions.len() as i32);
        for pos in &set.positions {
            pos.encode_natnet(dst);
        }
    }
}

impl LegacyMarkers {
    pub fn decode(src: &mut Bytes, version: ProtocolVersion) -> Self {
        let mut markers = Self::default();
        let Some(raw_count) = read_count(src) else {
            return markers;
        };
        skip_size_prefix(src, version);
        let Ok(count) = checked_count(src, raw_count) else {
            return markers;
        };
        for _ in 0..count {
            if src.remaining() < 12 {
                break;
            }
            markers
                .positions
                .push([src.get_f32_le(), src.get_f32_le(), src.get_f32_le()]);
        }
        markers
    }

    pub fn encode(&self, dst: &mut impl BufMut, version: ProtocolVersion) {
        dst.put_i32_le(self.positions.len() as i32);
        put_size_prefix(dst, version);
        for pos in &self.positions {
            pos.encode_natnet(dst);
        }
    }
}

impl RigidBody {
    /// Decodes one rigid body, or `None` if even the fixed-size head
    /// (id, position, orientation) is incomplete.
    pub fn decode(src: &mut Bytes, version: ProtocolVersion) -> Option<Self> {
        if src.remaining() < 4 {
            return None;
        }
        let id = src.get_i32_le();
        if src.remaining() < 12 {
            return None;
        }
        let position = [src.get_f32_le(), src.get_f32_le(), src.get_f32_le()];
        if src.remaining() < 16 {
            return None;
        }
        let orientation = [
            src.get_f32_le(),
            src.get_f32_le(),
            src.get_f32_le(),
            src.get_f32_le(),
        ];

        let mut body = RigidBody {
            id,
            position,
            orientation,
            markers: Vec::new(),
            mean_error: None,
            tracking_valid: true,
        };

        if version.has_legacy_rigid_body_markers() {
            let Some(raw_count) = read_count(src) else {
                return Some(body);
            };
            let Ok(marker_count) = checked_count(src, raw_count) else {
                return Some(body);
            };
            for _ in 0..marker_count {
                if src.remaining() < 12 {
                    break;
                }
                body.markers.push(RigidBodyMarker {
                    position: [src.get_f32_le(), src.get_f32_le(), src.get_f32_le()],
                    id: None,
                    size: None,
                });
            }
            if version.has_legacy_marker_ids() {
                for i in 0..body.markers.len() {
                    if src.remaining() < 4 {
                        break;
                    }
                    body.markers[i].id = Some(src.get_i32_le());
                }
                for i in 0..body.markers.len() {
                    if src.remaining() < 4 {
                        break;
                    }
                    body.markers[i].size = Some(src.get_f32_le());
                }
            }
        }

        if version.has_mean_error() && src.remaining() >= 4 {
            body.mean_error = Some(src.get_f32_le());
        }

        if version.has_marker_params() && src.remaining() >= 2 {
            let params = RigidBodyParams::from_bits_retain(src.get_i16_le());
            body.tracking_valid = params.contains(RigidBodyParams::TRACKING_VALID);
        }

        Some(body)
    }

    pub fn encode(&self, dst: &mut impl BufMut, version: ProtocolVersion) {
        dst.put_i32_le(self.id);
        self.position.encode_natnet(dst);
        self.orientation.encode_natnet(dst);

        if version.has_legacy_rigid_body_markers() {
            dst.put_i32_le(self.markers.len() as i32);
            for marker in &self.markers {
                marker.position.encode_natnet(dst);
            }
            if version.has_legacy_marker_ids() {
                for marker in &self.markers {
                    dst.put_i32_le(marker.id.unwrap_or(0));
                }
                for marker in &self.markers {
                    dst.put_f32_le(marker.size.unwrap_or(0.0));
                }
            }
        }

        if version.has_mean_error() {
            dst.put_f32_le(self.mean_error.unwrap_or(0.0));
        }

        if version.has_marker_params() {
            let mut params = RigidBodyParams::empty();
            if self.tracking_valid {
                params |= RigidBodyParams::TRACKING_VALID;
            }
            dst.put_i16_le(params.bits());
        }
    }
}

impl Skeleton {
    pub fn decode(src: &mut Bytes, version: ProtocolVersion) -> Option<Self> {
        if src.remaining() < 8 {
            return None;
        }
        let id = src.get_i32_le();
        let body_count = src.get_i32_le();
        let mut rigid_bodies = Vec::new();
        for _ in 0..body_count.max(0) {
            match RigidBody::decode(src, version) {
                Some(body) => rigid_bodies.push(body),
                None => break,
            }
        }
        Some(Skeleton { id, rigid_bodies })
    }

    pub fn encode(&self, dst: &mut impl BufMut, version: ProtocolVersion) {
        dst.put_i32_le(self.id);
        dst.put_i32_le(self.rigid_bodies.len() as i32);
        for body in &self.rigid_bodies {
            body.encode(dst, version);
        }
    }
}

fn decode_rigid_bodies(src: &mut Bytes, version: ProtocolVersion) -> Vec<RigidBody> {
    let mut bodies = Vec::new();
    let Some(count) = read_count(src) else {
        return bodies;
    };
    skip_size_prefix(src, version);
    for _ in 0..count.max(0) {
        match RigidBody::decode(src, version) {
            Some(body) => bodies.push(body),
            None => break,
        }
    }
    bodies
}

fn encode_rigid_bodies(bodies: &[RigidBody], dst: &mut impl BufMut, version: ProtocolVersion) {
    dst.put_i32_le(bodies.len() as i32);
    put_size_prefix(dst, version);
    for body in bodies {
        body.encode(dst, version);
    }
}

fn decode_skeletons(src: &mut Bytes, version: ProtocolVersion) -> Vec<Skeleton> {
    let mut skeletons = Vec::new();
    if !version.has_skeletons() {
        return skeletons;
    }
    let Some(count) = read_count(src) else {
        return skeletons;
    };
    skip_size_prefix(src, version);
    for _ in 0..count.max(0) {
        match Skeleton::decode(src, version) {
            Some(skeleton) => skeletons.push(skeleton),
            None => break,
        }
    }
    skeletons
}

fn encode_skeletons(skeletons: &[Skeleton], dst: &mut impl BufMut, version: ProtocolVersion) {
    if !version.has_skeletons() {
        return;
    }
    dst.put_i32_le(skeletons.len() as i32);
    put_size_prefix(dst, version);
    for skeleton in skeletons {
        skeleton.encode(dst, version);
    }
}

fn decode_labeled_markers(src: &mut Bytes, version: ProtocolVersion) -> Vec<LabeledMarker> {
    let mut markers = Vec::new();
    if !version.has_labeled_markers() {
        return markers;
    }
    let Some(count) = read_count(src) else {
        return markers;
    };
    skip_size_prefix(src, version);
    for _ in 0..count.max(0) {
        // id + position + size
        if src.remaining() < 20 {
            break;
        }
        let id = src.get_i32_le();
        let position = [src.get_f32_le(), src.get_f32_le(), src.get_f32_le()];
        let size = src.get_f32_le();
        let mut params = 0i16;
        if version.has_marker_params() {
            if src.remaining() < 2 {
                break;
            }
            params = src.get_i16_le();
        }
        let mut residual_mm = 0.0;
        if version.has_marker_residual() {
            if src.remaining() < 4 {
                break;
            }
            residual_mm = src.get_f32_le() * 1000.0;
        }
        markers.push(LabeledMarker {
            id,
            position,
            size,
            params,
            residual_mm,
        });
    }
    markers
}

fn encode_labeled_markers(
    markers: &[LabeledMarker],
    dst: &mut impl BufMut,
    version: ProtocolVersion,
) {
    if !version.has_labeled_markers() {
        return;
    }
    dst.put_i32_le(markers.len() as i32);
    put_size_prefix(dst, version);
    for marker in markers {
        dst.put_i32_le(marker.id);
        marker.position.encode_natnet(dst);
        dst.put_f32_le(marker.size);
        if version.has_marker_params() {
            dst.put_i16_le(marker.params);
        }
        if version.has_marker_residual() {
            dst.put_f32_le(marker.residual_mm / 1000.0);
        }
    }
}

/// Decodes the shared `id, channel count, per-channel sample runs`
/// layout used by force plates and devices.
fn decode_channel_bank(src: &mut Bytes) -> Option<(i32, Vec<AnalogChannel>)> {
    if src.remaining() < 8 {
        return None;
    }
    let id = src.get_i32_le();
    let channel_count = src.get_i32_le();
    let mut channels = Vec::new();
    for _ in 0..channel_count.max(0) {
        if src.remaining() < 4 {
            break;
        }
        let sample_count = src.get_i32_le();
        let mut samples = Vec::new();
        for _ in 0..sample_count.max(0) {
            if src.remaining() < 4 {
                break;
            }
            samples.push(src.get_f32_le());
        }
        channels.push(AnalogChannel { samples });
    }
    Some((id, channels))
}

fn encode_channel_bank(id: i32, channels: &[AnalogChannel], dst: &mut impl BufMut) {
    dst.put_i32_le(id);
    dst.put_i32_le(channels.len() as i32);
    for channel in channels {
        dst.put_i32_le(channel.samples.len() as i32);
        for sample in &channel.samples {
            dst.put_f32_le(*sample);
        }
    }
}

fn decode_force_plates(src: &mut Bytes, version: ProtocolVersion) -> Vec<ForcePlate> {
    let mut plates = Vec::new();
    if !version.has_force_plates() {
        return plates;
    }
    let Some(count) = read_count(src) else {
        return plates;
    };
    // An empty block ends right after the count, without a size field.
    if count <= 0 {
        return plates;
    }
    skip_size_prefix(src, version);
    for _ in 0..count {
        let Some((id, channels)) = decode_channel_bank(src) else {
            break;
        };
        plates.push(ForcePlate { id, channels });
    }
    plates
}

fn encode_force_plates(plates: &[ForcePlate], dst: &mut impl BufMut, version: ProtocolVersion) {
    if !version.has_force_plates() {
        return;
    }
    dst.put_i32_le(plates.len() as i32);
    if plates.is_empty() {
        return;
    }
    put_size_prefix(dst, version);
    for plate in plates {
        encode_channel_bank(plate.id, &plate.channels, dst);
    }
}

fn decode_devices(src: &mut Bytes, version: ProtocolVersion) -> Vec<Device> {
    let mut devices = Vec::new();
    if !version.has_devices() {
        return devices;
    }
    let Some(count) = read_count(src) else {
        return devices;
    };
    skip_size_prefix(src, version);
    for _ in 0..count.max(0) {
        let Some((id, channels)) = decode_channel_bank(src) else {
            break;
        };
        devices.push(Device { id, channels });
    }
    devices
}

fn encode_devices(devices: &[Device], dst: &mut impl BufMut, version: ProtocolVersion) {
    if !version.has_devices() {
        return;
    }
    dst.put_i32_le(devices.len() as i32);
    put_size_prefix(dst, version);
    for device in devices {
        encode_channel_bank(device.id, &device.channels, dst);
    }
}

impl FrameSuffix {
    pub fn decode(src: &mut Bytes, version: ProtocolVersion) -> Self {
        let mut suffix = Self::default();
        let Some(timecode) = read_count(src) else {
            return suffix;
        };
        suffix.timecode = timecode;
        let Some(timecode_sub) = read_count(src) else {
            return suffix;
        };
        suffix.timecode_sub = timecode_sub;

        // Old servers end the payload after the timecode fields.
        if !src.has_remaining() {
            return suffix;
        }

        if version.has_double_timestamp() {
            if src.remaining() < 8 {
                return suffix;
            }
            suffix.timestamp = src.get_f64_le();
        } else {
            if src.remaining() < 4 {
                return suffix;
            }
            suffix.timestamp = src.get_f32_le() as f64;
        }

        if version.has_high_res_stamps() {
            if src.remaining() < 8 {
                return suffix;
            }
            suffix.stamp_camera_mid_exposure = src.get_i64_le();
            if src.remaining() < 8 {
                return suffix;
            }
            suffix.stamp_data_received = src.get_i64_le();
            if src.remaining() < 8 {
                return suffix;
            }
            suffix.stamp_transmit = src.get_i64_le();
        }

        if version.has_precision_timestamp() {
            let Some(secs) = read_count(src) else {
                return suffix;
            };
            suffix.precision_timestamp_secs = secs;
            let Some(frac) = read_count(src) else {
                return suffix;
            };
            suffix.precision_timestamp_frac = frac;
        }

        if src.remaining() >= 2 {
            suffix.params = FrameParams::from_bits_retain(src.get_i16_le());
        }
        suffix
    }

    pub fn encode(&self, dst: &mut impl BufMut, version: ProtocolVersion) {
        dst.put_i32_le(self.timecode);
        dst.put_i32_le(self.timecode_sub);
        if version.has_double_timestamp() {
            dst.put_f64_le(self.timestamp);
        } else {
            dst.put_f32_le(self.timestamp as f32);
        }
        if version.has_high_res_stamps() {
            dst.put_i64_le(self.stamp_camera_mid_exposure);
            dst.put_i64_le(self.stamp_data_received);
            dst.put_i64_le(self.stamp_transmit);
        }
        if version.has_precision_timestamp() {
            dst.put_i32_le(self.precision_timestamp_secs);
            dst.put_i32_le(self.precision_timestamp_frac);
        }
        dst.put_i16_le(self.params.bits());
    }
}

impl MoCapFrame {
    /// Decodes a full FRAMEOFDATA payload under the given version.
    ///
    /// Never fails: corrupt or truncated payloads yield a partial
    /// frame with whatever records decoded cleanly.
    pub fn decode(mut payload: Bytes, version: ProtocolVersion) -> Self {
        let src = &mut payload;
        let prefix = FramePrefix::decode(src);
        let marker_sets = decode_marker_sets(src, version);
        let legacy_markers = LegacyMarkers::decode(src, version);
        let rigid_bodies = decode_rigid_bodies(src, version);
        let skeletons = decode_skeletons(src, version);
        let labeled_markers = decode_labeled_markers(src, version);
        let force_plates = decode_force_plates(src, version);
        let devices = decode_devices(src, version);
        let suffix = FrameSuffix::decode(src, version);
        MoCapFrame {
            prefix,
            marker_sets,
            legacy_markers,
            rigid_bodies,
            skeletons,
            labeled_markers,
            force_plates,
            devices,
            suffix,
        }
    }

    /// Encodes this frame under the given version's layout rules.
    pub fn encode(&self, dst: &mut impl BufMut, version: ProtocolVersion) {
        self.prefix.encode(dst);
        encode_marker_sets(&self.marker_sets, dst, version);
        self.legacy_markers.encode(dst, version);
        encode_rigid_bodies(&self.rigid_bodies, dst, version);
        encode_skeletons(&self.skeletons, dst, version);
        encode_labeled_markers(&self.labeled_markers, dst, version);
        encode_force_plates(&self.force_plates, dst, version);
        encode_devices(&self.devices, dst, version);
        self.suffix.encode(dst, version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn body(id: i32) -> RigidBody {
        RigidBody {
            id,
            position: [1.0, 2.0, 3.0],
            orientation: [0.0, 0.0, 0.0, 1.0],
            markers: Vec::new(),
            mean_error: Some(0.002),
            tracking_valid: true,
        }
    }

    fn sample_frame(version: ProtocolVersion) -> MoCapFrame {
        let mut frame = MoCapFrame {
            prefix: FramePrefix { frame_number: 4821 },
            marker_sets: vec![MarkerSet {
                model_name: "drone".into(),
                positions: vec![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]],
            }],
            legacy_markers: LegacyMarkers {
                positions: vec![[9.0, 8.0, 7.0]],
            },
            rigid_bodies: vec![body(1), body(2)],
            ..MoCapFrame::default()
        };
        if version.has_legacy_rigid_body_markers() {
            for rb in &mut frame.rigid_bodies {
                rb.markers = vec![RigidBodyMarker {
                    position: [0.5, 0.5, 0.5],
                    id: Some(11),
                    size: Some(0.014),
                }];
            }
        }
        if version.has_skeletons() {
            frame.skeletons = vec![Skeleton {
                id: 9,
                rigid_bodies: vec![{
                    let mut rb = body(901);
                    if version.has_legacy_rigid_body_markers() {
                        rb.markers = vec![RigidBodyMarker {
                            position: [0.0, 1.0, 0.0],
                            id: Some(3),
                            size: Some(0.01),
                        }];
                    }
                    rb
                }],
            }];
        }
        if version.has_labeled_markers() {
            frame.labeled_markers = vec![LabeledMarker {
                id: 0x0001_0005,
                position: [1.5, 2.5, 3.5],
                size: 0.012,
                params: if version.has_marker_params() { 1 } else { 0 },
                residual_mm: if version.has_marker_residual() {
                    0.25
                } else {
                    0.0
                },
            }];
        }
        if version.has_force_plates() {
            frame.force_plates = vec![ForcePlate {
                id: 1,
                channels: vec![AnalogChannel {
                    samples: vec![1.0, 2.0, 3.0],
                }],
            }];
        }
        if version.has_devices() {
            frame.devices = vec![Device {
                id: 7,
                channels: vec![AnalogChannel {
                    samples: vec![0.5],
                }],
            }];
        }
        frame.suffix = FrameSuffix {
            timecode: 33,
            timecode_sub: 2,
            timestamp: 120.5,
            stamp_camera_mid_exposure: if version.has_high_res_stamps() { 111 } else { 0 },
            stamp_data_received: if version.has_high_res_stamps() { 222 } else { 0 },
            stamp_transmit: if version.has_high_res_stamps() { 333 } else { 0 },
            precision_timestamp_secs: if version.has_precision_timestamp() { 17 } else { 0 },
            precision_timestamp_frac: if version.has_precision_timestamp() { 42 } else { 0 },
            params: FrameParams::RECORDING,
        };
        frame
    }

    fn encode_frame(frame: &MoCapFrame, version: ProtocolVersion) -> Bytes {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf, version);
        buf.freeze()
    }

    #[test]
    fn frame_roundtrips_across_version_matrix() {
        for (major, minor) in [
            (2u8, 0u8),
            (2, 5),
            (2, 6),
            (2, 7),
            (2, 9),
            (2, 11),
            (3, 0),
            (3, 1),
            (4, 0),
            (4, 1),
        ] {
            let version = ProtocolVersion::new(major, minor, 0, 0);
            let frame = sample_frame(version);
            let decoded = MoCapFrame::decode(encode_frame(&frame, version), version);
            assert_eq!(decoded, frame, "roundtrip mismatch at {version}");
        }
    }

    #[test]
    fn truncated_payloads_never_panic() {
        for version in [
            ProtocolVersion::new(2, 5, 0, 0),
            ProtocolVersion::new(3, 1, 0, 0),
            ProtocolVersion::new(4, 1, 0, 0),
        ] {
            let encoded = encode_frame(&sample_frame(version), version);
            for cut in 0..encoded.len() {
                let truncated = encoded.slice(..cut);
                // Must produce some partial frame without reading out
                // of bounds.
                let _ = MoCapFrame::decode(truncated, version);
            }
        }
    }

    #[test]
    fn negative_marker_count_ends_the_payload() {
        let version = ProtocolVersion::new(3, 0, 0, 0);
        let mut buf = BytesMut::new();
        buf.put_i32_le(7); // frame number
        buf.put_i32_le(1); // one marker set
        put_cstring("bad", &mut buf);
        buf.put_i32_le(-1); // corrupt marker count
        buf.put_bytes(0xFF, 64); // garbage that must not be decoded
        let frame = MoCapFrame::decode(buf.freeze(), version);
        assert_eq!(frame.prefix.frame_number, 7);
        assert!(frame.marker_sets.is_empty());
        assert!(frame.rigid_bodies.is_empty());
    }

    #[test]
    fn oversized_marker_count_ends_the_payload() {
        let version = ProtocolVersion::new(3, 0, 0, 0);
        let mut buf = BytesMut::new();
        buf.put_i32_le(8);
        buf.put_i32_le(1);
        put_cstring("huge", &mut buf);
        buf.put_i32_le(10_001);
        buf.put_bytes(0, 256);
        let frame = MoCapFrame::decode(buf.freeze(), version);
        assert!(frame.marker_sets.is_empty());
        assert!(frame.rigid_bodies.is_empty());
    }

    #[test]
    fn labeled_marker_composite_id_splits() {
        let marker = LabeledMarker {
            id: 0x0001_0005,
            position: [0.0; 3],
            size: 0.0,
            params: 0,
            residual_mm: 0.0,
        };
        assert_eq!(marker.model_id(), 1);
        assert_eq!(marker.marker_id(), 5);
    }

    #[test]
    fn rigid_body_v3_consumes_head_and_mean_error_only() {
        let version = ProtocolVersion::new(3, 0, 0, 0);
        let mut buf = BytesMut::new();
        body(42).encode(&mut buf, version);
        // id + position + orientation + mean error + param word
        assert_eq!(buf.len(), 4 + 12 + 16 + 4 + 2);

        // Without the optional trailing param the decode stops after
        // the mean error and reports tracking as valid.
        let mut short = Bytes::copy_from_slice(&buf[..36]);
        let decoded = RigidBody::decode(&mut short, version).unwrap();
        assert_eq!(decoded.id, 42);
        assert!(decoded.markers.is_empty());
        assert_eq!(decoded.mean_error, Some(0.002));
        assert!(decoded.tracking_valid);
        assert!(!short.has_remaining());
    }

    #[test]
    fn rigid_body_v25_reads_legacy_markers_and_skips_params() {
        let version = ProtocolVersion::new(2, 5, 0, 0);
        let mut rb = body(3);
        rb.markers = vec![
            RigidBodyMarker {
                position: [1.0, 1.0, 1.0],
                id: Some(1),
                size: Some(0.01),
            },
            RigidBodyMarker {
                position: [2.0, 2.0, 2.0],
                id: Some(2),
                size: Some(0.02),
            },
        ];
        let mut buf = BytesMut::new();
        rb.encode(&mut buf, version);
        // Trailing param word is absent pre-2.6.
        assert_eq!(buf.len(), 4 + 12 + 16 + 4 + 2 * (12 + 4 + 4) + 4);

        let mut src = buf.freeze();
        let decoded = RigidBody::decode(&mut src, version).unwrap();
        assert_eq!(decoded.markers.len(), 2);
        assert_eq!(decoded.markers[1].id, Some(2));
        assert!(decoded.tracking_valid);
        assert!(!src.has_remaining());
    }

    #[test]
    fn rigid_body_tracking_invalid_bit() {
        let version = ProtocolVersion::new(3, 0, 0, 0);
        let mut rb = body(5);
        rb.tracking_valid = false;
        let mut buf = BytesMut::new();
        rb.encode(&mut buf, version);
        let mut src = buf.freeze();
        let decoded = RigidBody::decode(&mut src, version).unwrap();
        assert!(!decoded.tracking_valid);
    }

    #[test]
    fn suffix_stops_after_timecode_when_payload_ends() {
        let version = ProtocolVersion::new(3, 0, 0, 0);
        let mut buf = BytesMut::new();
        buf.put_i32_le(5);
        buf.put_i32_le(6);
        let suffix = FrameSuffix::decode(&mut buf.freeze(), version);
        assert_eq!(suffix.timecode, 5);
        assert_eq!(suffix.timecode_sub, 6);
        assert_eq!(suffix.timestamp, 0.0);
        assert!(!suffix.is_recording());
    }

    #[test]
    fn suffix_flags_decode() {
        let version = ProtocolVersion::new(4, 1, 0, 0);
        let suffix = FrameSuffix {
            timecode: 1,
            timecode_sub: 2,
            timestamp: 3.5,
            params: FrameParams::RECORDING | FrameParams::TRACKED_MODELS_CHANGED,
            ..FrameSuffix::default()
        };
        let mut buf = BytesMut::new();
        suffix.encode(&mut buf, version);
        let decoded = FrameSuffix::decode(&mut buf.freeze(), version);
        assert!(decoded.is_recording());
        assert!(decoded.tracked_models_changed());
    }

    #[test]
    fn skeleton_bodies_use_the_same_version_rules() {
        let version = ProtocolVersion::new(2, 6, 0, 0);
        let skeleton = Skeleton {
            id: 4,
            rigid_bodies: vec![{
                let mut rb = body(400);
                rb.markers = vec![RigidBodyMarker {
                    position: [0.0, 0.0, 1.0],
                    id: Some(8),
                    size: Some(0.009),
                }];
                rb
            }],
        };
        let mut buf = BytesMut::new();
        skeleton.encode(&mut buf, version);
        let mut src = buf.freeze();
        let decoded = Skeleton::decode(&mut src, version).unwrap();
        assert_eq!(decoded, skeleton);
    }
}
