//! The NatNet bitstream version and its field-presence gates.
//!
//! Record layouts changed repeatedly between major 2.x and 4.x while
//! staying backward compatible. Every optional field in the frame
//! codec is guarded by one of the named predicates below, so the
//! whole version matrix lives in this file rather than in scattered
//! comparisons next to the reads.

use std::fmt;

/// Four-component NatNet protocol version (major, minor, build, revision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub revision: u8,
}

impl ProtocolVersion {
    pub const fn new(major: u8, minor: u8, build: u8, revision: u8) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// The all-zero version reported before any handshake completed.
    pub const UNKNOWN: Self = Self::new(0, 0, 0, 0);

    pub fn is_unknown(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.build == 0 && self.revision == 0
    }

    /// 4.1+ prefixes several frame blocks with an unpacked-size field.
    pub fn has_packed_size_prefix(&self) -> bool {
        (self.major == 4 && self.minor > 0) || self.major > 4
    }

    /// Skeleton blocks appear in 2.1+.
    pub fn has_skeletons(&self) -> bool {
        (self.major == 2 && self.minor > 0) || self.major > 2
    }

    /// Labeled marker blocks appear in 2.4+.
    pub fn has_labeled_markers(&self) -> bool {
        (self.major == 2 && self.minor > 3) || self.major > 2
    }

    /// Marker and rigid-body param bitfields appear in 2.6+.
    pub fn has_marker_params(&self) -> bool {
        (self.major == 2 && self.minor >= 6) || self.major > 2
    }

    /// Labeled marker residuals appear in 3.0+.
    pub fn has_marker_residual(&self) -> bool {
        self.major >= 3
    }

    /// Force plate blocks appear in 2.9+.
    pub fn has_force_plates(&self) -> bool {
        (self.major == 2 && self.minor >= 9) || self.major > 2
    }

    /// Generic analog device blocks appear in 2.11+.
    pub fn has_devices(&self) -> bool {
        (self.major == 2 && self.minor >= 11) || self.major > 2
    }

    /// The frame timestamp widened from f32 to f64 in 2.7.
    pub fn has_double_timestamp(&self) -> bool {
        (self.major == 2 && self.minor >= 7) || self.major > 2
    }

    /// Hardware exposure/receive/transmit stamps appear in 3.0+.
    pub fn has_high_res_stamps(&self) -> bool {
        self.major >= 3
    }

    /// Precision timestamp seconds/fraction appear in 4.0+.
    pub fn has_precision_timestamp(&self) -> bool {
        self.major >= 4
    }

    /// Pre-3.0 rigid bodies carry an inline marker sub-block.
    pub fn has_legacy_rigid_body_markers(&self) -> bool {
        self.major < 3 && self.major != 0
    }

    /// The legacy marker sub-block gained ids and sizes in 2.0.
    pub fn has_legacy_marker_ids(&self) -> bool {
        self.major >= 2
    }

    /// Rigid bodies carry a trailing mean marker error from 2.0.
    pub fn has_mean_error(&self) -> bool {
        self.major >= 2
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}
