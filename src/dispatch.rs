//! Consumer hooks invoked by the data receive loop.
//!
//! Collaborators (coordinate conversion, telemetry re-emission,
//! recording) attach through this interface only; they never see the
//! sockets or session internals. Both hooks default to no-ops and are
//! called synchronously, in frame order, never concurrently with each
//! other within one frame.

use crate::protocol::packet::frame::MoCapFrame;
use crate::protocol::wire::{Quat, Vec3};

/// Frame-level summary handed to [`FrameHandler::on_frame`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    pub frame_number: i32,
    pub marker_set_count: usize,
    pub unlabeled_marker_count: usize,
    pub rigid_body_count: usize,
    pub skeleton_count: usize,
    pub labeled_marker_count: usize,
    pub timecode: i32,
    pub timecode_sub: i32,
    pub timestamp: f64,
    pub is_recording: bool,
    pub tracked_models_changed: bool,
}

impl FrameSummary {
    pub fn from_frame(frame: &MoCapFrame) -> Self {
        Self {
            frame_number: frame.prefix.frame_number,
            marker_set_count: frame.marker_sets.len(),
            unlabeled_marker_count: frame.legacy_markers.positions.len(),
            rigid_body_count: frame.rigid_bodies.len(),
            skeleton_count: frame.skeletons.len(),
            labeled_marker_count: frame.labeled_markers.len(),
            timecode: frame.suffix.timecode,
            timecode_sub: frame.suffix.timecode_sub,
            timestamp: frame.suffix.timestamp,
            is_recording: frame.suffix.is_recording(),
            tracked_models_changed: frame.suffix.tracked_models_changed(),
        }
    }
}

/// Callbacks receiving decoded stream data.
pub trait FrameHandler: Send + Sync {
    /// Called once per decoded frame with summary metadata.
    fn on_frame(&self, _summary: &FrameSummary) {}

    /// Called for every rigid body in a frame, in decode order:
    /// top-level bodies first, then skeleton bodies.
    fn on_rigid_body(&self, _id: i32, _position: Vec3, _orientation: Quat) {}
}

/// No-op handler for sessions that only poll connection state.
pub struct NullHandler;

impl FrameHandler for NullHandler {}

/// Runs both hooks for one decoded frame.
pub(crate) fn dispatch_frame(handler: &dyn FrameHandler, frame: &MoCapFrame) {
    for body in &frame.rigid_bodies {
        handler.on_rigid_body(body.id, body.position, body.orientation);
    }
    for skeleton in &frame.skeletons {
        for body in &skeleton.rigid_bodies {
            handler.on_rigid_body(body.id, body.position, body.orientation);
        }
    }
    handler.on_frame(&FrameSummary::from_frame(frame));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packet::frame::{FramePrefix, RigidBody, Skeleton};
    use std::sync::Mutex;

    struct Recording {
        bodies: Mutex<Vec<i32>>,
        frames: Mutex<Vec<FrameSummary>>,
    }

    impl FrameHandler for Recording {
        fn on_frame(&self, summary: &FrameSummary) {
            self.frames.lock().unwrap().push(summary.clone());
        }

        fn on_rigid_body(&self, id: i32, _position: Vec3, _orientation: Quat) {
            self.bodies.lock().unwrap().push(id);
        }
    }

    fn body(id: i32) -> RigidBody {
        RigidBody {
            id,
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
            markers: Vec::new(),
            mean_error: None,
            tracking_valid: true,
        }
    }

    #[test]
    fn bodies_dispatch_in_decode_order_then_frame_summary() {
        let handler = Recording {
            bodies: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
        };
        let frame = MoCapFrame {
            prefix: FramePrefix { frame_number: 12 },
            rigid_bodies: vec![body(1), body(2)],
            skeletons: vec![Skeleton {
                id: 5,
                rigid_bodies: vec![body(501)],
            }],
            ..MoCapFrame::default()
        };

        dispatch_frame(&handler, &frame);

        assert_eq!(*handler.bodies.lock().unwrap(), vec![1, 2, 501]);
        let frames = handler.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame_number, 12);
        assert_eq!(frames[0].rigid_body_count, 2);
        assert_eq!(frames[0].skeleton_count, 1);
    }
}
