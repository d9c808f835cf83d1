// Depth capture
//
// Unlike color, a depth marker on anything but the current 3D depth target
// is dropped instead of forwarded: the host only emits depth markers on its
// scene depth buffer, and a stray marker clear has nothing worth keeping.

use super::layout::{LayoutState, LayoutTracker};
use super::{CaptureLayer, ClearTarget};
use crate::error::protocol_violation;
use crate::marker::DepthMarker;
use ash::vk;

impl CaptureLayer {
    pub(super) unsafe fn capture_depth(&self, marker: DepthMarker, target: &ClearTarget<'_>) {
        let DepthMarker { eye, frame } = marker;
        let (cmd, image) = (target.command_buffer, target.image);

        let Some(renderer) = self.runtime.renderer() else {
            return;
        };
        if !renderer.is_initialized() {
            return;
        }

        log::debug!("[{}] Clearing depth image for 3D layer for {} side", frame, eye);

        let current = self.registry.resolve_current_depth(image);
        if current != Some(image) {
            log::debug!(
                "Depth image is not the current 3D depth image ({:?} != {:?})",
                image,
                current
            );
            return;
        }

        if renderer.frame(frame).depth_copied(eye) {
            log::debug!("A depth texture was already copied for the current frame");
            return;
        }

        let Some(layers) = renderer.layers() else {
            protocol_violation("depth capture before the 3D layer exists");
        };

        let dispatch = self.dispatch();
        let mut layout = LayoutTracker::new(dispatch, cmd, image, target.layout, vk::ImageAspectFlags::DEPTH);
        layout.ensure_layout(LayoutState::TransferSource);

        let texture = layers.layer_3d.copy_depth_to_layer(
            eye,
            cmd,
            image,
            frame,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        );
        renderer.on_3d_depth_copied(eye, frame);
        self.handoff.enqueue(cmd, texture);

        layout.restore();
    }
}
