// Color capture
//
// 3D pass (capture index 0): copy the scene into the eye's projection
// texture, then clear to transparent so the host draws its HUD onto an empty
// alpha channel.
//
// 2D pass (capture index 2): the image now holds the HUD. Recomposite it with
// the overlay, copy once into the quad layer on the left-eye pass, and only
// redraw the overlay on the right-eye pass.

use super::layout::{LayoutState, LayoutTracker};
use super::{CaptureLayer, ClearTarget, OPAQUE_BLACK, TRANSPARENT};
use crate::backend::barrier::memory_barrier;
use crate::marker::{CapturePass, ColorMarker, Eye};
use crate::runtime::{Layers, Renderer};
use ash::vk;

impl CaptureLayer {
    pub(super) unsafe fn capture_color(
        &self,
        marker: ColorMarker,
        target: &ClearTarget<'_>,
        original: &vk::ClearColorValue,
    ) {
        log::debug!(
            "[{}] Clearing color image for {} layer for {} side",
            marker.frame,
            marker.pass,
            marker.eye
        );

        let Some(renderer) = self.runtime.renderer() else {
            log::debug!("Renderer is not initialized yet!");
            return target.clear_color(self.dispatch(), original);
        };

        // Both layers share the host's render resolution, so whichever pass
        // shows up first builds them
        let layers = self.ensure_layers(renderer.as_ref(), target.command_buffer, target.image);

        if !renderer.is_initialized() {
            return;
        }

        match marker.pass {
            CapturePass::Scene3D => self.capture_scene_color(renderer.as_ref(), &layers, marker, target),
            CapturePass::Hud2D => self.capture_hud_color(renderer.as_ref(), &layers, marker, target),
        }
    }

    unsafe fn capture_scene_color(
        &self,
        renderer: &dyn Renderer,
        layers: &Layers,
        marker: ColorMarker,
        target: &ClearTarget<'_>,
    ) {
        let dispatch = self.dispatch();
        let ColorMarker { eye, frame, .. } = marker;
        let (cmd, image) = (target.command_buffer, target.image);

        let current = self.registry.resolve_current_color(image);

        if self.is_flat_2d() {
            return;
        }

        if current != Some(image) {
            log::debug!(
                "Color image is not the current 3D color image ({:?} != {:?})",
                image,
                current
            );
            let clear = if renderer.is_rendering_3d(frame) {
                TRANSPARENT
            } else {
                OPAQUE_BLACK
            };
            return target.clear_color(dispatch, &clear);
        }

        if renderer.frame(frame).color_copied(eye) {
            log::debug!("A 3D color texture was already copied for the current frame");
            return target.clear_color(dispatch, &TRANSPARENT);
        }

        let mut layout = LayoutTracker::new(dispatch, cmd, image, target.layout, vk::ImageAspectFlags::COLOR);
        layout.ensure_layout(LayoutState::TransferSource);

        let texture = layers.layer_3d.copy_color_to_layer(
            eye,
            cmd,
            image,
            frame,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        );
        renderer.on_3d_color_copied(eye, frame);
        self.handoff.enqueue(cmd, texture);
        memory_barrier(dispatch, cmd);

        // The host's flat output is the same for both eyes; the overlay only
        // needs it once
        if eye == Eye::Right {
            if let Some(overlay) = &layers.overlay {
                overlay.draw_3d_layer_as_background(
                    cmd,
                    image,
                    layers.layer_3d.aspect_ratio(eye),
                    frame,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                );
                memory_barrier(dispatch, cmd);
            }
        }

        // Clears need the host's layout back, not TRANSFER_SRC
        layout.restore();

        target.clear_color(dispatch, &TRANSPARENT);
        memory_barrier(dispatch, cmd);
    }

    unsafe fn capture_hud_color(
        &self,
        renderer: &dyn Renderer,
        layers: &Layers,
        marker: ColorMarker,
        target: &ClearTarget<'_>,
    ) {
        let dispatch = self.dispatch();
        let ColorMarker { eye, frame, .. } = marker;
        let (cmd, image) = (target.command_buffer, target.image);

        let hud_copied = renderer.frame(frame).copied_2d;
        let mut layout = LayoutTracker::new(dispatch, cmd, image, target.layout, vk::ImageAspectFlags::COLOR);

        match eye {
            Eye::Left => {
                // The host clears the 2D target twice per frame; only the
                // first one is captured
                if hud_copied {
                    log::debug!("A 2D texture was already copied for the current frame");
                    return target.clear_color(dispatch, &TRANSPARENT);
                }

                if let Some(overlay) = &layers.overlay {
                    layout.ensure_layout(LayoutState::TransferSource);
                    overlay.draw_hud_layer_as_background(cmd, image, frame, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
                    memory_barrier(dispatch, cmd);

                    overlay.begin_frame(frame, false);
                    overlay.update();
                    overlay.render();
                    layout.ensure_layout(LayoutState::TransferDestination);
                    overlay.draw_and_copy_to_image(cmd, image, frame);
                    memory_barrier(dispatch, cmd);
                }

                layout.ensure_layout(LayoutState::TransferSource);
                let texture = layers.layer_2d.copy_color_to_layer(
                    cmd,
                    image,
                    frame,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                );
                memory_barrier(dispatch, cmd);
                renderer.on_2d_copied(frame);
                self.handoff.enqueue(cmd, texture);
                layout.restore();
            }
            Eye::Right => {
                if let Some(overlay) = &layers.overlay {
                    overlay.begin_frame(frame, true);
                    overlay.update();
                    overlay.render();
                    layout.ensure_layout(LayoutState::TransferDestination);
                    overlay.draw_and_copy_to_image(cmd, image, frame);
                    memory_barrier(dispatch, cmd);
                    layout.restore();
                    return;
                }

                if hud_copied {
                    target.clear_color(dispatch, &TRANSPARENT);
                }
            }
        }
    }
}
