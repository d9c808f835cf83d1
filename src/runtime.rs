// =============================================================================
// COLLABORATORS - The stereo presentation side
// =============================================================================
//
// The XR runtime, its renderer, the two compositor layers and the overlay
// compositor all live outside this crate. The capture layer only talks to
// them through these traits.
//
// All methods take &self: the capture path runs on whatever thread the host
// records commands on, while presentation runs on another, so implementors
// keep their own interior locking.

use crate::frame::{FrameCaptures, FrameIndex, FrameTracker};
use crate::marker::Eye;
use anyhow::Result;
use ash::vk;
use std::sync::Arc;

/// A texture shared with the external compositor, synchronized with
/// timeline semaphores.
pub trait SharedTexture: Send + Sync {
    /// Value the Vulkan side waits for before writing
    fn vulkan_wait_value(&self) -> u64;
    /// Value the Vulkan side signals once the copy is done
    fn vulkan_signal_value(&self) -> u64;
    fn semaphore_for_wait(&self, value: u64) -> vk::Semaphore;
    fn semaphore_for_signal(&self, value: u64) -> vk::Semaphore;
}

/// Stereo 3D projection layer: one color and one depth texture per eye and
/// frame slot.
pub trait Layer3D: Send + Sync {
    /// Record a copy of `image` (already in `current_layout`) into the shared
    /// color texture for `eye`.
    fn copy_color_to_layer(
        &self,
        eye: Eye,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        frame: FrameIndex,
        current_layout: vk::ImageLayout,
    ) -> Arc<dyn SharedTexture>;

    fn copy_depth_to_layer(
        &self,
        eye: Eye,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        frame: FrameIndex,
        current_layout: vk::ImageLayout,
    ) -> Arc<dyn SharedTexture>;

    fn aspect_ratio(&self, eye: Eye) -> f32;
}

/// Flat 2D quad layer, shared by both eyes
pub trait Layer2D: Send + Sync {
    fn copy_color_to_layer(
        &self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        frame: FrameIndex,
        current_layout: vk::ImageLayout,
    ) -> Arc<dyn SharedTexture>;
}

/// Overlay compositor that recomposites the host's flat output with UI on top
pub trait Overlay: Send + Sync {
    fn begin_frame(&self, frame: FrameIndex, right_eye: bool);
    fn update(&self);
    fn render(&self);

    /// Draw the overlay and copy the result into `image`, which must be in
    /// TRANSFER_DST_OPTIMAL.
    fn draw_and_copy_to_image(&self, command_buffer: vk::CommandBuffer, image: vk::Image, frame: FrameIndex);

    fn draw_3d_layer_as_background(
        &self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        aspect_ratio: f32,
        frame: FrameIndex,
        current_layout: vk::ImageLayout,
    );

    fn draw_hud_layer_as_background(
        &self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        frame: FrameIndex,
        current_layout: vk::ImageLayout,
    );
}

/// The layer objects, always built together from the host's render resolution
pub struct Layers {
    pub layer_3d: Box<dyn Layer3D>,
    pub layer_2d: Box<dyn Layer2D>,
    pub overlay: Option<Box<dyn Overlay>>,
}

pub trait Renderer: Send + Sync {
    /// True once the whole presentation pipeline is ready for captures
    fn is_initialized(&self) -> bool;

    fn is_rendering_3d(&self, frame: FrameIndex) -> bool;

    fn frames(&self) -> &FrameTracker;

    /// Layers built by `create_layers`, if any
    fn layers(&self) -> Option<Arc<Layers>>;

    /// Build the layer objects for the host's render resolution. Called at
    /// most once per renderer.
    fn create_layers(&self, command_buffer: vk::CommandBuffer, extent: vk::Extent2D) -> Result<Arc<Layers>>;

    fn frame(&self, frame: FrameIndex) -> FrameCaptures {
        self.frames().get(frame)
    }

    fn on_3d_color_copied(&self, eye: Eye, frame: FrameIndex) {
        self.frames().mark_color(eye, frame);
    }

    fn on_3d_depth_copied(&self, eye: Eye, frame: FrameIndex) {
        self.frames().mark_depth(eye, frame);
    }

    fn on_2d_copied(&self, frame: FrameIndex) {
        self.frames().mark_2d(frame);
    }
}

pub trait XrRuntime: Send + Sync {
    /// Start the XR session. Invoked once, on the first color clear.
    fn init_session(&self);

    /// None until the runtime has a renderer
    fn renderer(&self) -> Option<Arc<dyn Renderer>>;

    /// Pump runtime events, once per host present
    fn process_events(&self);
}
