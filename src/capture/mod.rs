// =============================================================================
// CAPTURE LAYER - Overrides for the intercepted Vulkan entry points
// =============================================================================
//
// DATA FLOW:
// ┌─────────────────────────────────────────────────────────────────────────┐
// │  vkCreateImage / vkDestroyImage ──> ImageRegistry                       │
// │  vkCmdClear*Image ──> marker decoder ──> frame state ──> copy into      │
// │                                          shared texture ──> HandoffQueue│
// │  vkQueueSubmit ──> HandoffQueue drained ──> semaphores injected ──> GPU │
// └─────────────────────────────────────────────────────────────────────────┘
//
// Command recording and submission may happen on different host threads at
// the same time, so every piece of shared state carries its own lock and no
// lock is held across a call into the driver.

mod color;
mod depth;
pub mod layout;

use crate::backend::sync::requests_timeline;
use crate::backend::{DeviceDispatch, TimelineSemaphores};
use crate::config::CaptureConfig;
use crate::error::protocol_violation;
use crate::handoff::HandoffQueue;
use crate::marker::{decode_color, decode_depth, Marker};
use crate::registry::ImageRegistry;
use crate::runtime::{Layers, Renderer, XrRuntime};
use crate::submit::rewrite_submits;
use ash::prelude::VkResult;
use ash::vk;
use parking_lot::{Mutex, Once};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const TRANSPARENT: vk::ClearColorValue = vk::ClearColorValue {
    float32: [0.0, 0.0, 0.0, 0.0],
};
const OPAQUE_BLACK: vk::ClearColorValue = vk::ClearColorValue {
    float32: [0.0, 0.0, 0.0, 1.0],
};

/// The arguments of the clear we intercepted
struct ClearTarget<'a> {
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    layout: vk::ImageLayout,
    ranges: &'a [vk::ImageSubresourceRange],
}

impl ClearTarget<'_> {
    unsafe fn clear_color(&self, dispatch: &dyn DeviceDispatch, color: &vk::ClearColorValue) {
        dispatch.cmd_clear_color_image(self.command_buffer, self.image, self.layout, color, self.ranges);
    }
}

/// Interception state for one device
pub struct CaptureLayer {
    dispatch: Arc<dyn DeviceDispatch>,
    runtime: Arc<dyn XrRuntime>,
    registry: ImageRegistry,
    handoff: HandoffQueue,
    timelines: TimelineSemaphores,
    flat_2d: AtomicBool,
    layer_init: Mutex<()>,
    session: Once,
}

impl CaptureLayer {
    pub fn new(dispatch: Arc<dyn DeviceDispatch>, runtime: Arc<dyn XrRuntime>, config: &CaptureConfig) -> Self {
        log::info!(
            "Capture layer ready (min target {}x{}, flat 2D: {})",
            config.min_width,
            config.min_height,
            config.force_flat_2d
        );
        Self {
            dispatch,
            runtime,
            registry: ImageRegistry::new(config.min_extent()),
            handoff: HandoffQueue::new(),
            timelines: TimelineSemaphores::new(),
            flat_2d: AtomicBool::new(config.force_flat_2d),
            layer_init: Mutex::new(()),
            session: Once::new(),
        }
    }

    pub fn registry(&self) -> &ImageRegistry {
        &self.registry
    }

    pub fn handoff(&self) -> &HandoffQueue {
        &self.handoff
    }

    pub fn timelines(&self) -> &TimelineSemaphores {
        &self.timelines
    }

    /// Leave 3D color clears alone, e.g. while the host shows a cutscene
    pub fn set_flat_2d(&self, enabled: bool) {
        if self.flat_2d.swap(enabled, Ordering::Relaxed) != enabled {
            log::info!("Flat 2D mode {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    pub fn is_flat_2d(&self) -> bool {
        self.flat_2d.load(Ordering::Relaxed)
    }

    fn dispatch(&self) -> &dyn DeviceDispatch {
        &*self.dispatch
    }

    /// Build the layer pair the first time any capture sees the host's
    /// render resolution.
    fn ensure_layers(
        &self,
        renderer: &dyn Renderer,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
    ) -> Arc<Layers> {
        if let Some(layers) = renderer.layers() {
            return layers;
        }

        let _guard = self.layer_init.lock();
        if let Some(layers) = renderer.layers() {
            return layers;
        }

        let Some(record) = self.registry.lookup(image) else {
            protocol_violation(format_args!("no resolution recorded for capture image {:?}", image));
        };

        log::info!(
            "Found rendering resolution {}x{} @ {:?}",
            record.extent.width,
            record.extent.height,
            record.format
        );

        match renderer.create_layers(command_buffer, record.extent) {
            Ok(layers) => layers,
            Err(e) => protocol_violation(format_args!("couldn't create 3D/2D layers: {:#}", e)),
        }
    }

    // =========================================================================
    // RESOURCE LIFETIME
    // =========================================================================

    /// vkCreateImage
    pub unsafe fn create_image(
        &self,
        create_info: &vk::ImageCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Image> {
        let image = self.dispatch.create_image(create_info, allocator)?;

        let extent = vk::Extent2D {
            width: create_info.extent.width,
            height: create_info.extent.height,
        };
        self.registry.register(image, extent, create_info.format);

        Ok(image)
    }

    /// vkDestroyImage
    pub unsafe fn destroy_image(&self, image: vk::Image, allocator: Option<&vk::AllocationCallbacks>) {
        self.registry.unregister(image);
        self.dispatch.destroy_image(image, allocator);
    }

    /// vkCreateSemaphore
    pub unsafe fn create_semaphore(
        &self,
        create_info: &vk::SemaphoreCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Semaphore> {
        let semaphore = self.dispatch.create_semaphore(create_info, allocator)?;
        if requests_timeline(create_info) {
            self.timelines.insert(semaphore);
        }
        Ok(semaphore)
    }

    /// vkDestroySemaphore
    pub unsafe fn destroy_semaphore(
        &self,
        semaphore: vk::Semaphore,
        allocator: Option<&vk::AllocationCallbacks>,
    ) {
        self.timelines.remove(semaphore);
        self.dispatch.destroy_semaphore(semaphore, allocator);
    }

    // =========================================================================
    // CLEARS
    // =========================================================================

    /// vkCmdClearColorImage
    pub unsafe fn cmd_clear_color_image(
        &self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        color: &vk::ClearColorValue,
        ranges: &[vk::ImageSubresourceRange],
    ) {
        // Only float clears can carry a marker; the host uses float targets
        let marker = decode_color(&color.float32).unwrap_or_else(|e| protocol_violation(e));

        self.session.call_once(|| {
            log::info!("Starting XR session");
            self.runtime.init_session();
        });

        let target = ClearTarget {
            command_buffer,
            image,
            layout,
            ranges,
        };
        match marker {
            Marker::Color(marker) => self.capture_color(marker, &target, color),
            _ => target.clear_color(self.dispatch(), color),
        }
    }

    /// vkCmdClearDepthStencilImage
    pub unsafe fn cmd_clear_depth_stencil_image(
        &self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        depth_stencil: &vk::ClearDepthStencilValue,
        ranges: &[vk::ImageSubresourceRange],
    ) {
        let marker = decode_depth(depth_stencil.depth, depth_stencil.stencil, ranges.len())
            .unwrap_or_else(|e| protocol_violation(e));

        let target = ClearTarget {
            command_buffer,
            image,
            layout,
            ranges,
        };
        match marker {
            Marker::Depth(marker) => self.capture_depth(marker, &target),
            _ => self.dispatch.cmd_clear_depth_stencil_image(
                command_buffer,
                image,
                layout,
                depth_stencil,
                ranges,
            ),
        }
    }

    // =========================================================================
    // QUEUE
    // =========================================================================

    /// vkQueueSubmit
    pub unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submits: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> VkResult<()> {
        let result = match rewrite_submits(&self.handoff, &self.timelines, submits) {
            Some(rewritten) => {
                log::trace!("Submitting with {} hand-off(s)", rewritten.injected());
                self.dispatch.queue_submit(queue, rewritten.submits(), fence)
            }
            None => self.dispatch.queue_submit(queue, submits, fence),
        };

        if let Err(e) = result {
            log::error!("QueueSubmit failed with error {:?}", e);
        }
        result
    }

    /// vkQueuePresentKHR
    pub unsafe fn queue_present(&self, queue: vk::Queue, present_info: &vk::PresentInfoKHR) -> VkResult<bool> {
        self.runtime.process_events();
        self.dispatch.queue_present(queue, present_info)
    }
}
