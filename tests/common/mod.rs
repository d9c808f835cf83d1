// Recording fakes for the driver and the XR side
#![allow(dead_code)]

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use stereo_capture_layer::config::CaptureConfig;
use stereo_capture_layer::{
    CaptureLayer, DeviceDispatch, Eye, FrameIndex, FrameTracker, Layer2D, Layer3D, Layers, Overlay,
    Renderer, SharedTexture, XrRuntime,
};

pub const SCENE_COLOR: vk::Format = vk::Format::B10G11R11_UFLOAT_PACK32;
pub const SCENE_DEPTH: vk::Format = vk::Format::D32_SFLOAT;
pub const HUD_COLOR: vk::Format = vk::Format::R8G8B8A8_UNORM;

pub const LEFT_SCENE_EVEN: [f32; 4] = [0.0, 0.125, 0.98, 0.2];
pub const RIGHT_SCENE_EVEN: [f32; 4] = [0.0, 0.98, 0.125, 0.2];
pub const LEFT_HUD_EVEN: [f32; 4] = [2.0 / 32.0, 0.125, 0.98, 0.2];
pub const RIGHT_HUD_EVEN: [f32; 4] = [2.0 / 32.0, 0.98, 0.125, 0.2];

pub const TRANSPARENT: [f32; 4] = [0.0, 0.0, 0.0, 0.0];
pub const OPAQUE_BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

pub const ASPECT_RATIO: f32 = 0.9;

pub fn cmd(raw: u64) -> vk::CommandBuffer {
    vk::CommandBuffer::from_raw(raw)
}

pub fn semaphore(raw: u64) -> vk::Semaphore {
    vk::Semaphore::from_raw(raw)
}

pub fn color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

pub fn depth_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::DEPTH,
        ..color_range()
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// What one VkSubmitInfo looked like when it reached the driver
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitSnapshot {
    pub wait_semaphores: Vec<vk::Semaphore>,
    pub wait_stages: Vec<vk::PipelineStageFlags>,
    pub command_buffers: Vec<vk::CommandBuffer>,
    pub signal_semaphores: Vec<vk::Semaphore>,
    /// sType of every struct in the pNext chain, in order
    pub chain: Vec<vk::StructureType>,
    /// Values of the first timeline struct in the chain
    pub wait_values: Option<Vec<u64>>,
    pub signal_values: Option<Vec<u64>>,
    /// Raw pointer fields, for identity checks
    pub raw: [usize; 5],
}

pub fn raw_fields(submit: &vk::SubmitInfo) -> [usize; 5] {
    [
        submit.p_next as usize,
        submit.p_wait_semaphores as usize,
        submit.p_wait_dst_stage_mask as usize,
        submit.p_command_buffers as usize,
        submit.p_signal_semaphores as usize,
    ]
}

unsafe fn slice<'a, T>(ptr: *const T, count: u32) -> &'a [T] {
    if ptr.is_null() || count == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, count as usize)
    }
}

unsafe fn snapshot(submit: &vk::SubmitInfo) -> SubmitSnapshot {
    let mut chain = Vec::new();
    let mut wait_values = None;
    let mut signal_values = None;

    let mut it = submit.p_next as *const vk::BaseInStructure;
    while !it.is_null() {
        let s_type = (*it).s_type;
        if s_type == vk::StructureType::TIMELINE_SEMAPHORE_SUBMIT_INFO && wait_values.is_none() {
            let info = &*(it as *const vk::TimelineSemaphoreSubmitInfo);
            wait_values = Some(slice(info.p_wait_semaphore_values, info.wait_semaphore_value_count).to_vec());
            signal_values = Some(slice(info.p_signal_semaphore_values, info.signal_semaphore_value_count).to_vec());
        }
        chain.push(s_type);
        it = (*it).p_next;
    }

    SubmitSnapshot {
        wait_semaphores: slice(submit.p_wait_semaphores, submit.wait_semaphore_count).to_vec(),
        wait_stages: slice(submit.p_wait_dst_stage_mask, submit.wait_semaphore_count).to_vec(),
        command_buffers: slice(submit.p_command_buffers, submit.command_buffer_count).to_vec(),
        signal_semaphores: slice(submit.p_signal_semaphores, submit.signal_semaphore_count).to_vec(),
        chain,
        wait_values,
        signal_values,
        raw: raw_fields(submit),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateImage(vk::Image),
    DestroyImage(vk::Image),
    CreateSemaphore(vk::Semaphore),
    DestroySemaphore(vk::Semaphore),
    ClearColor {
        image: vk::Image,
        layout: vk::ImageLayout,
        color: [f32; 4],
    },
    ClearDepth {
        image: vk::Image,
        layout: vk::ImageLayout,
        depth: f32,
        stencil: u32,
    },
    Transition {
        image: vk::Image,
        old: vk::ImageLayout,
        new: vk::ImageLayout,
        aspect: vk::ImageAspectFlags,
    },
    MemoryBarrier,
    Submit {
        /// Address of the VkSubmitInfo array handed to the driver
        array: usize,
        batches: Vec<SubmitSnapshot>,
    },
    Present,
}

#[derive(Default)]
pub struct MockDevice {
    calls: Mutex<Vec<Call>>,
    next_handle: AtomicU64,
    pub fail_submits: AtomicBool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(0x100),
            ..Default::default()
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock())
    }

    pub fn submits(&self) -> Vec<(usize, Vec<SubmitSnapshot>)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Submit { array, batches } => Some((*array, batches.clone())),
                _ => None,
            })
            .collect()
    }
}

impl DeviceDispatch for MockDevice {
    unsafe fn create_image(
        &self,
        _create_info: &vk::ImageCreateInfo,
        _allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Image> {
        let image = vk::Image::from_raw(self.handle());
        self.record(Call::CreateImage(image));
        Ok(image)
    }

    unsafe fn destroy_image(&self, image: vk::Image, _allocator: Option<&vk::AllocationCallbacks>) {
        self.record(Call::DestroyImage(image));
    }

    unsafe fn create_semaphore(
        &self,
        _create_info: &vk::SemaphoreCreateInfo,
        _allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Semaphore> {
        let semaphore = vk::Semaphore::from_raw(self.handle());
        self.record(Call::CreateSemaphore(semaphore));
        Ok(semaphore)
    }

    unsafe fn destroy_semaphore(&self, semaphore: vk::Semaphore, _allocator: Option<&vk::AllocationCallbacks>) {
        self.record(Call::DestroySemaphore(semaphore));
    }

    unsafe fn cmd_clear_color_image(
        &self,
        _command_buffer: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        color: &vk::ClearColorValue,
        _ranges: &[vk::ImageSubresourceRange],
    ) {
        self.record(Call::ClearColor {
            image,
            layout,
            color: color.float32,
        });
    }

    unsafe fn cmd_clear_depth_stencil_image(
        &self,
        _command_buffer: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        depth_stencil: &vk::ClearDepthStencilValue,
        _ranges: &[vk::ImageSubresourceRange],
    ) {
        self.record(Call::ClearDepth {
            image,
            layout,
            depth: depth_stencil.depth,
            stencil: depth_stencil.stencil,
        });
    }

    unsafe fn cmd_pipeline_barrier(
        &self,
        _command_buffer: vk::CommandBuffer,
        _src_stage: vk::PipelineStageFlags,
        _dst_stage: vk::PipelineStageFlags,
        memory_barriers: &[vk::MemoryBarrier],
        image_barriers: &[vk::ImageMemoryBarrier],
    ) {
        for _ in memory_barriers {
            self.record(Call::MemoryBarrier);
        }
        for barrier in image_barriers {
            self.record(Call::Transition {
                image: barrier.image,
                old: barrier.old_layout,
                new: barrier.new_layout,
                aspect: barrier.subresource_range.aspect_mask,
            });
        }
    }

    unsafe fn queue_submit(
        &self,
        _queue: vk::Queue,
        submits: &[vk::SubmitInfo],
        _fence: vk::Fence,
    ) -> VkResult<()> {
        self.record(Call::Submit {
            array: submits.as_ptr() as usize,
            batches: submits.iter().map(|s| snapshot(s)).collect(),
        });
        if self.fail_submits.load(Ordering::Relaxed) {
            Err(vk::Result::ERROR_DEVICE_LOST)
        } else {
            Ok(())
        }
    }

    unsafe fn queue_present(&self, _queue: vk::Queue, _present_info: &vk::PresentInfoKHR) -> VkResult<bool> {
        self.record(Call::Present);
        Ok(false)
    }
}

// =============================================================================
// XR SIDE
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    InitSession,
    ProcessEvents,
    CreateLayers {
        width: u32,
        height: u32,
    },
    CopyColor3D {
        eye: Eye,
        image: vk::Image,
        frame: FrameIndex,
        layout: vk::ImageLayout,
    },
    CopyDepth3D {
        eye: Eye,
        image: vk::Image,
        frame: FrameIndex,
        layout: vk::ImageLayout,
    },
    Copy2D {
        image: vk::Image,
        frame: FrameIndex,
        layout: vk::ImageLayout,
    },
    BeginFrame {
        frame: FrameIndex,
        right_eye: bool,
    },
    Update,
    Render,
    DrawAndCopy {
        image: vk::Image,
        frame: FrameIndex,
    },
    Background3D {
        image: vk::Image,
        aspect_ratio: f32,
        layout: vk::ImageLayout,
    },
    BackgroundHud {
        image: vk::Image,
        layout: vk::ImageLayout,
    },
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub struct MockTexture {
    pub id: u64,
    pub wait_value: u64,
    pub signal_value: u64,
}

impl MockTexture {
    pub fn new(id: u64, wait_value: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            wait_value,
            signal_value: wait_value + 1,
        })
    }

    pub fn wait_semaphore(&self) -> vk::Semaphore {
        semaphore(0x5000 + self.id)
    }

    pub fn signal_semaphore(&self) -> vk::Semaphore {
        semaphore(0x6000 + self.id)
    }
}

impl SharedTexture for MockTexture {
    fn vulkan_wait_value(&self) -> u64 {
        self.wait_value
    }

    fn vulkan_signal_value(&self) -> u64 {
        self.signal_value
    }

    fn semaphore_for_wait(&self, _value: u64) -> vk::Semaphore {
        self.wait_semaphore()
    }

    fn semaphore_for_signal(&self, _value: u64) -> vk::Semaphore {
        self.signal_semaphore()
    }
}

struct TextureSource {
    next_id: AtomicU64,
}

impl TextureSource {
    fn next(&self) -> Arc<dyn SharedTexture> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        MockTexture::new(id, id * 10)
    }
}

struct MockLayer3D {
    events: EventLog,
    textures: Arc<TextureSource>,
}

impl Layer3D for MockLayer3D {
    fn copy_color_to_layer(
        &self,
        eye: Eye,
        _command_buffer: vk::CommandBuffer,
        image: vk::Image,
        frame: FrameIndex,
        current_layout: vk::ImageLayout,
    ) -> Arc<dyn SharedTexture> {
        self.events.lock().push(Event::CopyColor3D {
            eye,
            image,
            frame,
            layout: current_layout,
        });
        self.textures.next()
    }

    fn copy_depth_to_layer(
        &self,
        eye: Eye,
        _command_buffer: vk::CommandBuffer,
        image: vk::Image,
        frame: FrameIndex,
        current_layout: vk::ImageLayout,
    ) -> Arc<dyn SharedTexture> {
        self.events.lock().push(Event::CopyDepth3D {
            eye,
            image,
            frame,
            layout: current_layout,
        });
        self.textures.next()
    }

    fn aspect_ratio(&self, _eye: Eye) -> f32 {
        ASPECT_RATIO
    }
}

struct MockLayer2D {
    events: EventLog,
    textures: Arc<TextureSource>,
}

impl Layer2D for MockLayer2D {
    fn copy_color_to_layer(
        &self,
        _command_buffer: vk::CommandBuffer,
        image: vk::Image,
        frame: FrameIndex,
        current_layout: vk::ImageLayout,
    ) -> Arc<dyn SharedTexture> {
        self.events.lock().push(Event::Copy2D {
            image,
            frame,
            layout: current_layout,
        });
        self.textures.next()
    }
}

struct MockOverlay {
    events: EventLog,
}

impl Overlay for MockOverlay {
    fn begin_frame(&self, frame: FrameIndex, right_eye: bool) {
        self.events.lock().push(Event::BeginFrame { frame, right_eye });
    }

    fn update(&self) {
        self.events.lock().push(Event::Update);
    }

    fn render(&self) {
        self.events.lock().push(Event::Render);
    }

    fn draw_and_copy_to_image(&self, _command_buffer: vk::CommandBuffer, image: vk::Image, frame: FrameIndex) {
        self.events.lock().push(Event::DrawAndCopy { image, frame });
    }

    fn draw_3d_layer_as_background(
        &self,
        _command_buffer: vk::CommandBuffer,
        image: vk::Image,
        aspect_ratio: f32,
        _frame: FrameIndex,
        current_layout: vk::ImageLayout,
    ) {
        self.events.lock().push(Event::Background3D {
            image,
            aspect_ratio,
            layout: current_layout,
        });
    }

    fn draw_hud_layer_as_background(
        &self,
        _command_buffer: vk::CommandBuffer,
        image: vk::Image,
        _frame: FrameIndex,
        current_layout: vk::ImageLayout,
    ) {
        self.events.lock().push(Event::BackgroundHud {
            image,
            layout: current_layout,
        });
    }
}

pub struct MockRenderer {
    pub frames: FrameTracker,
    pub initialized: AtomicBool,
    pub rendering_3d: AtomicBool,
    pub with_overlay: bool,
    layers: Mutex<Option<Arc<Layers>>>,
    events: EventLog,
    textures: Arc<TextureSource>,
}

impl Renderer for MockRenderer {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    fn is_rendering_3d(&self, _frame: FrameIndex) -> bool {
        self.rendering_3d.load(Ordering::Relaxed)
    }

    fn frames(&self) -> &FrameTracker {
        &self.frames
    }

    fn layers(&self) -> Option<Arc<Layers>> {
        self.layers.lock().clone()
    }

    fn create_layers(&self, _command_buffer: vk::CommandBuffer, extent: vk::Extent2D) -> anyhow::Result<Arc<Layers>> {
        let mut slot = self.layers.lock();
        if slot.is_some() {
            anyhow::bail!("layers created twice");
        }

        self.events.lock().push(Event::CreateLayers {
            width: extent.width,
            height: extent.height,
        });

        let overlay: Option<Box<dyn Overlay>> = if self.with_overlay {
            Some(Box::new(MockOverlay {
                events: Arc::clone(&self.events),
            }))
        } else {
            None
        };
        let layers = Arc::new(Layers {
            layer_3d: Box::new(MockLayer3D {
                events: Arc::clone(&self.events),
                textures: Arc::clone(&self.textures),
            }),
            layer_2d: Box::new(MockLayer2D {
                events: Arc::clone(&self.events),
                textures: Arc::clone(&self.textures),
            }),
            overlay,
        });
        *slot = Some(Arc::clone(&layers));
        Ok(layers)
    }
}

pub struct MockRuntime {
    pub renderer: Mutex<Option<Arc<MockRenderer>>>,
    events: EventLog,
}

impl XrRuntime for MockRuntime {
    fn init_session(&self) {
        self.events.lock().push(Event::InitSession);
    }

    fn renderer(&self) -> Option<Arc<dyn Renderer>> {
        self.renderer
            .lock()
            .clone()
            .map(|renderer| renderer as Arc<dyn Renderer>)
    }

    fn process_events(&self) {
        self.events.lock().push(Event::ProcessEvents);
    }
}

// =============================================================================
// HARNESS
// =============================================================================

pub struct Harness {
    pub device: Arc<MockDevice>,
    pub runtime: Arc<MockRuntime>,
    pub renderer: Arc<MockRenderer>,
    pub layer: CaptureLayer,
    events: EventLog,
}

impl Harness {
    /// Initialized renderer with an overlay compositor
    pub fn new() -> Self {
        Self::with_overlay(true)
    }

    pub fn with_overlay(with_overlay: bool) -> Self {
        let events: EventLog = Arc::default();
        let renderer = Arc::new(MockRenderer {
            frames: FrameTracker::new(),
            initialized: AtomicBool::new(true),
            rendering_3d: AtomicBool::new(false),
            with_overlay,
            layers: Mutex::new(None),
            events: Arc::clone(&events),
            textures: Arc::new(TextureSource {
                next_id: AtomicU64::new(1),
            }),
        });
        let runtime = Arc::new(MockRuntime {
            renderer: Mutex::new(Some(Arc::clone(&renderer))),
            events: Arc::clone(&events),
        });
        let device = Arc::new(MockDevice::new());
        let layer = CaptureLayer::new(
            Arc::clone(&device) as Arc<dyn DeviceDispatch>,
            Arc::clone(&runtime) as Arc<dyn XrRuntime>,
            &CaptureConfig::default(),
        );

        Self {
            device,
            runtime,
            renderer,
            layer,
            events,
        }
    }

    pub fn create_image(&self, width: u32, height: u32, format: vk::Format) -> vk::Image {
        let info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .build();
        let image = unsafe { self.layer.create_image(&info, None) }.expect("mock create_image");
        self.device.take_calls();
        image
    }

    pub fn clear_color(&self, command_buffer: vk::CommandBuffer, image: vk::Image, layout: vk::ImageLayout, rgba: [f32; 4]) {
        let color = vk::ClearColorValue { float32: rgba };
        unsafe {
            self.layer
                .cmd_clear_color_image(command_buffer, image, layout, &color, &[color_range()])
        };
    }

    pub fn clear_depth(
        &self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        depth: f32,
        stencil: u32,
        range_count: usize,
    ) {
        let value = vk::ClearDepthStencilValue { depth, stencil };
        let ranges = vec![depth_range(); range_count];
        unsafe {
            self.layer.cmd_clear_depth_stencil_image(
                command_buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &value,
                &ranges,
            )
        };
    }

    pub fn take_calls(&self) -> Vec<Call> {
        self.device.take_calls()
    }

    pub fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Events other than session/housekeeping ones
    pub fn take_capture_events(&self) -> Vec<Event> {
        self.take_events()
            .into_iter()
            .filter(|e| !matches!(e, Event::InitSession | Event::CreateLayers { .. }))
            .collect()
    }

    pub fn create_layer_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, Event::CreateLayers { .. }))
            .count()
    }
}
