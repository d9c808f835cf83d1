// Device dispatch - the next link in the Vulkan call chain
//
// Responsibilities:
// - Name exactly the driver calls the layer needs to forward or insert
// - Load those calls from the next layer's vkGetInstanceProcAddr
//
// Everything not listed here never reaches this crate; it goes straight
// through the loader's generic pass-through.

use anyhow::Result;
use ash::prelude::VkResult;
use ash::vk;

/// Driver entry points used by the capture layer.
///
/// # Safety
///
/// Every method has the contract of the Vulkan command it forwards: handles
/// must belong to the device behind this dispatch and pointer chains inside
/// create/submit infos must be valid for the duration of the call.
pub trait DeviceDispatch: Send + Sync {
    unsafe fn create_image(
        &self,
        create_info: &vk::ImageCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Image>;

    unsafe fn destroy_image(&self, image: vk::Image, allocator: Option<&vk::AllocationCallbacks>);

    unsafe fn create_semaphore(
        &self,
        create_info: &vk::SemaphoreCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Semaphore>;

    unsafe fn destroy_semaphore(
        &self,
        semaphore: vk::Semaphore,
        allocator: Option<&vk::AllocationCallbacks>,
    );

    unsafe fn cmd_clear_color_image(
        &self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        color: &vk::ClearColorValue,
        ranges: &[vk::ImageSubresourceRange],
    );

    unsafe fn cmd_clear_depth_stencil_image(
        &self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        depth_stencil: &vk::ClearDepthStencilValue,
        ranges: &[vk::ImageSubresourceRange],
    );

    unsafe fn cmd_pipeline_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        memory_barriers: &[vk::MemoryBarrier],
        image_barriers: &[vk::ImageMemoryBarrier],
    );

    unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submits: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> VkResult<()>;

    /// Returns whether the swapchain is suboptimal
    unsafe fn queue_present(&self, queue: vk::Queue, present_info: &vk::PresentInfoKHR) -> VkResult<bool>;
}

/// Dispatch backed by ash's function tables
pub struct AshDispatch {
    pub device: ash::Device,
    pub swapchain_loader: ash::extensions::khr::Swapchain,
}

impl AshDispatch {
    pub fn new(device: ash::Device, swapchain_loader: ash::extensions::khr::Swapchain) -> Self {
        Self {
            device,
            swapchain_loader,
        }
    }

    /// Load the next layer's device functions
    ///
    /// # Safety
    ///
    /// `next_get_instance_proc_addr` must be the next link's resolver and
    /// `instance`/`device` must be live handles created through it.
    pub unsafe fn load(
        next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
        instance: vk::Instance,
        device: vk::Device,
    ) -> Result<Self> {
        if instance == vk::Instance::null() || device == vk::Device::null() {
            anyhow::bail!("Cannot load device dispatch for a null instance or device");
        }

        let static_fn = vk::StaticFn {
            get_instance_proc_addr: next_get_instance_proc_addr,
        };
        let instance = ash::Instance::load(&static_fn, instance);
        let device = ash::Device::load(instance.fp_v1_0(), device);
        let swapchain_loader = ash::extensions::khr::Swapchain::new(&instance, &device);

        log::info!("Loaded device dispatch for {:?}", device.handle());
        Ok(Self::new(device, swapchain_loader))
    }
}

impl DeviceDispatch for AshDispatch {
    unsafe fn create_image(
        &self,
        create_info: &vk::ImageCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Image> {
        self.device.create_image(create_info, allocator)
    }

    unsafe fn destroy_image(&self, image: vk::Image, allocator: Option<&vk::AllocationCallbacks>) {
        self.device.destroy_image(image, allocator)
    }

    unsafe fn create_semaphore(
        &self,
        create_info: &vk::SemaphoreCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Semaphore> {
        self.device.create_semaphore(create_info, allocator)
    }

    unsafe fn destroy_semaphore(
        &self,
        semaphore: vk::Semaphore,
        allocator: Option<&vk::AllocationCallbacks>,
    ) {
        self.device.destroy_semaphore(semaphore, allocator)
    }

    unsafe fn cmd_clear_color_image(
        &self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        color: &vk::ClearColorValue,
        ranges: &[vk::ImageSubresourceRange],
    ) {
        self.device
            .cmd_clear_color_image(command_buffer, image, layout, color, ranges)
    }

    unsafe fn cmd_clear_depth_stencil_image(
        &self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        depth_stencil: &vk::ClearDepthStencilValue,
        ranges: &[vk::ImageSubresourceRange],
    ) {
        self.device
            .cmd_clear_depth_stencil_image(command_buffer, image, layout, depth_stencil, ranges)
    }

    unsafe fn cmd_pipeline_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        memory_barriers: &[vk::MemoryBarrier],
        image_barriers: &[vk::ImageMemoryBarrier],
    ) {
        self.device.cmd_pipeline_barrier(
            command_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            memory_barriers,
            &[], // Buffer barriers
            image_barriers,
        )
    }

    unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submits: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> VkResult<()> {
        self.device.queue_submit(queue, submits, fence)
    }

    unsafe fn queue_present(&self, queue: vk::Queue, present_info: &vk::PresentInfoKHR) -> VkResult<bool> {
        self.swapchain_loader.queue_present(queue, present_info)
    }
}
