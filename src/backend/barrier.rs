// Pipeline barriers recorded into the host's command buffers
//
// We do not know what the host recorded before or after us, so every barrier
// here is deliberately broad: all commands, all memory.

use super::DeviceDispatch;
use ash::vk;

/// Every mip level and array layer of the given aspect
pub fn full_range(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: 0,
        level_count: vk::REMAINING_MIP_LEVELS,
        base_array_layer: 0,
        layer_count: vk::REMAINING_ARRAY_LAYERS,
    }
}

/// Move an image between layouts.
///
/// # Safety
///
/// `command_buffer` must be recording and `image` must currently be in
/// `old_layout` at this point of the command stream.
pub unsafe fn transition_layout(
    dispatch: &dyn DeviceDispatch,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    aspect_mask: vk::ImageAspectFlags,
) {
    let barrier = vk::ImageMemoryBarrier::builder()
        .src_access_mask(vk::AccessFlags::MEMORY_WRITE)
        .dst_access_mask(vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE)
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(full_range(aspect_mask))
        .build();

    dispatch.cmd_pipeline_barrier(
        command_buffer,
        vk::PipelineStageFlags::ALL_COMMANDS,
        vk::PipelineStageFlags::ALL_COMMANDS,
        &[],
        &[barrier],
    );
}

/// Full memory barrier between whatever we just inserted and what follows.
///
/// # Safety
///
/// `command_buffer` must be recording.
pub unsafe fn memory_barrier(dispatch: &dyn DeviceDispatch, command_buffer: vk::CommandBuffer) {
    let barrier = vk::MemoryBarrier::builder()
        .src_access_mask(vk::AccessFlags::MEMORY_WRITE)
        .dst_access_mask(vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE)
        .build();

    dispatch.cmd_pipeline_barrier(
        command_buffer,
        vk::PipelineStageFlags::ALL_COMMANDS,
        vk::PipelineStageFlags::ALL_COMMANDS,
        &[barrier],
        &[],
    );
}
