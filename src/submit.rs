// =============================================================================
// SUBMISSION SYNCHRONIZER - Attach hand-off semaphores to the host's submits
// =============================================================================
//
// When the host submits a command buffer that carries one of our copies, the
// submit has to:
//   - wait on the shared texture's timeline value, so we never overwrite a
//     texture the compositor is still reading
//   - signal the next timeline value, so the compositor knows the copy landed
//
// The caller's VkSubmitInfo array is never touched. Each batch that needs
// extra semaphores gets a shadow copy whose arrays we own; batches without
// matches are copied verbatim.

use crate::backend::sync::{find_in_chain, raw_slice};
use crate::backend::TimelineSemaphores;
use crate::handoff::HandoffQueue;
use crate::runtime::SharedTexture;
use ash::vk;
use std::ffi::c_void;
use std::sync::Arc;

/// Owned storage behind one rewritten VkSubmitInfo.
///
/// The Vec heap buffers and the boxed timeline struct never move once built,
/// so the pointers handed to the driver stay valid for as long as this lives.
struct ShadowSubmit {
    wait_semaphores: Vec<vk::Semaphore>,
    wait_stages: Vec<vk::PipelineStageFlags>,
    wait_values: Vec<u64>,
    signal_semaphores: Vec<vk::Semaphore>,
    signal_values: Vec<u64>,
    timeline: Box<vk::TimelineSemaphoreSubmitInfo>,
}

impl ShadowSubmit {
    /// # Safety
    ///
    /// All pointers in `submit` (including its pNext chain) must be valid.
    unsafe fn build(
        submit: &vk::SubmitInfo,
        textures: &[Arc<dyn SharedTexture>],
        timelines: &TimelineSemaphores,
    ) -> Self {
        let wait_count = submit.wait_semaphore_count;
        let signal_count = submit.signal_semaphore_count;

        let mut wait_semaphores = raw_slice(submit.p_wait_semaphores, wait_count).to_vec();
        let mut wait_stages = raw_slice(submit.p_wait_dst_stage_mask, wait_count).to_vec();
        let mut wait_values = vec![0u64; wait_count as usize];
        let mut signal_semaphores = raw_slice(submit.p_signal_semaphores, signal_count).to_vec();
        let mut signal_values = vec![0u64; signal_count as usize];

        let existing = find_in_chain::<vk::TimelineSemaphoreSubmitInfo>(
            submit.p_next,
            vk::StructureType::TIMELINE_SEMAPHORE_SUBMIT_INFO,
        );
        match existing {
            Some(info) => {
                let waits = raw_slice(info.p_wait_semaphore_values, info.wait_semaphore_value_count);
                let n = waits.len().min(wait_values.len());
                wait_values[..n].copy_from_slice(&waits[..n]);

                let signals = raw_slice(info.p_signal_semaphore_values, info.signal_semaphore_value_count);
                let n = signals.len().min(signal_values.len());
                signal_values[..n].copy_from_slice(&signals[..n]);
            }
            None => {
                if timelines.any_timeline(&wait_semaphores) || timelines.any_timeline(&signal_semaphores) {
                    log::warn!("Submit uses timeline semaphores without timeline values; they will read as 0");
                }
            }
        }

        for texture in textures {
            let wait_value = texture.vulkan_wait_value();
            wait_semaphores.push(texture.semaphore_for_wait(wait_value));
            wait_stages.push(vk::PipelineStageFlags::ALL_COMMANDS);
            wait_values.push(wait_value);

            let signal_value = texture.vulkan_signal_value();
            signal_semaphores.push(texture.semaphore_for_signal(signal_value));
            signal_values.push(signal_value);
        }

        // Ours goes first; the caller's chain, including any timeline info of
        // its own, hangs below it untouched. The driver uses the first match.
        let timeline = Box::new(vk::TimelineSemaphoreSubmitInfo {
            p_next: submit.p_next,
            wait_semaphore_value_count: wait_values.len() as u32,
            p_wait_semaphore_values: wait_values.as_ptr(),
            signal_semaphore_value_count: signal_values.len() as u32,
            p_signal_semaphore_values: signal_values.as_ptr(),
            ..Default::default()
        });

        Self {
            wait_semaphores,
            wait_stages,
            wait_values,
            signal_semaphores,
            signal_values,
            timeline,
        }
    }

    fn submit_info(&self, original: &vk::SubmitInfo) -> vk::SubmitInfo {
        debug_assert_eq!(self.wait_values.len(), self.wait_semaphores.len());
        debug_assert_eq!(self.signal_values.len(), self.signal_semaphores.len());

        vk::SubmitInfo {
            p_next: &*self.timeline as *const vk::TimelineSemaphoreSubmitInfo as *const c_void,
            wait_semaphore_count: self.wait_semaphores.len() as u32,
            p_wait_semaphores: self.wait_semaphores.as_ptr(),
            p_wait_dst_stage_mask: self.wait_stages.as_ptr(),
            signal_semaphore_count: self.signal_semaphores.len() as u32,
            p_signal_semaphores: self.signal_semaphores.as_ptr(),
            ..*original
        }
    }
}

/// A submit array with hand-off semaphores injected
pub struct RewrittenSubmits {
    // Backing storage for `submits`
    _shadows: Vec<ShadowSubmit>,
    submits: Vec<vk::SubmitInfo>,
    injected: usize,
}

impl RewrittenSubmits {
    pub fn submits(&self) -> &[vk::SubmitInfo] {
        &self.submits
    }

    /// Number of hand-offs attached across all batches
    pub fn injected(&self) -> usize {
        self.injected
    }
}

/// Attach pending hand-offs to the batches whose command buffers carry them.
///
/// Returns `None` when nothing needs attaching; the caller then forwards its
/// own array untouched.
///
/// # Safety
///
/// Every pointer in `submits` must be valid, as for vkQueueSubmit.
pub unsafe fn rewrite_submits(
    handoff: &HandoffQueue,
    timelines: &TimelineSemaphores,
    submits: &[vk::SubmitInfo],
) -> Option<RewrittenSubmits> {
    if handoff.is_empty() {
        return None;
    }

    let mut pending = handoff.lock();
    let mut shadows = Vec::new();
    let mut plan = Vec::with_capacity(submits.len());
    let mut injected = 0;

    for submit in submits {
        let command_buffers = raw_slice(submit.p_command_buffers, submit.command_buffer_count);
        let textures: Vec<_> = command_buffers
            .iter()
            .flat_map(|&command_buffer| pending.drain_matching(command_buffer))
            .collect();

        if textures.is_empty() {
            plan.push(None);
            continue;
        }

        injected += textures.len();
        plan.push(Some(shadows.len()));
        shadows.push(ShadowSubmit::build(submit, &textures, timelines));
    }
    drop(pending);

    if injected == 0 {
        return None;
    }

    let submits = submits
        .iter()
        .zip(&plan)
        .map(|(original, slot)| match slot {
            Some(index) => shadows[*index].submit_info(original),
            None => *original,
        })
        .collect();

    log::trace!("Attached {} hand-off(s) to queue submit", injected);

    Some(RewrittenSubmits {
        _shadows: shadows,
        submits,
        injected,
    })
}
