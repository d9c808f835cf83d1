// Hand-off queue
//
// A copy recorded into a command buffer is only meaningful to the external
// compositor once that command buffer is submitted with the texture's
// semaphores attached. Recording and submission happen on different threads,
// so pending copies wait here until the submit that carries them.

use crate::runtime::SharedTexture;
use ash::vk;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

pub struct PendingCopy {
    pub command_buffer: vk::CommandBuffer,
    pub texture: Arc<dyn SharedTexture>,
}

/// The queue contents, reachable only while the lock is held
#[derive(Default)]
pub struct PendingCopies(Vec<PendingCopy>);

impl PendingCopies {
    /// Remove every entry recorded into `command_buffer`, keeping the
    /// remaining entries in their original order.
    pub fn drain_matching(&mut self, command_buffer: vk::CommandBuffer) -> Vec<Arc<dyn SharedTexture>> {
        let mut drained = Vec::new();
        self.0.retain(|pending| {
            if pending.command_buffer == command_buffer {
                drained.push(Arc::clone(&pending.texture));
                false
            } else {
                true
            }
        });
        drained
    }

    pub fn command_buffers(&self) -> impl Iterator<Item = vk::CommandBuffer> + '_ {
        self.0.iter().map(|pending| pending.command_buffer)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Default)]
pub struct HandoffQueue {
    pending: Mutex<PendingCopies>,
}

impl HandoffQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, command_buffer: vk::CommandBuffer, texture: Arc<dyn SharedTexture>) {
        self.pending.lock().0.push(PendingCopy {
            command_buffer,
            texture,
        });
    }

    pub fn drain_matching(&self, command_buffer: vk::CommandBuffer) -> Vec<Arc<dyn SharedTexture>> {
        self.pending.lock().drain_matching(command_buffer)
    }

    /// Hold the queue across a multi-step scan, e.g. a whole submit call
    pub fn lock(&self) -> MutexGuard<'_, PendingCopies> {
        self.pending.lock()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
