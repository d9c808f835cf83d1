// Layout tracking for images we borrow from the host
//
// The host recorded its clear expecting the image in one layout. Whatever we
// insert in between has to leave the image exactly where we found it, no
// matter which branch we took.

use crate::backend::barrier::transition_layout;
use crate::backend::DeviceDispatch;
use ash::vk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    /// Whatever layout the host handed us
    Original,
    TransferSource,
    TransferDestination,
}

pub struct LayoutTracker<'a> {
    dispatch: &'a dyn DeviceDispatch,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    original: vk::ImageLayout,
    aspect_mask: vk::ImageAspectFlags,
    state: LayoutState,
}

impl<'a> LayoutTracker<'a> {
    /// # Safety
    ///
    /// `command_buffer` must be recording and `image` must be in `original`
    /// at this point of the stream. Dropping the tracker records a restoring
    /// transition if one is still owed.
    pub unsafe fn new(
        dispatch: &'a dyn DeviceDispatch,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        original: vk::ImageLayout,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Self {
        Self {
            dispatch,
            command_buffer,
            image,
            original,
            aspect_mask,
            state: LayoutState::Original,
        }
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    fn layout_of(&self, state: LayoutState) -> vk::ImageLayout {
        match state {
            LayoutState::Original => self.original,
            LayoutState::TransferSource => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            LayoutState::TransferDestination => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        }
    }

    /// Move the image into `target`, from wherever it currently is
    pub unsafe fn ensure_layout(&mut self, target: LayoutState) {
        if self.state == target {
            return;
        }

        let from = self.layout_of(self.state);
        let to = self.layout_of(target);
        if from != to {
            transition_layout(
                self.dispatch,
                self.command_buffer,
                self.image,
                from,
                to,
                self.aspect_mask,
            );
        }
        self.state = target;
    }

    /// Put the image back into the host's layout
    pub unsafe fn restore(&mut self) {
        self.ensure_layout(LayoutState::Original);
    }
}

impl Drop for LayoutTracker<'_> {
    fn drop(&mut self) {
        if self.state != LayoutState::Original {
            // SAFETY: `new` requires a recording command buffer for the
            // tracker's whole lifetime.
            unsafe { self.restore() };
        }
    }
}
