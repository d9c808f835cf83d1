// Synchronization bookkeeping
//
// The host creates binary and timeline semaphores through the same entry
// point; the only difference is a struct hanging off pNext. We remember which
// handles are timelines, and provide the pNext walk used for both semaphore
// creation and queue submission.

use ash::vk;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::ffi::c_void;

/// Find the first structure of `s_type` in a pNext chain.
///
/// # Safety
///
/// `p_next` must be null or point to a valid chain of Vulkan input
/// structures, and the structure tagged `s_type` must really be a `T`.
pub unsafe fn find_in_chain<'a, T>(p_next: *const c_void, s_type: vk::StructureType) -> Option<&'a T> {
    let mut it = p_next as *const vk::BaseInStructure;
    while !it.is_null() {
        if (*it).s_type == s_type {
            return Some(&*(it as *const T));
        }
        it = (*it).p_next;
    }
    None
}

/// Borrow a Vulkan (pointer, count) pair as a slice.
///
/// # Safety
///
/// Unless `count` is zero or `ptr` is null, `ptr` must point to `count`
/// initialized values that outlive `'a`.
pub unsafe fn raw_slice<'a, T>(ptr: *const T, count: u32) -> &'a [T] {
    if ptr.is_null() || count == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, count as usize)
    }
}

/// Does this creation request ask for a timeline semaphore?
///
/// # Safety
///
/// The pNext chain of `create_info` must be valid.
pub unsafe fn requests_timeline(create_info: &vk::SemaphoreCreateInfo) -> bool {
    find_in_chain::<vk::SemaphoreTypeCreateInfo>(
        create_info.p_next,
        vk::StructureType::SEMAPHORE_TYPE_CREATE_INFO,
    )
    .map_or(false, |info| info.semaphore_type == vk::SemaphoreType::TIMELINE)
}

/// Set of live semaphores created with timeline semantics
#[derive(Debug, Default)]
pub struct TimelineSemaphores {
    handles: Mutex<HashSet<vk::Semaphore>>,
}

impl TimelineSemaphores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, semaphore: vk::Semaphore) {
        self.handles.lock().insert(semaphore);
    }

    pub fn remove(&self, semaphore: vk::Semaphore) {
        self.handles.lock().remove(&semaphore);
    }

    pub fn is_timeline(&self, semaphore: vk::Semaphore) -> bool {
        self.handles.lock().contains(&semaphore)
    }

    pub fn any_timeline(&self, semaphores: &[vk::Semaphore]) -> bool {
        let handles = self.handles.lock();
        semaphores.iter().any(|s| handles.contains(s))
    }
}
