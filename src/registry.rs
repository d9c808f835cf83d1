// Image registry
//
// Remembers the extent and format of every image big enough to be one of the
// host's render targets, plus which of them we have settled on as the current
// 3D color and depth targets. One lock covers all three so a destroy can
// never leave a cache pointing at a dead handle.

use crate::error::protocol_violation;
use ash::vk;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Format of the host's 3D scene color target
pub const SCENE_COLOR_FORMAT: vk::Format = vk::Format::B10G11R11_UFLOAT_PACK32;
/// Format of the host's 3D scene depth target
pub const SCENE_DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

#[derive(Debug, Clone, Copy)]
pub struct ImageRecord {
    pub extent: vk::Extent2D,
    pub format: vk::Format,
}

#[derive(Debug, Default)]
struct RegistryState {
    images: HashMap<vk::Image, ImageRecord>,
    current_color: Option<vk::Image>,
    current_depth: Option<vk::Image>,
}

pub struct ImageRegistry {
    min_extent: vk::Extent2D,
    state: Mutex<RegistryState>,
}

impl ImageRegistry {
    pub fn new(min_extent: vk::Extent2D) -> Self {
        Self {
            min_extent,
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn is_candidate(&self, extent: vk::Extent2D) -> bool {
        extent.width >= self.min_extent.width && extent.height >= self.min_extent.height
    }

    /// Record a freshly created image. Returns false for images below the
    /// capture threshold, which are never tracked.
    pub fn register(&self, image: vk::Image, extent: vk::Extent2D, format: vk::Format) -> bool {
        if !self.is_candidate(extent) {
            return false;
        }

        let mut state = self.state.lock();
        if state.images.contains_key(&image) {
            drop(state);
            protocol_violation(format_args!("image {:?} registered twice", image));
        }
        state.images.insert(image, ImageRecord { extent, format });
        log::trace!(
            "Tracking image {:?}: {}x{} @ {:?}",
            image,
            extent.width,
            extent.height,
            format
        );
        true
    }

    pub fn unregister(&self, image: vk::Image) {
        let mut state = self.state.lock();
        state.images.remove(&image);
        if state.current_color == Some(image) {
            log::debug!("Current 3D color image {:?} destroyed", image);
            state.current_color = None;
        }
        if state.current_depth == Some(image) {
            log::debug!("Current 3D depth image {:?} destroyed", image);
            state.current_depth = None;
        }
    }

    pub fn lookup(&self, image: vk::Image) -> Option<ImageRecord> {
        self.state.lock().images.get(&image).copied()
    }

    /// Current 3D color target, adopting `image` if nothing is cached yet and
    /// it has the scene color format.
    pub fn resolve_current_color(&self, image: vk::Image) -> Option<vk::Image> {
        let mut state = self.state.lock();
        let state = &mut *state;
        Self::resolve(&state.images, &mut state.current_color, image, SCENE_COLOR_FORMAT)
    }

    /// Current 3D depth target, adopting `image` if nothing is cached yet and
    /// it has the scene depth format.
    pub fn resolve_current_depth(&self, image: vk::Image) -> Option<vk::Image> {
        let mut state = self.state.lock();
        let state = &mut *state;
        Self::resolve(&state.images, &mut state.current_depth, image, SCENE_DEPTH_FORMAT)
    }

    fn resolve(
        images: &HashMap<vk::Image, ImageRecord>,
        cache: &mut Option<vk::Image>,
        image: vk::Image,
        expected: vk::Format,
    ) -> Option<vk::Image> {
        if cache.is_none() {
            if let Some(record) = images.get(&image) {
                if record.format == expected {
                    log::info!("Adopted {:?} as current 3D target ({:?})", image, expected);
                    *cache = Some(image);
                }
            }
        }
        *cache
    }

    pub fn len(&self) -> usize {
        self.state.lock().images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
