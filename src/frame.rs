// Frame state tracking
//
// The host renderer alternates between two frame slots. Each slot remembers
// which surfaces were already copied out so a second clear of the same
// surface within one frame does not trigger another capture.

use crate::marker::Eye;
use parking_lot::Mutex;
use std::fmt;

/// Double-buffer index carried by every marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameIndex {
    Even = 0,
    Odd = 1,
}

impl FrameIndex {
    pub const ALL: [FrameIndex; 2] = [FrameIndex::Even, FrameIndex::Odd];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(FrameIndex::Even),
            1 => Some(FrameIndex::Odd),
            _ => None,
        }
    }
}

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// What has already been captured in one frame slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCaptures {
    pub copied_color: [bool; 2],
    pub copied_depth: [bool; 2],
    pub copied_2d: bool,
}

impl FrameCaptures {
    pub fn color_copied(&self, eye: Eye) -> bool {
        self.copied_color[eye.index()]
    }

    pub fn depth_copied(&self, eye: Eye) -> bool {
        self.copied_depth[eye.index()]
    }
}

/// Both frame slots behind one lock.
///
/// The capture path only ever sets flags. Clearing a slot belongs to whoever
/// drives presentation, once the frame that used it has been handed off.
#[derive(Debug, Default)]
pub struct FrameTracker {
    slots: Mutex<[FrameCaptures; 2]>,
}

impl FrameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, frame: FrameIndex) -> FrameCaptures {
        self.slots.lock()[frame.index()]
    }

    pub fn mark_color(&self, eye: Eye, frame: FrameIndex) {
        self.slots.lock()[frame.index()].copied_color[eye.index()] = true;
    }

    pub fn mark_depth(&self, eye: Eye, frame: FrameIndex) {
        self.slots.lock()[frame.index()].copied_depth[eye.index()] = true;
    }

    pub fn mark_2d(&self, frame: FrameIndex) {
        self.slots.lock()[frame.index()].copied_2d = true;
    }

    /// Make a slot available for capture again
    pub fn reset(&self, frame: FrameIndex) {
        self.slots.lock()[frame.index()] = FrameCaptures::default();
    }
}
