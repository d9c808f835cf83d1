// =============================================================================
// MARKER DECODER - Sentinel values hidden in clear commands
// =============================================================================
//
// The host renderer was patched to clear its render targets with values no
// real frame would use. The color clear encodes:
//
//   g/b  0.125 / 0.98 for the left eye, swapped for the right eye
//   r    capture index * (1/32): 0 = 3D scene pass, 2 = 2D HUD pass
//   a    frame slot (< 0.5 is slot 0)
//
// The depth clear encodes the eye in the depth value and the frame slot in
// the stencil value. The windows below are wide because the clear values go
// through the host's own float conversions before reaching us.

use crate::error::MarkerError;
use crate::frame::FrameIndex;
use std::fmt;
use std::ops::RangeInclusive;

const MARKER_LOW: RangeInclusive<f64> = 0.12..=0.13;
const MARKER_HIGH: RangeInclusive<f64> = 0.97..=0.99;

/// Around 0.0123456789
const DEPTH_LEFT: RangeInclusive<f64> = 0.011456789..=0.013456789;
/// Around 0.163987654
const DEPTH_RIGHT: RangeInclusive<f64> = 0.153987654..=0.173987654;

const CAPTURE_INDEX_SCALE: f32 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left = 0,
    Right = 1,
}

impl Eye {
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eye::Left => f.write_str("left"),
            Eye::Right => f.write_str("right"),
        }
    }
}

/// Which pass a color marker belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapturePass {
    /// Capture index 0
    Scene3D,
    /// Capture index 2
    Hud2D,
}

impl fmt::Display for CapturePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturePass::Scene3D => f.write_str("3D"),
            CapturePass::Hud2D => f.write_str("2D"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMarker {
    pub eye: Eye,
    pub pass: CapturePass,
    pub frame: FrameIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthMarker {
    pub eye: Eye,
    pub frame: FrameIndex,
}

/// Result of classifying one clear payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// An ordinary clear, forward it untouched
    None,
    Color(ColorMarker),
    Depth(DepthMarker),
}

fn color_eye(rgba: &[f32; 4]) -> Option<Eye> {
    let g = f64::from(rgba[1]);
    let b = f64::from(rgba[2]);
    if MARKER_LOW.contains(&g) && MARKER_HIGH.contains(&b) {
        Some(Eye::Left)
    } else if MARKER_LOW.contains(&b) && MARKER_HIGH.contains(&g) {
        Some(Eye::Right)
    } else {
        None
    }
}

/// Classify a float clear color.
///
/// Errors only once an eye has been recognized: an unrecognized payload is
/// always `Marker::None`, whatever its other channels hold.
pub fn decode_color(rgba: &[f32; 4]) -> Result<Marker, MarkerError> {
    let Some(eye) = color_eye(rgba) else {
        return Ok(Marker::None);
    };

    let scaled = rgba[0] * CAPTURE_INDEX_SCALE;
    if !scaled.is_finite() {
        return Err(MarkerError::NonFiniteCaptureIndex(rgba[0]));
    }
    let pass = match scaled.round() as i64 {
        0 => CapturePass::Scene3D,
        2 => CapturePass::Hud2D,
        other => return Err(MarkerError::InvalidCaptureIndex(other)),
    };

    let frame = if rgba[3] < 0.5 {
        FrameIndex::Even
    } else {
        FrameIndex::Odd
    };

    Ok(Marker::Color(ColorMarker { eye, pass, frame }))
}

/// Classify a depth/stencil clear.
///
/// Only single-range clears can carry a marker.
pub fn decode_depth(depth: f32, stencil: u32, range_count: usize) -> Result<Marker, MarkerError> {
    if range_count != 1 {
        return Ok(Marker::None);
    }

    let value = f64::from(depth);
    let eye = if DEPTH_LEFT.contains(&value) {
        Eye::Left
    } else if DEPTH_RIGHT.contains(&value) {
        Eye::Right
    } else {
        return Ok(Marker::None);
    };

    let frame = FrameIndex::from_index(stencil).ok_or(MarkerError::InvalidFrameIndex(stencil))?;

    Ok(Marker::Depth(DepthMarker { eye, frame }))
}
