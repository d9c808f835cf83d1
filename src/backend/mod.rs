// Backend module - the layer's view of the Vulkan driver
//
// Design: the driver is reached through a trait so the capture logic can be
// driven by a recording fake in tests and by ash's tables in production.

pub mod barrier;
pub mod dispatch;
pub mod sync;

pub use dispatch::{AshDispatch, DeviceDispatch};
pub use sync::TimelineSemaphores;
