//! Audio capture and playback.

pub mod capture;
pub mod device_guard;
pub mod playback;
