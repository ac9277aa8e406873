//! Core types, window functions, packed-spectrum algebra and resampling.

pub mod fft;
pub mod resample;
pub mod spectrum;
pub mod types;
pub mod window;

pub use types::*;
pub use window::{apply_window, generate_window, WindowType};
