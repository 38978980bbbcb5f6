pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `wpkeeper::discovery` instead of `wpkeeper::core::discovery`
pub use core::*;
pub use utils::*;
