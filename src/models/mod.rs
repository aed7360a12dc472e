pub mod link;
pub mod observation;

// Re-exports for convenience
pub use link::*;
pub use observation::*;
