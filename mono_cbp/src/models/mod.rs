pub mod eclipse;
pub mod epoch;
pub mod event;
pub mod light_curve;

pub use eclipse::*;
pub use epoch::*;
pub use event::*;
pub use light_curve::*;
