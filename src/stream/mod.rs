//! Stream combinators for subscribers

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
