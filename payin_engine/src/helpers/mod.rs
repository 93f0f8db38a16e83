mod clock;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
