pub mod animation;
pub mod buffer;
pub mod sample;
pub mod types;
pub mod viewport;
pub mod windowing;

pub use animation::AnimationScheduler;
pub use buffer::{BufferEvent, FrequencyStats, SampleBuffer, SubscriptionId};
pub use sample::{RawSample, Sample};
pub use types::{DataPoint, ScreenPoint, Viewport};
pub use viewport::{PriceRange, ViewportTransform};
