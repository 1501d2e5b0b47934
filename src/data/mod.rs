pub mod buffer;
pub mod dataset;
pub mod loader;
pub mod text;

pub use buffer::{BackgroundValue, SignalBuffer};
pub use dataset::{Dataset, Intensity, DEFAULT_DATASET_NAME};
pub use loader::Loader;
pub use text::TextLoader;
