//! CIFAR-10 test-split pipeline: fetch, parse, normalize, batch.

mod cifar;
mod fetch;
mod loader;
mod transform;

pub use cifar::{
    CifarDataset, BATCHES_DIR, CLASS_NAMES, IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH,
    PIXELS_PER_IMAGE, TEST_BATCH_FILE,
};
pub use fetch::{resolve_data_dir, DatasetFetcher, CIFAR10_URL};
pub use loader::{Batch, DataLoader};
pub use transform::Normalize;
