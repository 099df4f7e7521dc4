pub mod architecture;
pub mod persist;
pub mod sequential;

pub use architecture::{build_kan_cnn, INPUT_CHANNELS, INPUT_SIZE, NUM_CLASSES};
pub use sequential::Sequential;
