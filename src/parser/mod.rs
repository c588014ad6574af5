pub mod normalize;
pub mod stream_utils;
pub mod utils;
