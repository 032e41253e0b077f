pub mod compressor;

pub use compressor::{CompressionConfig, Compressor};
