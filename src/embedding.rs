//! Semantic embeddings: encoders and the persisted corpus matrix.

pub mod cache;
pub mod encoder;
pub mod store;

#[cfg(feature = "embeddings-candle")]
pub mod candle_encoder;

#[cfg(feature = "embeddings-candle")]
pub use candle_encoder::CandleTextEncoder;
pub use encoder::TextEncoder;
pub use store::EmbeddingStore;
