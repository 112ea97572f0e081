//! Text encoder trait for the semantic strategy.

use crate::error::Result;

/// Turns text into a fixed-length dense vector.
///
/// Implementations must be deterministic for a given model: the embedding
/// store assumes that encoding the same text twice yields the same vector,
/// which is what makes a cached corpus matrix comparable with fresh query
/// vectors.
///
/// # Examples
///
/// ```
/// use strata::embedding::TextEncoder;
/// use strata::error::Result;
///
/// struct LengthEncoder;
///
/// impl TextEncoder for LengthEncoder {
///     fn encode(&self, text: &str) -> Result<Vec<f32>> {
///         Ok(vec![text.len() as f32, 1.0])
///     }
///
///     fn dimension(&self) -> usize {
///         2
///     }
/// }
///
/// let vectors = LengthEncoder.encode_batch(&["a", "abc"]).unwrap();
/// assert_eq!(vectors[1], vec![3.0, 1.0]);
/// ```
pub trait TextEncoder: Send + Sync {
    /// Encode a single text.
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Encode several texts, in order.
    ///
    /// The default encodes one at a time; backends with real batching
    /// should override it.
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }

    /// Length of every produced vector.
    fn dimension(&self) -> usize;

    /// Model identifier, used in logs.
    fn name(&self) -> &str {
        "text_encoder"
    }
}
