//! Latent space projection of term-weight matrices.
//!
//! Two factorizations reduce a field's `|corpus| × |vocabulary|` matrix to a
//! `|corpus| × rank` dense matrix and keep the fitted model around to map
//! queries into the same space:
//!
//! - [`svd::TruncatedSvd`]: orthogonal basis, components may be negative,
//!   deterministic for a given seed.
//! - [`nmf::Nmf`]: non-negative factors, locally convergent from a random
//!   start. Without a configured seed two fits of the same matrix can differ
//!   by more than a rotation, so cached projections are what keeps rankings
//!   stable between calls.

pub mod linalg;
pub mod nmf;
pub mod projector;
pub mod svd;

pub use projector::{FactorizationMode, LatentProjection, LatentProjector};
