//! Reassembly of chunked image transfers.
//!
//! An image arrives as an image start, any number of chunks in any order and
//! an optional image end. Each in-flight id owns a [`TransferContext`]; the
//! [`Reassembler`] tracks them, enforces per-transfer time budgets and starts
//! background decoding when a transfer completes.

mod context;
mod error;
mod mask;
mod reassembler;

pub use context::TransferContext;
pub use error::ReassemblyError;
pub use mask::ChunkMask;
pub use reassembler::{Reassembler, ReassemblyLimits};

#[cfg(test)]
mod tests;
