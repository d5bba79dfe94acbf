// Copyright 2025 Bilinear Labs - MIT License

//! The underlying hash algorithm contract and the internal-node combination rule.

use crate::node::Node;
use tracing::trace;

/// Byte prepended to every internal-node hash so it can't collide with a leaf hash.
pub const INNER_PREFIX: u8 = 0x01;

/// Minimal streaming hash contract the tree is built on.
///
/// `sum` finalizes the current state. Implementations are free to leave the
/// state reset or exhausted afterwards, so callers always `reset` before reuse.
#[cfg_attr(test, mockall::automock)]
pub trait Algorithm {
    fn reset(&mut self);
    fn write(&mut self, data: &[u8]);
    fn sum(&mut self) -> Vec<u8>;
    fn size(&self) -> usize;

    fn block_size(&self) -> usize {
        self.size()
    }
}

/// Computes `Hash(INNER_PREFIX || left || right)`. Order matters.
pub fn combine<A: Algorithm + ?Sized>(algorithm: &mut A, left: &Node, right: &Node) -> Node {
    algorithm.reset();
    algorithm.write(&[INNER_PREFIX]);
    algorithm.write(left.as_ref());
    algorithm.write(right.as_ref());
    let parent = Node::from(algorithm.sum());
    trace!(%left, %right, %parent, "combined pair");
    parent
}

/// Root of a tree that never received a leaf: the digest of empty input.
pub fn empty_root<A: Algorithm + ?Sized>(algorithm: &mut A) -> Node {
    algorithm.reset();
    Node::from(algorithm.sum())
}

// Any RustCrypto hasher (sha1, sha2, blake2, tiger...) works as the underlying algorithm.
#[cfg(feature = "digest")]
impl<D: digest::DynDigest> Algorithm for D {
    fn reset(&mut self) {
        digest::DynDigest::reset(self);
    }

    fn write(&mut self, data: &[u8]) {
        self.update(data);
    }

    fn sum(&mut self) -> Vec<u8> {
        self.finalize_reset().into_vec()
    }

    fn size(&self) -> usize {
        self.output_size()
    }
}

/// Implements the keccak256 hash function.
#[cfg(feature = "keccak")]
pub struct Keccak256(tiny_keccak::Keccak);

#[cfg(feature = "keccak")]
impl Keccak256 {
    pub const LEN: usize = 32;

    pub fn new() -> Self {
        Keccak256(tiny_keccak::Keccak::v256())
    }
}

#[cfg(feature = "keccak")]
impl Default for Keccak256 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "keccak")]
impl Algorithm for Keccak256 {
    fn reset(&mut self) {
        self.0 = tiny_keccak::Keccak::v256();
    }

    fn write(&mut self, data: &[u8]) {
        use tiny_keccak::Hasher;
        self.0.update(data);
    }

    fn sum(&mut self) -> Vec<u8> {
        use tiny_keccak::Hasher;
        let mut out = [0u8; Self::LEN];
        std::mem::replace(&mut self.0, tiny_keccak::Keccak::v256()).finalize(&mut out);
        out.to_vec()
    }

    fn size(&self) -> usize {
        Self::LEN
    }
}
