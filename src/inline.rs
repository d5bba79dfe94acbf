// Copyright 2025 Bilinear Labs - MIT License

//! Single-threaded THEX tree. Runs the same pairing and carry-up rules as the
//! concurrent pipeline over an explicit stack of per-level pending values.

use crate::errors::ThexError;
use crate::framer::LeafFramer;
use crate::hasher::{combine, empty_root, Algorithm};
use crate::node::Node;
use std::io;
use tracing::trace;

/// Synchronous counterpart of [`ThexTree`](crate::tree::ThexTree).
///
/// Produces the same root for the same leaves. It is itself an [`Algorithm`]
/// whose width is the underlying width, so trees can be nested as the hash of
/// another tree.
pub struct InlineTree<A> {
    algorithm: A,
    size: usize,
    framer: LeafFramer,
    // levels[d] is the value at depth d still waiting for a partner.
    levels: Vec<Option<Node>>,
}

#[cfg(feature = "sha1")]
pub type Sha1InlineTree = InlineTree<sha1::Sha1>;

#[cfg(feature = "sha1")]
impl Default for Sha1InlineTree {
    fn default() -> Self {
        Self::build(sha1::Sha1::default(), 20)
    }
}

#[cfg(feature = "keccak")]
pub type KeccakInlineTree = InlineTree<crate::hasher::Keccak256>;

#[cfg(feature = "keccak")]
impl Default for KeccakInlineTree {
    fn default() -> Self {
        use crate::hasher::Keccak256;
        Self::build(Keccak256::new(), Keccak256::LEN)
    }
}

impl<A: Algorithm> InlineTree<A> {
    pub fn new(algorithm: A) -> Result<Self, ThexError> {
        let size = algorithm.size();
        if size == 0 {
            return Err(ThexError::ZeroWidthDigest);
        }
        Ok(Self::build(algorithm, size))
    }

    fn build(algorithm: A, size: usize) -> Self {
        Self {
            algorithm,
            size,
            framer: LeafFramer::new(size),
            levels: Vec::new(),
        }
    }

    /// Feeds leaf bytes into the tree, returning how many were consumed (all of them).
    pub fn update(&mut self, bytes: &[u8]) -> usize {
        for leaf in self.framer.frame(bytes) {
            self.push(leaf);
        }
        bytes.len()
    }

    fn push(&mut self, leaf: Node) {
        let mut value = leaf;
        let mut depth = 0;
        loop {
            if depth == self.levels.len() {
                self.levels.push(None);
            }
            match self.levels[depth].take() {
                None => {
                    self.levels[depth] = Some(value);
                    return;
                }
                Some(left) => {
                    value = combine(&mut self.algorithm, &left, &value);
                    depth += 1;
                }
            }
        }
    }

    /// Returns the root and resets the tree.
    pub fn finalize(&mut self) -> Node {
        // Drain bottom-up. Whatever leaves a level arrives after that level's
        // pending value, exactly as the end-of-stream marker orders it.
        let mut carry: Option<Node> = None;
        for depth in 0..self.levels.len() {
            carry = match (self.levels[depth].take(), carry) {
                (Some(left), Some(right)) => Some(combine(&mut self.algorithm, &left, &right)),
                (Some(left), None) => {
                    trace!(depth, value = %left, "carrying up unpaired value");
                    Some(left)
                }
                (None, carry) => carry,
            };
        }
        let root = match carry {
            Some(root) => root,
            None => empty_root(&mut self.algorithm),
        };
        self.reset();
        root
    }

    pub fn reset(&mut self) {
        self.framer.reset();
        self.levels.clear();
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn block_size(&self) -> usize {
        self.size
    }

    /// Number of levels opened so far.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }
}

impl<A: Algorithm> Algorithm for InlineTree<A> {
    fn reset(&mut self) {
        InlineTree::reset(self);
    }

    fn write(&mut self, data: &[u8]) {
        self.update(data);
    }

    fn sum(&mut self) -> Vec<u8> {
        self.finalize().into_vec()
    }

    fn size(&self) -> usize {
        self.size
    }

    fn block_size(&self) -> usize {
        self.size
    }
}

impl<A: Algorithm> io::Write for InlineTree<A> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.update(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::MockAlgorithm;

    fn counting_mock(size: usize, combines: usize) -> MockAlgorithm {
        let mut algorithm = MockAlgorithm::new();
        algorithm.expect_size().return_const(size);
        algorithm.expect_reset().times(combines).return_const(());
        algorithm.expect_write().times(3 * combines).return_const(());
        algorithm
            .expect_sum()
            .times(combines)
            .return_const(vec![0xeeu8; size]);
        algorithm
    }

    #[test]
    fn test_levels_open_lazily() {
        let mut tree = InlineTree::new(counting_mock(1, 4)).unwrap();
        assert_eq!(tree.depth(), 0);
        tree.update(&[1]);
        assert_eq!(tree.depth(), 1);
        tree.update(&[2]);
        assert_eq!(tree.depth(), 2);
        tree.update(&[3, 4]);
        assert_eq!(tree.depth(), 3);
        // Fifth leaf stays pending at level 0 until finalize carries it up.
        tree.update(&[5]);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.finalize(), Node::from([0xee]));
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_single_leaf_is_not_hashed() {
        let mut tree = InlineTree::new(counting_mock(3, 0)).unwrap();
        tree.update(&[7]);
        tree.update(&[8, 9]);
        assert_eq!(tree.finalize(), Node::from([7, 8, 9]));
    }

    #[test]
    fn test_zero_width_rejected() {
        let mut algorithm = MockAlgorithm::new();
        algorithm.expect_size().return_const(0usize);
        assert!(matches!(
            InlineTree::new(algorithm),
            Err(ThexError::ZeroWidthDigest)
        ));
    }

    #[test]
    fn test_io_write() {
        use std::io::Write;

        let mut tree = InlineTree::new(counting_mock(2, 0)).unwrap();
        tree.write_all(&[0xab]).unwrap();
        tree.write_all(&[0xcd]).unwrap();
        tree.flush().unwrap();
        assert_eq!(tree.finalize(), Node::from([0xab, 0xcd]));
    }
}
