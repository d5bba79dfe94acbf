// Copyright 2025 Bilinear Labs - MIT License

//! Async THEX tree engine backed by the concurrent [`Pipeline`](crate::pipeline::Pipeline).

use crate::errors::ThexError;
use crate::framer::LeafFramer;
use crate::hasher::Algorithm;
use crate::node::Node;
use crate::pipeline::{Combiner, Pipeline};
use futures::{Stream, StreamExt};
use tracing::debug;

/// Computes the THEX root of a stream of leaf digests.
///
/// Leaves are written as raw bytes, `size()` bytes per leaf, and may be split
/// arbitrarily across `write` calls. Every tree level runs as its own tokio
/// task, so `write` and `sum` must be awaited inside a tokio runtime.
///
/// After `sum` the tree is finalized: further `write`/`sum` calls fail with
/// [`ThexError::AlreadyFinalized`] until `reset` is called. Dropping the tree,
/// or resetting it mid-computation, shuts down every level task it spawned.
pub struct ThexTree<A> {
    combiner: Combiner<A>,
    size: usize,
    queue_depth: usize,
    framer: LeafFramer,
    pipeline: Pipeline<A>,
}

#[cfg(feature = "sha1")]
pub type Sha1Tree = ThexTree<sha1::Sha1>;

#[cfg(feature = "sha1")]
impl Default for Sha1Tree {
    fn default() -> Self {
        Self::build(sha1::Sha1::default(), 20, ThexTree::<sha1::Sha1>::DEFAULT_QUEUE_DEPTH)
    }
}

#[cfg(feature = "keccak")]
pub type KeccakTree = ThexTree<crate::hasher::Keccak256>;

#[cfg(feature = "keccak")]
impl Default for KeccakTree {
    fn default() -> Self {
        use crate::hasher::Keccak256;
        Self::build(
            Keccak256::new(),
            Keccak256::LEN,
            ThexTree::<Keccak256>::DEFAULT_QUEUE_DEPTH,
        )
    }
}

impl<A> ThexTree<A>
where
    A: Algorithm + Send + 'static,
{
    /// Capacity of the queue feeding each level. 1 keeps every hand-off as close
    /// to a rendezvous as tokio allows.
    pub const DEFAULT_QUEUE_DEPTH: usize = 1;

    pub fn new(algorithm: A) -> Result<Self, ThexError> {
        Self::with_queue_depth(algorithm, Self::DEFAULT_QUEUE_DEPTH)
    }

    /// Same as [`ThexTree::new`] with a custom per-level queue capacity (at least 1).
    pub fn with_queue_depth(algorithm: A, queue_depth: usize) -> Result<Self, ThexError> {
        let size = algorithm.size();
        if size == 0 {
            return Err(ThexError::ZeroWidthDigest);
        }
        Ok(Self::build(algorithm, size, queue_depth.max(1)))
    }

    fn build(algorithm: A, size: usize, queue_depth: usize) -> Self {
        let combiner = Combiner::new(algorithm);
        Self {
            pipeline: Pipeline::new(combiner.clone(), queue_depth),
            framer: LeafFramer::new(size),
            combiner,
            size,
            queue_depth,
        }
    }

    /// Feeds leaf bytes into the tree. Always consumes all of `bytes`; an
    /// incomplete trailing leaf is kept until the next call.
    ///
    /// Not cancel safe: if the future is dropped part way, `reset` the tree.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<usize, ThexError> {
        if self.pipeline.is_finalized() {
            return Err(ThexError::AlreadyFinalized);
        }
        for leaf in self.framer.frame(bytes) {
            self.pipeline.push(leaf).await?;
        }
        Ok(bytes.len())
    }

    /// Writes every chunk of `stream` in order, returning the total byte count.
    pub async fn absorb<S, B>(&mut self, stream: S) -> Result<usize, ThexError>
    where
        S: Stream<Item = B>,
        B: AsRef<[u8]>,
    {
        futures::pin_mut!(stream);
        let mut total = 0;
        while let Some(chunk) = stream.next().await {
            total += self.write(chunk.as_ref()).await?;
        }
        Ok(total)
    }

    /// Drains the pipeline and returns the root.
    ///
    /// A tree with a single leaf returns that leaf unchanged. A tree with no
    /// leaves returns the underlying algorithm's digest of empty input.
    /// Bytes of an incomplete trailing leaf are discarded.
    pub async fn sum(&mut self) -> Result<Node, ThexError> {
        if self.framer.pending() > 0 && !self.pipeline.is_finalized() {
            debug!(
                pending = self.framer.pending(),
                "discarding incomplete leaf bytes"
            );
        }
        self.pipeline.finish().await
    }

    /// Drops the current pipeline and any buffered bytes, ready for a new tree.
    pub fn reset(&mut self) {
        self.framer.reset();
        self.pipeline = Pipeline::new(self.combiner.clone(), self.queue_depth);
    }

    /// Digest width of the underlying algorithm, and of every leaf and root.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn block_size(&self) -> usize {
        self.size
    }

    pub fn is_finalized(&self) -> bool {
        self.pipeline.is_finalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::MockAlgorithm;

    #[test]
    fn test_zero_width_rejected() {
        let mut algorithm = MockAlgorithm::new();
        algorithm.expect_size().return_const(0usize);
        assert!(matches!(
            ThexTree::new(algorithm),
            Err(ThexError::ZeroWidthDigest)
        ));
    }

    #[tokio::test]
    async fn test_single_leaf_is_not_hashed() {
        let mut algorithm = MockAlgorithm::new();
        algorithm.expect_size().return_const(4usize);
        algorithm.expect_reset().never();
        algorithm.expect_write().never();
        algorithm.expect_sum().never();

        let mut tree = ThexTree::new(algorithm).unwrap();
        assert_eq!(tree.size(), 4);
        assert_eq!(tree.block_size(), 4);
        assert_eq!(tree.write(&[1, 2]).await.unwrap(), 2);
        assert_eq!(tree.write(&[3, 4]).await.unwrap(), 2);
        assert_eq!(tree.sum().await.unwrap(), Node::from([1, 2, 3, 4]));
    }

    #[tokio::test]
    async fn test_each_pair_hashed_once() {
        let mut algorithm = MockAlgorithm::new();
        algorithm.expect_size().return_const(2usize);
        // Four leaves: two pairs at level 0, one at level 1.
        algorithm.expect_reset().times(3).return_const(());
        algorithm.expect_write().times(9).return_const(());
        algorithm.expect_sum().times(3).return_const(vec![0xeeu8, 0xee]);

        let mut tree = ThexTree::new(algorithm).unwrap();
        tree.write(&[0, 1, 2, 3, 4, 5, 6, 7]).await.unwrap();
        assert_eq!(tree.sum().await.unwrap(), Node::from([0xee, 0xee]));
    }

    #[tokio::test]
    async fn test_queue_depth_clamped() {
        let mut algorithm = MockAlgorithm::new();
        algorithm.expect_size().return_const(1usize);
        let mut tree = ThexTree::with_queue_depth(algorithm, 0).unwrap();
        assert_eq!(tree.queue_depth, 1);
        tree.write(&[9]).await.unwrap();
        assert_eq!(tree.sum().await.unwrap(), Node::from([9]));
    }
}
