// Copyright 2025 Bilinear Labs - MIT License

//! Concurrent combine pipeline: one task per tree level, spawned on demand.
//!
//! Each level reads values from the level below, pairs them in arrival order and
//! forwards `Hash(0x01 || left || right)` upwards. An unpaired trailing value is
//! carried up unchanged. The first level that sees the end-of-stream marker
//! without ever having produced a parent holds the root.

use crate::errors::ThexError;
use crate::hasher::{combine, empty_root, Algorithm};
use crate::node::Node;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// What travels between levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Value(Node),
    EndOfStream,
}

/// The underlying algorithm, shared by every level. Each reset/write/sum
/// sequence runs with the lock held.
pub struct Combiner<A> {
    algorithm: Arc<Mutex<A>>,
}

impl<A> Clone for Combiner<A> {
    fn clone(&self) -> Self {
        Self {
            algorithm: Arc::clone(&self.algorithm),
        }
    }
}

impl<A: Algorithm> Combiner<A> {
    pub fn new(algorithm: A) -> Self {
        Self {
            algorithm: Arc::new(Mutex::new(algorithm)),
        }
    }

    pub fn combine(&self, left: &Node, right: &Node) -> Node {
        let mut algorithm = self.algorithm.lock();
        combine(&mut *algorithm, left, right)
    }

    pub fn empty_root(&self) -> Node {
        let mut algorithm = self.algorithm.lock();
        empty_root(&mut *algorithm)
    }
}

/// A single level of the tree. Holds the root slot until it spawns the level above.
pub struct LevelUnit<A> {
    depth: usize,
    queue_depth: usize,
    combiner: Combiner<A>,
    ingress: mpsc::Receiver<Signal>,
    root: oneshot::Sender<Node>,
}

fn abandoned(depth: usize) {
    debug!(depth, "level input closed before end of stream");
}

impl<A: Algorithm + Send + 'static> LevelUnit<A> {
    pub fn new(
        depth: usize,
        queue_depth: usize,
        combiner: Combiner<A>,
        ingress: mpsc::Receiver<Signal>,
        root: oneshot::Sender<Node>,
    ) -> Self {
        Self {
            depth,
            queue_depth,
            combiner,
            ingress,
            root,
        }
    }

    // Boxed so the level can spawn its successor without a recursive opaque type.
    pub fn run(self) -> BoxFuture<'static, ()> {
        self.process().boxed()
    }

    async fn process(self) {
        let LevelUnit {
            depth,
            queue_depth,
            combiner,
            mut ingress,
            root,
        } = self;

        let left = match ingress.recv().await {
            Some(Signal::Value(value)) => value,
            Some(Signal::EndOfStream) => {
                // Only reachable at level 0: the tree has no leaves at all.
                debug!(depth, "end of stream before any leaf");
                let _ = root.send(combiner.empty_root());
                return;
            }
            None => return abandoned(depth),
        };

        let right = match ingress.recv().await {
            Some(Signal::Value(value)) => value,
            Some(Signal::EndOfStream) => {
                // Never produced a parent, so this single value is the root.
                debug!(depth, root = %left, "delivering root");
                let _ = root.send(left);
                return;
            }
            None => return abandoned(depth),
        };

        let parent = combiner.combine(&left, &right);

        let (egress, next_ingress) = mpsc::channel(queue_depth);
        debug!(depth = depth + 1, "spawning level");
        tokio::spawn(
            LevelUnit::new(
                depth + 1,
                queue_depth,
                combiner.clone(),
                next_ingress,
                root,
            )
            .run(),
        );

        if egress.send(Signal::Value(parent)).await.is_err() {
            return abandoned(depth + 1);
        }

        loop {
            let left = match ingress.recv().await {
                Some(Signal::Value(value)) => value,
                Some(Signal::EndOfStream) => {
                    let _ = egress.send(Signal::EndOfStream).await;
                    return;
                }
                None => return abandoned(depth),
            };

            let forward = match ingress.recv().await {
                Some(Signal::Value(right)) => Signal::Value(combiner.combine(&left, &right)),
                Some(Signal::EndOfStream) => {
                    trace!(depth, value = %left, "carrying up unpaired value");
                    if egress.send(Signal::Value(left)).await.is_err() {
                        return abandoned(depth + 1);
                    }
                    let _ = egress.send(Signal::EndOfStream).await;
                    return;
                }
                None => return abandoned(depth),
            };

            if egress.send(forward).await.is_err() {
                return abandoned(depth + 1);
            }
        }
    }
}

/// Caller-facing end of one tree computation: level 0's input and the root slot.
///
/// Level 0 is spawned on first use. Dropping the pipeline closes level 0's input,
/// which unwinds every level above it.
pub struct Pipeline<A> {
    leaves: mpsc::Sender<Signal>,
    root: Option<oneshot::Receiver<Node>>,
    idle: Option<LevelUnit<A>>,
}

impl<A: Algorithm + Send + 'static> Pipeline<A> {
    pub fn new(combiner: Combiner<A>, queue_depth: usize) -> Self {
        let (leaves, ingress) = mpsc::channel(queue_depth);
        let (root_tx, root_rx) = oneshot::channel();
        Self {
            leaves,
            root: Some(root_rx),
            idle: Some(LevelUnit::new(0, queue_depth, combiner, ingress, root_tx)),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.root.is_none()
    }

    fn start(&mut self) {
        if let Some(level) = self.idle.take() {
            debug!(depth = 0, "spawning level");
            tokio::spawn(level.run());
        }
    }

    pub async fn push(&mut self, leaf: Node) -> Result<(), ThexError> {
        if self.is_finalized() {
            return Err(ThexError::AlreadyFinalized);
        }
        self.start();
        self.leaves
            .send(Signal::Value(leaf))
            .await
            .map_err(|_| ThexError::PipelineClosed)
    }

    pub async fn finish(&mut self) -> Result<Node, ThexError> {
        let root = self.root.take().ok_or(ThexError::AlreadyFinalized)?;
        self.start();
        self.leaves
            .send(Signal::EndOfStream)
            .await
            .map_err(|_| ThexError::PipelineClosed)?;
        root.await.map_err(|_| ThexError::PipelineClosed)
    }
}

#[cfg(all(test, feature = "digest"))]
mod tests {
    use super::*;
    use crate::hasher::INNER_PREFIX;
    use sha1::{Digest, Sha1};

    fn leaf(i: u8) -> Node {
        Node::from(Sha1::digest([i]).to_vec())
    }

    fn parent(left: &Node, right: &Node) -> Node {
        let mut hasher = Sha1::new();
        hasher.update([INNER_PREFIX]);
        hasher.update(left);
        hasher.update(right);
        Node::from(hasher.finalize().to_vec())
    }

    fn level_zero() -> (
        mpsc::Sender<Signal>,
        oneshot::Receiver<Node>,
        LevelUnit<Sha1>,
    ) {
        let (tx, rx) = mpsc::channel(1);
        let (root_tx, root_rx) = oneshot::channel();
        let level = LevelUnit::new(0, 1, Combiner::new(Sha1::default()), rx, root_tx);
        (tx, root_rx, level)
    }

    #[tokio::test]
    async fn test_single_value_is_root() {
        let (tx, root, level) = level_zero();
        tokio::spawn(level.run());

        tx.send(Signal::Value(leaf(0))).await.unwrap();
        tx.send(Signal::EndOfStream).await.unwrap();
        assert_eq!(root.await.unwrap(), leaf(0));
    }

    #[tokio::test]
    async fn test_odd_value_carried_up() {
        let (tx, root, level) = level_zero();
        tokio::spawn(level.run());

        for i in 0..3 {
            tx.send(Signal::Value(leaf(i))).await.unwrap();
        }
        tx.send(Signal::EndOfStream).await.unwrap();

        let expected = parent(&parent(&leaf(0), &leaf(1)), &leaf(2));
        assert_eq!(root.await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_marker_first_yields_empty_digest() {
        let (tx, root, level) = level_zero();
        tokio::spawn(level.run());

        tx.send(Signal::EndOfStream).await.unwrap();
        assert_eq!(root.await.unwrap(), Node::from(Sha1::digest(b"").to_vec()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_closed_input_unwinds_all_levels() {
        let (tx, root, level) = level_zero();
        let handle = tokio::spawn(level.run());

        // Deep enough that the root slot sits a few levels up.
        for i in 0..9 {
            tx.send(Signal::Value(leaf(i))).await.unwrap();
        }
        drop(tx);

        handle.await.unwrap();
        // The topmost level owned the root slot, it only drops once that level exits.
        assert!(root.await.is_err());
    }

    #[tokio::test]
    async fn test_finish_twice_is_rejected() {
        let mut pipeline = Pipeline::new(Combiner::new(Sha1::default()), 1);
        pipeline.push(leaf(7)).await.unwrap();
        assert_eq!(pipeline.finish().await.unwrap(), leaf(7));
        assert!(pipeline.is_finalized());
        assert_eq!(pipeline.finish().await, Err(ThexError::AlreadyFinalized));
        assert_eq!(pipeline.push(leaf(8)).await, Err(ThexError::AlreadyFinalized));
    }
}
