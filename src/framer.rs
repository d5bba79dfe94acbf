// Copyright 2025 Bilinear Labs - MIT License

//! Splits a byte stream into fixed-width leaf records, carrying incomplete
//! trailing bytes over to the next call.

use crate::node::Node;
use std::slice::ChunksExact;

pub struct LeafFramer {
    width: usize,
    overflow: Vec<u8>,
}

/// Leaves completed by a single [`LeafFramer::frame`] call, in input order.
pub struct Framed<'a> {
    head: Option<Node>,
    body: ChunksExact<'a, u8>,
}

impl Iterator for Framed<'_> {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        self.head
            .take()
            .or_else(|| self.body.next().map(Node::from))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.body.len() + usize::from(self.head.is_some());
        (n, Some(n))
    }
}

impl ExactSizeIterator for Framed<'_> {}

impl LeafFramer {
    /// `width` must be non-zero, callers validate it against the algorithm.
    pub fn new(width: usize) -> Self {
        debug_assert!(width > 0);
        Self {
            width,
            overflow: Vec::with_capacity(width),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Bytes buffered towards the next leaf.
    pub fn pending(&self) -> usize {
        self.overflow.len()
    }

    pub fn reset(&mut self) {
        self.overflow.clear();
    }

    /// Consumes all of `bytes`. The overflow buffer is updated before returning,
    /// so the returned leaves only need to be forwarded.
    pub fn frame<'a>(&mut self, bytes: &'a [u8]) -> Framed<'a> {
        let mut rest = bytes;
        let mut head = None;

        // Fill up the overflow from the previous call first.
        if !self.overflow.is_empty() {
            let missing = self.width - self.overflow.len();
            if rest.len() < missing {
                self.overflow.extend_from_slice(rest);
                return Framed {
                    head: None,
                    body: rest[rest.len()..].chunks_exact(self.width),
                };
            }
            self.overflow.extend_from_slice(&rest[..missing]);
            rest = &rest[missing..];
            let leaf = std::mem::replace(&mut self.overflow, Vec::with_capacity(self.width));
            head = Some(Node::from(leaf));
        }

        let body = rest.chunks_exact(self.width);
        self.overflow.extend_from_slice(body.remainder());

        Framed { head, body }
    }
}
