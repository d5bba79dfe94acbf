// Copyright 2025 Bilinear Labs - MIT License

//! Digest values flowing through the tree. Leaves and internal nodes share this type.

use crate::errors::ThexError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node(Vec<u8>);

impl Node {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Node {
    fn from(bytes: Vec<u8>) -> Self {
        Node(bytes)
    }
}

impl From<&[u8]> for Node {
    fn from(bytes: &[u8]) -> Self {
        Node(bytes.to_vec())
    }
}

impl From<Box<[u8]>> for Node {
    fn from(bytes: Box<[u8]>) -> Self {
        Node(bytes.into_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Node {
    fn from(bytes: [u8; N]) -> Self {
        Node(bytes.to_vec())
    }
}

impl TryFrom<&str> for Node {
    type Error = ThexError;

    fn try_from(hex: &str) -> Result<Self, Self::Error> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        if hex.is_empty() {
            return Err(ThexError::InvalidNode("empty hex string".into()));
        }
        hex::decode(hex)
            .map(Node)
            .map_err(|e| ThexError::InvalidNode(e.to_string()))
    }
}

impl AsRef<[u8]> for Node {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

#[macro_export]
macro_rules! to_node {
    ($hex:expr) => {{
        $crate::node::Node::try_from($hex).expect("Invalid node hex literal")
    }};
}
