// Copyright 2025 Bilinear Labs - MIT License

/*!
Streaming THEX (Tree Hash EXchange) Merkle root computation in Rust, generic over the underlying hash
algorithm. This implementation features:

* Algorithm agnostic: any type implementing [`Algorithm`] works. Every RustCrypto hasher does through the
  `digest` feature, and a keccak256 adapter ships with the `keccak` feature.
* Streaming: leaves are written as raw digest bytes and may be split at any byte boundary across writes.
* Concurrent: [`ThexTree`] runs every tree level as its own tokio task, spawned the first time that level
  is needed. [`InlineTree`] computes the same root on the calling thread.
* THEX rules: internal nodes are `Hash(0x01 || left || right)`, an unpaired value is carried up to the next
  level unchanged, and a single leaf is its own root.

Leaves are not hashed by this crate. Hash each chunk of the source data (1024 bytes is customary) with the
algorithm of your choice and write the resulting digests, in order, to the tree.

```rust,ignore
use sha1::{Digest, Sha1};
use thex_tree::ThexTree;

#[tokio::main]
async fn main() {
    let mut tree = ThexTree::new(Sha1::new()).unwrap();
    for chunk in b"some file contents".chunks(1024) {
        tree.write(&Sha1::digest(chunk)).await.unwrap();
    }
    println!("root: {}", tree.sum().await.unwrap());

    // Ready for an independent tree.
    tree.reset();
}
```

Since [`InlineTree`] is itself an [`Algorithm`] reporting the underlying width, trees can be nested:

```rust,ignore
use thex_tree::{InlineTree, ThexTree};

let inner = InlineTree::new(sha1::Sha1::default()).unwrap();
let mut tree = ThexTree::new(inner).unwrap();
```

*/

pub mod errors;
pub mod framer;
pub mod hasher;
pub mod inline;
pub mod node;
pub mod pipeline;
pub mod tree;

pub use errors::ThexError;
pub use hasher::{combine, Algorithm, INNER_PREFIX};
pub use inline::InlineTree;
pub use node::Node;
pub use tree::ThexTree;

#[cfg(feature = "keccak")]
pub use hasher::Keccak256;
#[cfg(feature = "keccak")]
pub use inline::KeccakInlineTree;
#[cfg(feature = "keccak")]
pub use tree::KeccakTree;

#[cfg(feature = "sha1")]
pub use inline::Sha1InlineTree;
#[cfg(feature = "sha1")]
pub use tree::Sha1Tree;
