//! Retrieval-augmented prompting.
//!
//! [`ContextAugmenter`] embeds the user prompt, looks up the nearest stored
//! documents in a [`VectorIndex`] and folds them into the system prompt.

#[path = "retrieval/augmenter.rs"]
mod augmenter;

#[path = "retrieval/index.rs"]
mod index;

#[path = "retrieval/memory.rs"]
mod memory;

#[path = "retrieval/pinecone.rs"]
mod pinecone;

pub use augmenter::{
    plain_prompt, Augmentation, ContextAugmenter, DocumentMetadata, CONTEXT_INSTRUCTIONS, STEP_BY_STEP,
    TOP_K,
};
pub use index::{DocumentMatch, VectorIndex, VectorRecord};
pub use memory::InMemoryVectorIndex;
pub use pinecone::PineconeIndex;
