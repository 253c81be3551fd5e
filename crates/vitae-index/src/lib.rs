//! Profile chunking, embedding, and in-memory vector search.
//!
//! Turns a structured profile document into embedded passages and
//! retrieves the closest ones for a query: [`chunker`] splits the
//! document, [`embedding`] produces vectors, [`store`] holds them, and
//! [`search`] ties the three together behind a text-in, text-out API.

pub mod chunker;
pub mod embedding;
pub mod search;
pub mod store;
