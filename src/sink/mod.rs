//! Output side - JSON Lines streams and the keyed upsert store
//!
//! Melted tables either go straight to a writer as one tagged stream, or
//! into a [`CollectionStore`] per collection, which upserts by the
//! collection's key and persists to `<collection>.jsonl`.

pub mod upsert;
pub mod writer;

pub use upsert::{store_all, CollectionStore, UpsertSummary};
pub use writer::{RowWriter, COLLECTION_FIELD};
