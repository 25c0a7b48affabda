//! Knowledge subsystem: claim extraction, verification against the knowledge
//! graph, the semantic duplicate gate, gated ingestion, graph upserts and
//! retrieval-augmented answers.

mod claims;
mod dedup;
mod ingest;
mod rag;
mod verifier;
mod writer;

pub use claims::{Claim, ClaimExtractor};
pub use dedup::{SemanticDuplicateGate, DEFAULT_SIMILARITY_THRESHOLD};
pub use ingest::{chunk_text, content_hash, DuplicateReason, IngestOutcome, KnowledgeIngestor};
pub use rag::{context_block, RagAnswer, RagError, RagQuery, NO_CONTEXT_ANSWER};
pub use verifier::{normalize_predicate, KnowledgeVerifier, VerificationReport};
pub use writer::KnowledgeGraphWriter;
