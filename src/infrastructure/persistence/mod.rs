mod memory;
mod pg_job_repository;
mod pg_pool;
mod pg_transcript_repository;

pub use memory::{MemoryJobRepository, MemoryTranscriptRepository};
pub use pg_job_repository::PgJobRepository;
pub use pg_pool::create_pool;
pub use pg_transcript_repository::PgTranscriptRepository;
