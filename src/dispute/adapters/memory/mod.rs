//! In-memory adapter implementations.

mod repository;

pub use repository::InMemoryDisputeRepository;
