//! In-memory adapter implementations.

mod board;
mod repository;

pub use board::InMemoryBoard;
pub use repository::InMemoryCardMappingRepository;
