pub mod engine;
pub mod memory;

pub use engine::DocumentStore;
pub use memory::InMemoryStore;
