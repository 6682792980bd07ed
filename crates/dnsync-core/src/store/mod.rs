// # Remote Store Implementations
//
// Stores that live inside the core crate. Network-backed stores live in
// their own provider crates.

pub mod memory;

pub use memory::MemoryRemoteStore;
