//! npad-storage: object backends addressed by storage key
//!
//! Two interchangeable backends implement [`ObjectBackend`]:
//!   - **memory**: a `RwLock`-guarded map, lost on restart.
//!   - **fs**: one file per paste in a flat directory, named by its storage key.
//!
//! The backend is chosen once at startup by [`build_backend`].

pub mod backend;
pub mod fs;
pub mod memory;

pub use backend::{build_backend, ObjectBackend, SweepOutcome};
pub use fs::FsBackend;
pub use memory::MemoryBackend;
