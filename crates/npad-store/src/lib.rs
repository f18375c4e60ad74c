//! npad-store: capability-addressed paste storage
//!
//! # Overview
//! - `settings`: the validated, immutable compression/encryption settings
//! - `capability`: token construction and parsing, expiry checks
//! - `engine`: [`PasteStore`], the store/retrieve pipeline over a backend
//! - `gc`: the background sweeper that removes expired pastes
//!
//! Write path: size check → compress → digest → seal → backend put.
//! Read path: parse token → backend get → open → decompress.

pub mod capability;
pub mod engine;
pub mod gc;
pub mod settings;

pub use capability::{build_token, is_expired, parse_token, ParsedToken, Prefix, SealedPaste};
pub use engine::PasteStore;
pub use gc::{GarbageCollector, GcState, GcStatus, SweepReport};
pub use settings::StoreSettings;
