//!
//! Secret-handling helpers shared by the wallet lifecycle.
//!
/// Self-wiping passphrase buffers
pub mod passphrase;
/// Seed decoding from user input
pub mod seed;

pub use passphrase::Passphrase;
pub use seed::decode_seed;
