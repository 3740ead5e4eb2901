//! Encrypt-at-rest cookie jar storage (§4.B).

mod cookie_jar;
mod crypto;
mod key;
mod vault;

pub use vault::FileVault;
