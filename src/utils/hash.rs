//! Content hashing with blake3.
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let digest = hash::digest(b"body{}");       // -> [u8; 32]
//! let fp = hash::fingerprint(b"body{}");      // -> "a1b2c3d4"
//! ```

/// Number of hex characters used for filename fingerprints.
pub const FINGERPRINT_LEN: usize = 8;

/// Compute the blake3 digest of byte data.
#[inline]
pub fn digest<T: AsRef<[u8]> + ?Sized>(data: &T) -> [u8; 32] {
    *blake3::hash(data.as_ref()).as_bytes()
}

/// Hash data and return the first [`FINGERPRINT_LEN`] hex characters.
///
/// Used for cache-busting filenames (e.g. `main-a1b2c3d4.css`).
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    let mut hex = hex::encode(digest(data));
    hex.truncate(FINGERPRINT_LEN);
    hex
}
