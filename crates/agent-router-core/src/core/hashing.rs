// agent-router-core/src/core/hashing.rs
// ============================================================================
// Module: Agent Router Content Hashing
// Description: SHA-256 digests over raw manifest bytes.
// Purpose: Provide the stable manifest hash carried in every vertex stamp.
// Dependencies: sha2
// ============================================================================

//! ## Overview
//! The freeze manifest is hashed over its exact on-disk bytes, not a
//! re-serialized form, so the platform and the router agree on the digest
//! without sharing a canonicalization scheme.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Hashes raw bytes with SHA-256 and returns the lowercase hex digest.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
