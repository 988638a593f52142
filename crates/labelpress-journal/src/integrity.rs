// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document fingerprints — SHA-256 hashing for traceability in the event log.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
///
/// A prefix of it is logged for every decoded document so an operator can
/// match a printed label against the stored file.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// First 12 hex characters of [`hash_bytes`], for log lines.
pub fn short_hash(data: &[u8]) -> String {
    let mut full = hash_bytes(data);
    full.truncate(12);
    full
}
