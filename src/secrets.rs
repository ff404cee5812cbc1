// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secret key material for the home server.
//!
//! Keys come from the operating system CSPRNG through `ring` and are
//! hex-encoded, so a 32-byte key becomes a 64-character string.

use ring::rand::{SecureRandom, SystemRandom};

use crate::config::SECRET_KEY_BYTES;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("secret length must be positive")]
    InvalidLength,

    #[error("system entropy source failed")]
    Entropy,
}

/// Produces hex-encoded random keys.
#[derive(Clone)]
pub struct SecretGenerator {
    rng: SystemRandom,
}

impl std::fmt::Debug for SecretGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretGenerator").finish_non_exhaustive()
    }
}

impl Default for SecretGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretGenerator {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Generate `byte_length` random bytes as `2 * byte_length` hex characters.
    pub fn generate(&self, byte_length: usize) -> Result<String, SecretError> {
        if byte_length == 0 {
            return Err(SecretError::InvalidLength);
        }

        let mut bytes = vec![0u8; byte_length];
        self.rng.fill(&mut bytes).map_err(|_| SecretError::Entropy)?;
        Ok(hex::encode(bytes))
    }

    /// Generate one 32-byte server key.
    pub fn generate_key(&self) -> Result<String, SecretError> {
        self.generate(SECRET_KEY_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_twice_the_byte_length_in_lowercase_hex() {
        let generator = SecretGenerator::new();
        for len in [1, 16, 32, 48] {
            let key = generator.generate(len).unwrap();
            assert_eq!(key.len(), len * 2);
            assert!(key
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn consecutive_keys_differ() {
        let generator = SecretGenerator::new();
        let first = generator.generate_key().unwrap();
        let second = generator.generate_key().unwrap();
        assert_eq!(first.len(), 64);
        assert_ne!(first, second);
    }

    #[test]
    fn zero_length_is_rejected() {
        let generator = SecretGenerator::new();
        assert_eq!(generator.generate(0), Err(SecretError::InvalidLength));
    }
}
