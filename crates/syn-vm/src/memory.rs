//! # Execution Memory
//!
//! Byte-addressable, word-aligned growable memory. Expansion is charged
//! by the handlers through the gas meter.

use crate::errors::{VmError, VmResult};

/// Maximum memory size (16 MB).
pub const MAX_MEMORY_SIZE: usize = 16 * 1024 * 1024;

/// Word size in bytes.
pub const WORD_SIZE: usize = 32;

/// Growable execution memory.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Creates new empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Current size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size in 32-byte words (rounded up).
    #[must_use]
    pub fn word_size(&self) -> usize {
        self.data.len().div_ceil(WORD_SIZE)
    }

    /// Ensure at least `size` bytes, expanding word-aligned. Returns the
    /// number of new words (for gas charging).
    ///
    /// # Errors
    ///
    /// `MemoryLimitExceeded` past the hard cap.
    pub fn expand(&mut self, size: usize) -> VmResult<usize> {
        if size <= self.data.len() {
            return Ok(0);
        }
        if size > MAX_MEMORY_SIZE {
            return Err(VmError::MemoryLimitExceeded {
                requested: size,
                max: MAX_MEMORY_SIZE,
            });
        }
        let new_words = size.div_ceil(WORD_SIZE);
        let old_words = self.word_size();
        self.data.resize(new_words * WORD_SIZE, 0);
        Ok(new_words.saturating_sub(old_words))
    }

    /// Read a 32-byte word; reads past the end are zero-padded.
    #[must_use]
    pub fn read_word(&self, offset: usize) -> [u8; 32] {
        let mut word = [0u8; 32];
        for (i, byte) in word.iter_mut().enumerate() {
            if let Some(value) = self.data.get(offset.saturating_add(i)) {
                *byte = *value;
            }
        }
        word
    }

    /// Read `size` bytes; reads past the end are zero-padded.
    #[must_use]
    pub fn read_bytes(&self, offset: usize, size: usize) -> Vec<u8> {
        let mut out = vec![0u8; size];
        for (i, byte) in out.iter_mut().enumerate() {
            if let Some(value) = self.data.get(offset.saturating_add(i)) {
                *byte = *value;
            }
        }
        out
    }

    /// Write a 32-byte word, expanding as needed.
    ///
    /// # Errors
    ///
    /// `MemoryLimitExceeded` past the hard cap.
    pub fn write_word(&mut self, offset: usize, word: &[u8; 32]) -> VmResult<usize> {
        let grown = self.expand(offset.saturating_add(WORD_SIZE))?;
        self.data[offset..offset + WORD_SIZE].copy_from_slice(word);
        Ok(grown)
    }

    /// Write arbitrary bytes, expanding as needed.
    ///
    /// # Errors
    ///
    /// `MemoryLimitExceeded` past the hard cap.
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> VmResult<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }
        let grown = self.expand(offset.saturating_add(bytes.len()))?;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(grown)
    }
}
