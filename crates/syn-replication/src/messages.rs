//! Gossip wire protocol.
//!
//! Topic `"synnergy-repl/1"`. Every message is a 1-byte code followed by
//! the bincode payload. Blocks travel as their canonical encoding;
//! identities are the double-SHA-256 of the encoded header.

use crate::errors::{ReplicationError, ReplicationResult};
use serde::{Deserialize, Serialize};
use shared_types::{canonical_decode, canonical_encode, Hash};

/// The replication gossip topic.
pub const TOPIC: &str = "synnergy-repl/1";

/// Message codes.
pub mod code {
    /// Announce known block hashes.
    pub const INVENTORY: u8 = 1;
    /// Request blocks by hash.
    pub const GET_DATA: u8 = 2;
    /// A full block payload.
    pub const BLOCK: u8 = 3;
    /// Request an inclusive height range.
    pub const GET_RANGE: u8 = 4;
    /// Ordered encoded blocks answering a range request.
    pub const RANGE_BLOCKS: u8 = 5;
}

/// A decoded gossip message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Code 1: `{ hashes }`.
    Inventory { hashes: Vec<Hash> },
    /// Code 2: `{ hashes }`.
    GetData { hashes: Vec<Hash> },
    /// Code 3: `{ block }` — canonical block encoding.
    Block { block: Vec<u8> },
    /// Code 4: `{ start, end }` — inclusive heights.
    GetRange { start: u64, end: u64 },
    /// Code 5: `{ blocks }` — ordered canonical encodings.
    RangeBlocks { blocks: Vec<Vec<u8>> },
}

#[derive(Serialize, Deserialize)]
struct HashesPayload {
    hashes: Vec<Hash>,
}

#[derive(Serialize, Deserialize)]
struct BlockPayload {
    block: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct RangePayload {
    start: u64,
    end: u64,
}

#[derive(Serialize, Deserialize)]
struct BlocksPayload {
    blocks: Vec<Vec<u8>>,
}

impl Message {
    /// The 1-byte wire code.
    pub fn code(&self) -> u8 {
        match self {
            Message::Inventory { .. } => code::INVENTORY,
            Message::GetData { .. } => code::GET_DATA,
            Message::Block { .. } => code::BLOCK,
            Message::GetRange { .. } => code::GET_RANGE,
            Message::RangeBlocks { .. } => code::RANGE_BLOCKS,
        }
    }

    /// Encode to `code || payload`.
    pub fn encode(&self) -> ReplicationResult<Vec<u8>> {
        let payload = match self {
            Message::Inventory { hashes } | Message::GetData { hashes } => {
                canonical_encode(&HashesPayload {
                    hashes: hashes.clone(),
                })
            }
            Message::Block { block } => canonical_encode(&BlockPayload {
                block: block.clone(),
            }),
            Message::GetRange { start, end } => canonical_encode(&RangePayload {
                start: *start,
                end: *end,
            }),
            Message::RangeBlocks { blocks } => canonical_encode(&BlocksPayload {
                blocks: blocks.clone(),
            }),
        }
        .map_err(|e| ReplicationError::Decode(e.to_string()))?;

        let mut wire = Vec::with_capacity(1 + payload.len());
        wire.push(self.code());
        wire.extend_from_slice(&payload);
        Ok(wire)
    }

    /// Decode from `code || payload`.
    ///
    /// # Errors
    ///
    /// `Decode` on an empty buffer, unknown code or malformed payload.
    pub fn decode(wire: &[u8]) -> ReplicationResult<Self> {
        let (&code, payload) = wire
            .split_first()
            .ok_or_else(|| ReplicationError::Decode("empty message".into()))?;
        let decode_err = |e: shared_types::CodecError| ReplicationError::Decode(e.to_string());
        match code {
            code::INVENTORY => {
                let p: HashesPayload = canonical_decode(payload).map_err(decode_err)?;
                Ok(Message::Inventory { hashes: p.hashes })
            }
            code::GET_DATA => {
                let p: HashesPayload = canonical_decode(payload).map_err(decode_err)?;
                Ok(Message::GetData { hashes: p.hashes })
            }
            code::BLOCK => {
                let p: BlockPayload = canonical_decode(payload).map_err(decode_err)?;
                Ok(Message::Block { block: p.block })
            }
            code::GET_RANGE => {
                let p: RangePayload = canonical_decode(payload).map_err(decode_err)?;
                Ok(Message::GetRange {
                    start: p.start,
                    end: p.end,
                })
            }
            code::RANGE_BLOCKS => {
                let p: BlocksPayload = canonical_decode(payload).map_err(decode_err)?;
                Ok(Message::RangeBlocks { blocks: p.blocks })
            }
            other => Err(ReplicationError::Decode(format!("unknown code {other}"))),
        }
    }
}
