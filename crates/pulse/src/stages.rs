//! The 8 cooperative stages of one Pulse round (SPEC_FULL §4.6) plus the
//! per-slot message-buffering idiom: messages for a stage the context
//! hasn't reached yet are kept, not dropped, and drained when the context
//! catches up.

use std::collections::BTreeMap;

use snsd_chainio::wire::{PulseMessage, PulsePayload};

/// One step of a Pulse round. `Null`/`WaitNextBlock` are the quiescent
/// states between rounds/blocks; everything else is part of a single
/// round's seven sequential stages (handshake through signing), entered via
/// `PrepareRound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Null,
    WaitNextBlock,
    PrepareRound,
    WaitRound,
    SendWaitHandshakes,
    SendBitset,
    WaitBitsets,
    WaitTemplate,
    SendTemplate,
    SendWaitHashes,
    SendWaitRandom,
    SendWaitSigned,
}

impl Stage {
    /// The payload discriminant a validator in this stage is expected to
    /// send/collect, used to key the message buffer. `None` for stages that
    /// exchange no wire messages.
    pub fn payload_tag(self) -> Option<&'static str> {
        match self {
            Stage::SendWaitHandshakes => Some("handshake"),
            Stage::SendBitset | Stage::WaitBitsets => Some("handshake_bitset"),
            Stage::WaitTemplate | Stage::SendTemplate => Some("block_template"),
            Stage::SendWaitHashes => Some("random_value_hash"),
            Stage::SendWaitRandom => Some("random_value"),
            Stage::SendWaitSigned => Some("signed_block"),
            Stage::Null | Stage::WaitNextBlock | Stage::PrepareRound | Stage::WaitRound => None,
        }
    }
}

/// Key for the per-validator-slot message buffer: one slot per
/// `(round, stage payload kind, quorum position)`.
pub type BufferKey = (u32, &'static str, u16);

/// Buffers messages that arrived for a stage the context hasn't reached
/// yet, and drains those matching the current stage/round on demand.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    slots: BTreeMap<BufferKey, PulseMessage>,
}

impl MessageBuffer {
    pub fn push(&mut self, msg: PulseMessage) {
        let tag = payload_kind_name(&msg.payload);
        self.slots.insert((msg.round, tag, msg.quorum_position), msg);
    }

    /// Returns buffered messages for `round`/`tag`, keyed by quorum
    /// position, without removing them (a validator may need to re-check
    /// the same stage across several `tick()` calls).
    pub fn collected(&self, round: u32, tag: &'static str) -> BTreeMap<u16, &PulseMessage> {
        self.slots
            .iter()
            .filter(|((r, t, _), _)| *r == round && *t == tag)
            .map(|((_, _, pos), msg)| (*pos, msg))
            .collect()
    }

    /// Drops every slot for rounds strictly older than `round`, called at
    /// the start of `PrepareRound` so a validator doesn't accumulate
    /// unbounded state across rounds of a long-stalled height.
    pub fn evict_before(&mut self, round: u32) {
        self.slots.retain(|(r, _, _), _| *r >= round);
    }
}

fn payload_kind_name(payload: &PulsePayload) -> &'static str {
    payload.kind_name()
}
