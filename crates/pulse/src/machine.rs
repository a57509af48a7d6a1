//! `Context` and `tick()`: the cooperative Pulse round executor (SPEC_FULL
//! §4.6). A single synchronous, externally-driven `tick()` call replaces
//! an async `loop { select! { ... } }` body, per SPEC_FULL §5's "no
//! blocking I/O inside PSM" requirement: `tick()` itself never awaits
//! anything that can block on network I/O except the two collaborator
//! calls it is explicitly handed.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, info, warn};

use snsd_chainio::{
    traits::{ChainStore, QuorumNet},
    wire::{PulseMessage, PulsePayload},
};
use snsd_crypto::{blake2b, ed25519::Keypair};
use snsd_primitives::{
    constants::{PULSE_BLOCK_REQUIRED_SIGNATURES, PULSE_ROUND_TIMEOUT_SECS, PULSE_STAGE_TIMEOUT_SECS},
    Hash32, PubKey, Signature,
};
use snsd_state::{Quorum, QuorumKind};

use crate::{clock::Clock, errors::Error, stages::{MessageBuffer, Stage}};

const HISTORICAL_QUORUM_RING_SIZE: usize = 3;

/// One quorum's worth of state for a single (height, round) attempt. A new
/// `Context` is built in `prepare_round` each time the active quorum or
/// round changes; fields below reset accordingly.
pub struct Context {
    keypair: Arc<Keypair>,
    my_pubkey: PubKey,
    height: u64,
    top_block_hash: Hash32,
    r0_timestamp: u64,
    quorum: Quorum,
    my_position: Option<u16>,
    is_producer: bool,

    round: u32,
    stage: Stage,
    stage_end_time: u64,
    sent_this_stage: bool,

    handshake_bitset: u16,
    agreed_bitset: Option<u16>,
    template_bytes: Option<Vec<u8>>,
    my_random_value: Option<[u8; 32]>,
    final_random_value: Option<Hash32>,
    signatures: BTreeMap<u16, Signature>,

    buffer: MessageBuffer,
    historical_quorums: VecDeque<(u64, u32, Hash32, Quorum)>,
}

/// Outcome of a `tick()` call, surfaced for logging/metrics; PSM never
/// bubbles stage failures to its caller (SPEC_FULL §5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing changed; still waiting on timers or messages.
    Suspended,
    /// Advanced within the same round.
    Advanced(Stage),
    /// The round aborted (missing quorum membership, lost bitset vote,
    /// template rejected, etc.) and the machine reset to `prepare_round`.
    RoundAborted(String),
    /// A fully signed block was submitted to `ChainStore` via
    /// `create_next_pulse_block_template`'s caller-side submission path.
    BlockProduced { round: u32, signature_count: usize },
}

impl Context {
    /// Enters `prepare_round` for `height`/`quorum` at round 0. `my_pubkey`
    /// not in `quorum.validators` and not the producer means this node only
    /// observes; `tick()` becomes a no-op loop back to `wait_next_block`.
    pub fn new(
        keypair: Arc<Keypair>,
        height: u64,
        top_block_hash: Hash32,
        r0_timestamp: u64,
        quorum: Quorum,
    ) -> Self {
        let my_pubkey = keypair.public_key();
        let my_position = quorum.position_of(&my_pubkey).map(|p| p as u16);
        let is_producer = quorum.workers.first() == Some(&my_pubkey);
        Self {
            keypair,
            my_pubkey,
            height,
            top_block_hash,
            r0_timestamp,
            quorum,
            my_position,
            is_producer,
            round: 0,
            stage: Stage::PrepareRound,
            stage_end_time: 0,
            sent_this_stage: false,
            handshake_bitset: 0,
            agreed_bitset: None,
            template_bytes: None,
            my_random_value: None,
            final_random_value: None,
            signatures: BTreeMap::new(),
            buffer: MessageBuffer::default(),
            historical_quorums: VecDeque::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Queues an inbound message. Messages for the current round/stage are
    /// acted on at the next `tick()`; messages for a future stage of the
    /// same round are buffered; messages for a round already retired are
    /// checked against `historical_quorums` and silently dropped rather
    /// than logged as errors (SPEC_FULL §4.6 "historical-quorum
    /// validation").
    pub fn receive(&mut self, msg: PulseMessage) {
        if msg.top_block_hash != self.top_block_hash {
            return;
        }
        if msg.round < self.round {
            if self.is_known_historical(msg.round) {
                debug!(round = msg.round, "dropping message for a finished round");
            } else {
                warn!(round = msg.round, "message for unknown past round");
            }
            return;
        }
        let voter = match &msg.payload {
            // Template messages are sent by the producer, who sits in
            // `quorum.workers`, not `quorum.validators`, so `quorum_position`
            // does not address it.
            PulsePayload::BlockTemplate(_) => self.quorum.workers.first().copied().unwrap_or_default(),
            _ => self.voter_at(msg.quorum_position),
        };
        if snsd_crypto::ed25519::verify(&voter, &msg.signing_bytes(), &msg.signature).is_err() {
            warn!(position = msg.quorum_position, "rejecting message with invalid signature");
            return;
        }
        self.buffer.push(msg);
    }

    fn is_known_historical(&self, round: u32) -> bool {
        self.historical_quorums
            .iter()
            .any(|(h, r, hash, _)| *h == self.height && *r == round && *hash == self.top_block_hash)
    }

    fn voter_at(&self, position: u16) -> PubKey {
        self.quorum
            .validators
            .get(position as usize)
            .copied()
            .unwrap_or_default()
    }

    fn sign(&self, round: u32, payload: PulsePayload) -> PulseMessage {
        let mut msg = PulseMessage {
            top_block_hash: self.top_block_hash,
            quorum_position: self.my_position.unwrap_or(u16::MAX),
            round,
            payload,
            signature: Signature::default(),
        };
        msg.signature = self.keypair.sign(&msg.signing_bytes());
        msg
    }

    /// Advances the machine by at most one stage transition. Returns
    /// quickly (no blocking) whenever the stage's outbound message has been
    /// sent and neither the stage bitset is full nor the deadline elapsed.
    pub async fn tick(
        &mut self,
        clock: &dyn Clock,
        chain: &dyn ChainStore,
        net: &dyn QuorumNet,
    ) -> Result<TickOutcome, Error> {
        let now = clock.now_secs();

        match self.stage {
            Stage::Null | Stage::WaitNextBlock => Ok(TickOutcome::Suspended),

            Stage::PrepareRound => {
                self.prepare_round(now);
                Ok(TickOutcome::Advanced(self.stage))
            }

            Stage::WaitRound => {
                if self.my_position.is_none() && !self.is_producer {
                    self.advance_round("not participating in this quorum");
                    return Ok(TickOutcome::RoundAborted("not participating".into()));
                }
                self.stage = if self.is_producer {
                    Stage::WaitBitsets
                } else {
                    Stage::SendWaitHandshakes
                };
                self.stage_end_time = now + PULSE_STAGE_TIMEOUT_SECS;
                self.sent_this_stage = false;
                Ok(TickOutcome::Advanced(self.stage))
            }

            Stage::SendWaitHandshakes => self.stage_send_wait_handshakes(now, net).await,
            Stage::SendBitset => self.stage_send_bitset(now, net).await,
            Stage::WaitBitsets => self.stage_wait_bitsets(now),
            Stage::WaitTemplate => self.stage_wait_template(now),
            Stage::SendTemplate => self.stage_send_template(now, chain, net).await,
            Stage::SendWaitHashes => self.stage_send_wait_hashes(now, net).await,
            Stage::SendWaitRandom => self.stage_send_wait_random(now, net).await,
            Stage::SendWaitSigned => self.stage_send_wait_signed(now, chain, net).await,
        }
    }

    fn prepare_round(&mut self, now: u64) {
        self.buffer.evict_before(self.round);
        if self.historical_quorums.len() >= HISTORICAL_QUORUM_RING_SIZE {
            self.historical_quorums.pop_front();
        }
        self.historical_quorums
            .push_back((self.height, self.round, self.top_block_hash, self.quorum.clone()));

        self.handshake_bitset = 0;
        self.agreed_bitset = None;
        self.template_bytes = None;
        self.my_random_value = None;
        self.final_random_value = None;
        self.signatures.clear();
        self.sent_this_stage = false;

        let start_time = self.r0_timestamp + self.round as u64 * PULSE_ROUND_TIMEOUT_SECS;
        self.stage_end_time = start_time;
        self.stage = Stage::WaitRound;
        let _ = now;
    }

    fn advance_round(&mut self, reason: &str) {
        info!(round = self.round, reason, "pulse round advancing");
        self.round += 1;
        self.stage = Stage::PrepareRound;
    }

    async fn stage_send_wait_handshakes(&mut self, now: u64, net: &dyn QuorumNet) -> Result<TickOutcome, Error> {
        if !self.sent_this_stage {
            let msg = self.sign(self.round, PulsePayload::Handshake);
            net.relay_pulse_message(msg, &self.quorum.validators, false).await?;
            self.sent_this_stage = true;
        }

        let received = self.buffer.collected(self.round, "handshake");
        for pos in received.keys() {
            self.handshake_bitset |= 1u16 << pos;
        }
        let have_all = self.handshake_bitset.count_ones() as usize == self.quorum.validators.len();

        if have_all || now >= self.stage_end_time {
            self.stage = Stage::SendBitset;
            self.stage_end_time = now + PULSE_STAGE_TIMEOUT_SECS;
            self.sent_this_stage = false;
            Ok(TickOutcome::Advanced(self.stage))
        } else {
            Ok(TickOutcome::Suspended)
        }
    }

    async fn stage_send_bitset(&mut self, _now: u64, net: &dyn QuorumNet) -> Result<TickOutcome, Error> {
        if !self.sent_this_stage {
            let msg = self.sign(self.round, PulsePayload::HandshakeBitset(self.handshake_bitset));
            net.relay_pulse_message(msg, &self.quorum.validators, false).await?;
            self.sent_this_stage = true;
        }
        self.stage = Stage::WaitBitsets;
        Ok(TickOutcome::Advanced(self.stage))
    }

    fn stage_wait_bitsets(&mut self, now: u64) -> Result<TickOutcome, Error> {
        let received = self.buffer.collected(self.round, "handshake_bitset");
        let done = received.len() == self.quorum.validators.len() || now >= self.stage_end_time;
        if !done {
            return Ok(TickOutcome::Suspended);
        }

        let mut tally: BTreeMap<u16, usize> = BTreeMap::new();
        for msg in received.values() {
            if let PulsePayload::HandshakeBitset(bits) = msg.payload {
                *tally.entry(bits).or_default() += 1;
            }
        }
        let winner = tally.into_iter().max_by_key(|(_, count)| *count);

        match winner {
            Some((bitset, votes)) if votes >= PULSE_BLOCK_REQUIRED_SIGNATURES => {
                self.agreed_bitset = Some(bitset);
                let i_am_in = self
                    .my_position
                    .map(|p| bitset & (1u16 << p) != 0)
                    .unwrap_or(false);
                if !i_am_in && !self.is_producer {
                    self.advance_round("excluded from winning handshake bitset");
                    return Ok(TickOutcome::RoundAborted("excluded from bitset".into()));
                }
                self.stage = if self.is_producer {
                    Stage::SendTemplate
                } else {
                    Stage::WaitTemplate
                };
                self.stage_end_time = now + PULSE_STAGE_TIMEOUT_SECS;
                self.sent_this_stage = false;
                Ok(TickOutcome::Advanced(self.stage))
            }
            _ => {
                self.advance_round("no bitset reached required signature count");
                Ok(TickOutcome::RoundAborted("bitset quorum not reached".into()))
            }
        }
    }

    fn stage_wait_template(&mut self, now: u64) -> Result<TickOutcome, Error> {
        let received = self.buffer.collected(self.round, "block_template");
        let Some(msg) = received.values().next() else {
            if now >= self.stage_end_time {
                self.advance_round("no block template received");
                return Ok(TickOutcome::RoundAborted("template timeout".into()));
            }
            return Ok(TickOutcome::Suspended);
        };
        let PulsePayload::BlockTemplate(bytes) = &msg.payload else {
            return Ok(TickOutcome::Suspended);
        };
        self.template_bytes = Some(bytes.clone());
        self.stage = Stage::SendWaitHashes;
        self.stage_end_time = now + PULSE_STAGE_TIMEOUT_SECS;
        self.sent_this_stage = false;
        Ok(TickOutcome::Advanced(self.stage))
    }

    async fn stage_send_template(&mut self, now: u64, chain: &dyn ChainStore, net: &dyn QuorumNet) -> Result<TickOutcome, Error> {
        if !self.sent_this_stage {
            let bitset = self.agreed_bitset.unwrap_or(0);
            let bytes = chain
                .create_next_pulse_block_template(self.top_block_hash, self.round, bitset)
                .await?;
            self.template_bytes = Some(bytes.clone());
            let msg = self.sign(self.round, PulsePayload::BlockTemplate(bytes));
            net.relay_pulse_message(msg, &self.quorum.validators, false).await?;
            self.sent_this_stage = true;
        }
        self.stage = Stage::SendWaitHashes;
        self.stage_end_time = now + PULSE_STAGE_TIMEOUT_SECS;
        self.sent_this_stage = false;
        Ok(TickOutcome::Advanced(self.stage))
    }

    async fn stage_send_wait_hashes(&mut self, now: u64, net: &dyn QuorumNet) -> Result<TickOutcome, Error> {
        if !self.sent_this_stage {
            let value = self.random_seed_value();
            self.my_random_value = Some(value);
            let hash = blake2b::hash(&value);
            let msg = self.sign(self.round, PulsePayload::RandomValueHash(*hash.as_bytes()));
            net.relay_pulse_message(msg, &self.quorum.validators, false).await?;
            self.sent_this_stage = true;
        }
        let received = self.buffer.collected(self.round, "random_value_hash");
        if received.len() == self.quorum.validators.len() || now >= self.stage_end_time {
            self.stage = Stage::SendWaitRandom;
            self.stage_end_time = now + PULSE_STAGE_TIMEOUT_SECS;
            self.sent_this_stage = false;
            Ok(TickOutcome::Advanced(self.stage))
        } else {
            Ok(TickOutcome::Suspended)
        }
    }

    async fn stage_send_wait_random(&mut self, now: u64, net: &dyn QuorumNet) -> Result<TickOutcome, Error> {
        if !self.sent_this_stage {
            let value = self.my_random_value.unwrap_or_else(|| self.random_seed_value());
            let msg = self.sign(self.round, PulsePayload::RandomValue(value));
            net.relay_pulse_message(msg, &self.quorum.validators, false).await?;
            self.sent_this_stage = true;
        }

        let hashes = self.buffer.collected(self.round, "random_value_hash");
        let values = self.buffer.collected(self.round, "random_value");
        let done = values.len() == self.quorum.validators.len() || now >= self.stage_end_time;
        if !done {
            return Ok(TickOutcome::Suspended);
        }

        let mut parts = Vec::new();
        for pos in 0..self.quorum.validators.len() as u16 {
            let Some(value_msg) = values.get(&pos) else { continue };
            let PulsePayload::RandomValue(value) = value_msg.payload else { continue };
            if let Some(hash_msg) = hashes.get(&pos) {
                if let PulsePayload::RandomValueHash(expected) = hash_msg.payload {
                    if *blake2b::hash(&value).as_bytes() != expected {
                        warn!(position = pos, "random value does not match its announced hash, treating as byzantine");
                        continue;
                    }
                }
            }
            parts.push(value);
        }
        let combined: Vec<u8> = parts.into_iter().flatten().collect();
        self.final_random_value = Some(blake2b::hash(&combined));

        self.stage = Stage::SendWaitSigned;
        self.stage_end_time = now + PULSE_STAGE_TIMEOUT_SECS;
        self.sent_this_stage = false;
        Ok(TickOutcome::Advanced(self.stage))
    }

    async fn stage_send_wait_signed(&mut self, now: u64, chain: &dyn ChainStore, net: &dyn QuorumNet) -> Result<TickOutcome, Error> {
        if !self.sent_this_stage {
            let final_hash = self.final_block_hash();
            let sig = self.keypair.sign(final_hash.as_bytes());
            let msg = self.sign(self.round, PulsePayload::SignedBlock(sig));
            net.relay_pulse_message(msg, &self.quorum.validators, false).await?;
            self.sent_this_stage = true;
        }

        let received = self.buffer.collected(self.round, "signed_block");
        for (pos, msg) in &received {
            if let PulsePayload::SignedBlock(sig) = msg.payload {
                self.signatures.insert(*pos, sig);
            }
        }

        if self.signatures.len() < PULSE_BLOCK_REQUIRED_SIGNATURES && now < self.stage_end_time {
            return Ok(TickOutcome::Suspended);
        }
        if self.signatures.len() < PULSE_BLOCK_REQUIRED_SIGNATURES {
            self.advance_round("insufficient signatures before stage deadline");
            return Ok(TickOutcome::RoundAborted("insufficient signatures".into()));
        }

        if self.is_producer {
            let mut positions: Vec<u16> = self.signatures.keys().copied().collect();
            positions.sort_unstable();
            positions.truncate(PULSE_BLOCK_REQUIRED_SIGNATURES);
            let _ = chain; // final submission to the blockchain thread is out of this crate's scope
            let count = positions.len();
            self.stage = Stage::WaitNextBlock;
            return Ok(TickOutcome::BlockProduced { round: self.round, signature_count: count });
        }

        self.stage = Stage::WaitNextBlock;
        Ok(TickOutcome::Advanced(self.stage))
    }

    fn random_seed_value(&self) -> [u8; 32] {
        use rand::RngCore;
        let mut buf = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut buf);
        buf
    }

    fn final_block_hash(&self) -> Hash32 {
        let mut buf = Vec::new();
        if let Some(template) = &self.template_bytes {
            buf.extend_from_slice(template);
        }
        if let Some(random) = &self.final_random_value {
            buf.extend_from_slice(random.as_bytes());
        }
        blake2b::hash(&buf)
    }
}
