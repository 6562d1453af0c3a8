//! Commission injection into already built transactions.
//!
//! Legacy envelopes get the transfer appended, lookup-free v0 messages are
//! decompiled and recompiled, and v0 messages with lookups are patched at the
//! compiled level against their static keys. When none of that is possible the
//! fee travels in a separate legacy transaction.

use solana_sdk::{
    hash::Hash,
    message::{compiled_instruction::CompiledInstruction, v0},
    pubkey::Pubkey,
};
use solana_system_interface::instruction::transfer;
use tracing::{debug, warn};

use crate::common::{error::SwapError, types::FeeSpec};
use crate::constants::SYSTEM_PROGRAM;
use crate::trading::common::envelope::{
    TransactionEnvelope, decompile_instructions, is_signer_index, is_writable_index,
};
use crate::utils::calc::common::compute_commission;

/// System program `Transfer` instruction index.
const SYSTEM_TRANSFER_OPCODE: u32 = 2;

/// Result of a patch attempt.
#[derive(Debug, Clone)]
pub struct FeePatchOutcome {
    /// The patched envelope, or the untouched original when patching was skipped
    pub envelope: TransactionEnvelope,
    /// The fee transfer is part of `envelope`
    pub fee_added: bool,
    pub fee_amount: u64,
    /// Standalone legacy transaction carrying the fee, to submit separately
    pub companion: Option<TransactionEnvelope>,
    /// Why the fee could not be embedded; always a `FeeInjectionFailure`
    pub error: Option<SwapError>,
}

impl FeePatchOutcome {
    fn unchanged(envelope: TransactionEnvelope, fee_amount: u64) -> Self {
        Self { envelope, fee_added: false, fee_amount, companion: None, error: None }
    }

    fn patched(envelope: TransactionEnvelope, fee_amount: u64) -> Self {
        Self { envelope, fee_added: true, fee_amount, companion: None, error: None }
    }

    /// The fee reaches the recipient one way or another.
    pub fn fee_collected(&self) -> bool {
        self.fee_added || self.companion.is_some()
    }
}

/// Instruction data of a system transfer: 4-byte opcode then the full 64-bit amount.
#[inline]
pub fn encode_transfer_data(lamports: u64) -> [u8; 12] {
    let mut data = [0u8; 12];
    data[..4].copy_from_slice(&SYSTEM_TRANSFER_OPCODE.to_le_bytes());
    data[4..].copy_from_slice(&lamports.to_le_bytes());
    data
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionPatcher;

impl TransactionPatcher {
    /// Computes the commission on `base_amount` and injects it.
    pub fn apply_fee_spec(
        &self,
        envelope: TransactionEnvelope,
        base_amount: u64,
        fee: &FeeSpec,
        fallback_blockhash: Option<Hash>,
    ) -> FeePatchOutcome {
        if !fee.is_enabled() {
            return FeePatchOutcome::unchanged(envelope, 0);
        }
        let amount = compute_commission(base_amount, fee.percentage_bps());
        self.apply_fee(envelope, amount, fee.recipient(), fallback_blockhash)
    }

    /// Injects a transfer of `fee_lamports` from the fee payer to `recipient`.
    ///
    /// `fallback_blockhash` is used for the companion transaction; the envelope's
    /// own blockhash is used when it is `None`.
    pub fn apply_fee(
        &self,
        envelope: TransactionEnvelope,
        fee_lamports: u64,
        recipient: &Pubkey,
        fallback_blockhash: Option<Hash>,
    ) -> FeePatchOutcome {
        if fee_lamports == 0 {
            debug!("commission rounds to zero, leaving transaction untouched");
            return FeePatchOutcome::unchanged(envelope, 0);
        }

        let attempt = match envelope {
            TransactionEnvelope::Legacy { mut instructions, payer, recent_blockhash } => {
                instructions.push(transfer(&payer, recipient, fee_lamports));
                return FeePatchOutcome::patched(
                    TransactionEnvelope::Legacy { instructions, payer, recent_blockhash },
                    fee_lamports,
                );
            }
            TransactionEnvelope::VersionedNoLut { message } => {
                recompile_with_fee(&message, fee_lamports, recipient)
                    .map(|patched| TransactionEnvelope::VersionedNoLut { message: patched })
                    .map_err(|reason| (TransactionEnvelope::VersionedNoLut { message }, reason))
            }
            TransactionEnvelope::VersionedWithLut { mut message } => {
                match append_compiled_fee(&mut message, fee_lamports, recipient) {
                    Ok(()) => Ok(TransactionEnvelope::VersionedWithLut { message }),
                    Err(reason) => Err((TransactionEnvelope::VersionedWithLut { message }, reason)),
                }
            }
        };

        match attempt {
            Ok(envelope) => FeePatchOutcome::patched(envelope, fee_lamports),
            Err((original, reason)) => {
                warn!(%reason, "in-place fee injection not possible, falling back");
                fallback(original, fee_lamports, recipient, fallback_blockhash, reason)
            }
        }
    }
}

/// Decompile, append, recompile. Only valid when every key is static.
fn recompile_with_fee(
    message: &v0::Message,
    fee_lamports: u64,
    recipient: &Pubkey,
) -> Result<v0::Message, String> {
    let payer = *message.account_keys.first().ok_or("message has no fee payer")?;
    let mut instructions =
        decompile_instructions(&message.header, &message.account_keys, &message.instructions)?;
    instructions.push(transfer(&payer, recipient, fee_lamports));
    v0::Message::try_compile(&payer, &instructions, &[], message.recent_blockhash)
        .map_err(|e| format!("recompile failed: {e}"))
}

/// Appends a compiled transfer that only references static keys.
fn append_compiled_fee(
    message: &mut v0::Message,
    fee_lamports: u64,
    recipient: &Pubkey,
) -> Result<(), String> {
    let keys = &message.account_keys;
    if keys.is_empty()
        || !is_signer_index(&message.header, 0)
        || !is_writable_index(&message.header, 0, keys.len())
    {
        return Err("fee payer is not a writable signer".to_string());
    }
    let recipient_index = keys
        .iter()
        .position(|key| key == recipient)
        .ok_or_else(|| format!("fee recipient {recipient} is not a static account key"))?;
    if !is_writable_index(&message.header, recipient_index, keys.len()) {
        return Err(format!("fee recipient {recipient} is not writable in this message"));
    }
    let system_index = keys
        .iter()
        .position(|key| *key == SYSTEM_PROGRAM)
        .ok_or("system program is not a static account key")?;

    let to_u8 = |index: usize| {
        u8::try_from(index).map_err(|_| format!("account index {index} does not fit in u8"))
    };
    message.instructions.push(CompiledInstruction {
        program_id_index: to_u8(system_index)?,
        accounts: vec![0, to_u8(recipient_index)?],
        data: encode_transfer_data(fee_lamports).to_vec(),
    });
    Ok(())
}

fn fallback(
    original: TransactionEnvelope,
    fee_lamports: u64,
    recipient: &Pubkey,
    fallback_blockhash: Option<Hash>,
    reason: String,
) -> FeePatchOutcome {
    // an all-zero blockhash counts as missing
    let blockhash = fallback_blockhash
        .or_else(|| original.recent_blockhash())
        .filter(|hash| *hash != Hash::default());
    let companion = match (blockhash, original.payer()) {
        (Some(blockhash), Some(payer)) => Some(TransactionEnvelope::legacy(
            vec![transfer(&payer, recipient, fee_lamports)],
            payer,
            Some(blockhash),
        )),
        _ => None,
    };
    let error = if companion.is_some() {
        SwapError::FeeInjectionFailure(reason)
    } else {
        let err = SwapError::FeeInjectionFailure(format!(
            "{reason}; no blockhash for a separate fee transaction"
        ));
        warn!(error = %err, amount = fee_lamports, "commission cannot be collected");
        err
    };
    FeePatchOutcome {
        envelope: original,
        fee_added: false,
        fee_amount: fee_lamports,
        companion,
        error: Some(error),
    }
}
