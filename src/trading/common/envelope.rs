//! Transaction envelope: the three shapes a swap transaction can take before signing.

use base64::{Engine, engine::general_purpose::STANDARD};
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::{
        Message, MessageHeader, VersionedMessage, compiled_instruction::CompiledInstruction, v0,
    },
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};
use std::sync::Arc;

use crate::common::error::SwapError;

/// Text encoding of a serialized transaction handed over by a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireEncoding {
    #[default]
    Base64,
    Base58,
}

/// A transaction in one of three shapes.
///
/// Constructed once per attempt, mutated at most once by the fee patcher and
/// consumed by value when it is signed and sent.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionEnvelope {
    /// Plain instruction list compiled into a legacy message at signing time
    Legacy {
        instructions: Vec<Instruction>,
        payer: Pubkey,
        recent_blockhash: Option<Hash>,
    },
    /// v0 message that does not reference lookup tables
    VersionedNoLut { message: v0::Message },
    /// v0 message with address table lookups; only static keys are visible here
    VersionedWithLut { message: v0::Message },
}

impl TransactionEnvelope {
    pub fn legacy(instructions: Vec<Instruction>, payer: Pubkey, recent_blockhash: Option<Hash>) -> Self {
        Self::Legacy { instructions, payer, recent_blockhash }
    }

    /// Classifies a v0 message by whether it carries lookups.
    pub fn from_v0(message: v0::Message) -> Self {
        if message.address_table_lookups.is_empty() {
            Self::VersionedNoLut { message }
        } else {
            Self::VersionedWithLut { message }
        }
    }

    /// Classifies an already compiled message; legacy messages are decompiled.
    pub fn from_message(message: VersionedMessage) -> Result<Self, SwapError> {
        match message {
            VersionedMessage::Legacy(message) => {
                let payer = message.account_keys.first().copied().ok_or_else(|| {
                    SwapError::TransactionBuildFailure("legacy message has no accounts".to_string())
                })?;
                let instructions =
                    decompile_instructions(&message.header, &message.account_keys, &message.instructions)
                        .map_err(SwapError::TransactionBuildFailure)?;
                Ok(Self::Legacy {
                    instructions,
                    payer,
                    recent_blockhash: Some(message.recent_blockhash),
                })
            }
            VersionedMessage::V0(message) => Ok(Self::from_v0(message)),
        }
    }

    /// Decodes a serialized transaction (signatures are dropped).
    pub fn from_wire(payload: &str, encoding: WireEncoding) -> Result<Self, SwapError> {
        let bytes = match encoding {
            WireEncoding::Base64 => STANDARD.decode(payload.trim()).map_err(|e| {
                SwapError::TransactionBuildFailure(format!("invalid base64 transaction: {e}"))
            })?,
            WireEncoding::Base58 => bs58::decode(payload.trim()).into_vec().map_err(|e| {
                SwapError::TransactionBuildFailure(format!("invalid base58 transaction: {e}"))
            })?,
        };
        let tx: VersionedTransaction = bincode::deserialize(&bytes).map_err(|e| {
            SwapError::TransactionBuildFailure(format!("undecodable transaction: {e}"))
        })?;
        Self::from_message(tx.message)
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy { .. })
    }

    pub fn instruction_count(&self) -> usize {
        match self {
            Self::Legacy { instructions, .. } => instructions.len(),
            Self::VersionedNoLut { message } | Self::VersionedWithLut { message } => {
                message.instructions.len()
            }
        }
    }

    pub fn payer(&self) -> Option<Pubkey> {
        match self {
            Self::Legacy { payer, .. } => Some(*payer),
            Self::VersionedNoLut { message } | Self::VersionedWithLut { message } => {
                message.account_keys.first().copied()
            }
        }
    }

    pub fn recent_blockhash(&self) -> Option<Hash> {
        match self {
            Self::Legacy { recent_blockhash, .. } => *recent_blockhash,
            Self::VersionedNoLut { message } | Self::VersionedWithLut { message } => {
                Some(message.recent_blockhash)
            }
        }
    }

    pub fn set_recent_blockhash(&mut self, hash: Hash) {
        match self {
            Self::Legacy { recent_blockhash, .. } => *recent_blockhash = Some(hash),
            Self::VersionedNoLut { message } | Self::VersionedWithLut { message } => {
                message.recent_blockhash = hash;
            }
        }
    }

    /// Compiles the envelope into a message. Legacy envelopes need a blockhash.
    pub fn to_message(&self) -> Result<VersionedMessage, SwapError> {
        match self {
            Self::Legacy { instructions, payer, recent_blockhash } => {
                let blockhash = recent_blockhash.ok_or_else(|| {
                    SwapError::TransactionBuildFailure(
                        "legacy transaction has no recent blockhash".to_string(),
                    )
                })?;
                Ok(VersionedMessage::Legacy(Message::new_with_blockhash(
                    instructions,
                    Some(payer),
                    &blockhash,
                )))
            }
            Self::VersionedNoLut { message } | Self::VersionedWithLut { message } => {
                Ok(VersionedMessage::V0(message.clone()))
            }
        }
    }

    /// Wire bytes of the message. A legacy envelope without a blockhash serializes
    /// against the default hash.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Self::Legacy { instructions, payer, recent_blockhash } => {
                let blockhash = recent_blockhash.unwrap_or_default();
                VersionedMessage::Legacy(Message::new_with_blockhash(
                    instructions,
                    Some(payer),
                    &blockhash,
                ))
                .serialize()
            }
            Self::VersionedNoLut { message } | Self::VersionedWithLut { message } => {
                VersionedMessage::V0(message.clone()).serialize()
            }
        }
    }

    /// Consumes the envelope into a transaction with placeholder signatures.
    pub fn into_unsigned_transaction(self) -> Result<VersionedTransaction, SwapError> {
        let message = self.to_message()?;
        let required = usize::from(message.header().num_required_signatures);
        Ok(VersionedTransaction { signatures: vec![Signature::default(); required], message })
    }
}

/// Output of the assembler: the envelope plus any keypairs the engine itself must
/// sign with (e.g. a freshly generated mint).
#[derive(Debug, Clone)]
pub struct AssembledTransaction {
    pub envelope: TransactionEnvelope,
    pub partial_signers: Vec<Arc<Keypair>>,
}

impl AssembledTransaction {
    pub fn new(envelope: TransactionEnvelope) -> Self {
        Self { envelope, partial_signers: Vec::new() }
    }

    pub fn with_partial_signer(mut self, signer: Arc<Keypair>) -> Self {
        self.partial_signers.push(signer);
        self
    }
}

/// Whether static key `index` is writable according to the message header.
///
/// Static keys are ordered signed-writable, signed-readonly, unsigned-writable,
/// unsigned-readonly.
pub fn is_writable_index(header: &MessageHeader, index: usize, num_static_keys: usize) -> bool {
    if index >= num_static_keys {
        return false;
    }
    let num_signed = usize::from(header.num_required_signatures);
    if index < num_signed {
        index < num_signed.saturating_sub(usize::from(header.num_readonly_signed_accounts))
    } else {
        index < num_static_keys.saturating_sub(usize::from(header.num_readonly_unsigned_accounts))
    }
}

#[inline]
pub fn is_signer_index(header: &MessageHeader, index: usize) -> bool {
    index < usize::from(header.num_required_signatures)
}

/// Rebuilds instructions from compiled form against static keys only.
pub fn decompile_instructions(
    header: &MessageHeader,
    keys: &[Pubkey],
    compiled: &[CompiledInstruction],
) -> Result<Vec<Instruction>, String> {
    let lookup = |index: u8| {
        keys.get(usize::from(index))
            .copied()
            .ok_or_else(|| format!("account index {index} out of range ({} keys)", keys.len()))
    };
    compiled
        .iter()
        .map(|ix| {
            let program_id = lookup(ix.program_id_index)?;
            let accounts = ix
                .accounts
                .iter()
                .map(|&index| {
                    let pubkey = lookup(index)?;
                    let i = usize::from(index);
                    Ok(AccountMeta {
                        pubkey,
                        is_signer: is_signer_index(header, i),
                        is_writable: is_writable_index(header, i, keys.len()),
                    })
                })
                .collect::<Result<Vec<_>, String>>()?;
            Ok(Instruction { program_id, accounts, data: ix.data.clone() })
        })
        .collect()
}

/// Adds `signer`'s signature in its slot, leaving other slots untouched.
pub fn sign_partial(tx: &mut VersionedTransaction, signer: &Keypair) -> Result<(), SwapError> {
    let required = usize::from(tx.message.header().num_required_signatures);
    let pubkey = signer.pubkey();
    let position = tx
        .message
        .static_account_keys()
        .iter()
        .take(required)
        .position(|key| *key == pubkey)
        .ok_or_else(|| {
            SwapError::TransactionBuildFailure(format!("{pubkey} is not a required signer"))
        })?;
    if tx.signatures.len() < required {
        tx.signatures.resize(required, Signature::default());
    }
    let bytes = tx.message.serialize();
    tx.signatures[position] = signer.sign_message(&bytes);
    Ok(())
}
