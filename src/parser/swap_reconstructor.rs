//! 兑换还原器
//!
//! 通过对比签名者的代币余额与 SOL 余额变化，从钱包的历史交易中还原出兑换记录

use futures::future::join_all;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::common::{
    error::SwapError,
    ledger::{LedgerRpc, SignatureInfo},
    types::EngineConfig,
};
use crate::constants::{SOL_DECIMALS, SOL_MINT};
use crate::constants::trade::history;
use crate::parser::transaction_adapter::TransactionAdapter;
use crate::parser::types::{SwapTransactionRecord, TokenAmount};

/// 还原参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconstructionConfig {
    /// 每次拉取的签名数量
    pub signature_limit: usize,
    /// 每批并发拉取的交易数量
    pub batch_size: usize,
    /// SOL 余额变化的有效阈值（lamports）
    pub native_threshold: u64,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            signature_limit: history::DEFAULT_SIGNATURE_LIMIT,
            batch_size: history::DEFAULT_BATCH_SIZE,
            native_threshold: history::NATIVE_MATERIALITY_THRESHOLD,
        }
    }
}

impl From<&EngineConfig> for ReconstructionConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            signature_limit: config.signature_limit,
            batch_size: config.batch_size,
            native_threshold: config.native_threshold,
        }
    }
}

pub struct SwapReconstructor {
    ledger: Arc<dyn LedgerRpc>,
    config: ReconstructionConfig,
}

impl SwapReconstructor {
    pub fn new(ledger: Arc<dyn LedgerRpc>, config: ReconstructionConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// 还原钱包最近的兑换记录，按时间倒序
    ///
    /// 单笔交易拉取或解析失败只记录日志并跳过
    pub async fn recent_swaps(
        &self,
        wallet: &Pubkey,
    ) -> Result<Vec<SwapTransactionRecord>, SwapError> {
        let signatures = self
            .ledger
            .signatures_for_address(wallet, self.config.signature_limit)
            .await
            .map_err(|e| SwapError::Rpc(e.to_string()))?;

        let candidates: Vec<SignatureInfo> =
            signatures.into_iter().filter(|info| !info.failed).collect();
        debug!(%wallet, count = candidates.len(), "signatures to inspect");

        let mut records = Vec::new();
        for batch in candidates.chunks(self.config.batch_size.max(1)) {
            let results = join_all(batch.iter().map(|info| self.reconstruct_signature(info))).await;
            for (info, result) in batch.iter().zip(results) {
                let signature = &info.signature;
                match result {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => {}
                    Err(e) => warn!(%signature, error = %e, "skipping ledger record"),
                }
            }
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        info!(%wallet, swaps = records.len(), "reconstructed swap history");
        Ok(records)
    }

    /// 记录缺少 `blockTime` 时使用签名列表中的时间
    async fn reconstruct_signature(
        &self,
        info: &SignatureInfo,
    ) -> Result<Option<SwapTransactionRecord>, SwapError> {
        let signature = info.signature.as_str();
        let Some(value) = self
            .ledger
            .transaction_json(signature)
            .await
            .map_err(|e| SwapError::parse_failure(signature, e))?
        else {
            debug!(%signature, "ledger has no record");
            return Ok(None);
        };
        let record = reconstruct_swap(&value, self.config.native_threshold)?;
        Ok(record.map(|mut record| {
            if value["blockTime"].as_i64().is_none() {
                record.timestamp = info.block_time.unwrap_or(0);
            }
            record
        }))
    }
}

/// 单侧候选
#[derive(Debug, Clone, Copy)]
struct Leg {
    mint: Pubkey,
    decimals: u8,
    magnitude: u128,
}

impl Leg {
    fn keep_larger(current: Option<Leg>, candidate: Leg) -> Option<Leg> {
        match current {
            Some(leg) if leg.magnitude >= candidate.magnitude => Some(leg),
            _ => Some(candidate),
        }
    }
}

/// 从单条 `getTransaction` JSON 中还原兑换
///
/// * `Ok(None)` - 不是兑换（失败交易、少于两种代币、缺少某一侧）
/// * `Err` - 记录格式错误
pub fn reconstruct_swap(
    value: &Value,
    native_threshold: u64,
) -> Result<Option<SwapTransactionRecord>, SwapError> {
    let signature = value["transaction"]["signatures"][0].as_str().unwrap_or("<unknown>");
    let tx = TransactionAdapter::from_json(value)
        .map_err(|e| SwapError::parse_failure(signature, e))?;

    if tx.failed {
        return Ok(None);
    }

    let mints = tx.distinct_mints();
    if mints.len() < 2 {
        return Ok(None);
    }

    let (payer_index, owner) = tx
        .fee_payer()
        .ok_or_else(|| SwapError::parse_failure(&tx.signature, "transaction has no signer"))?;

    // 只统计签名者持有的账户，排除路由中间账户
    let owned_by_signer = |account_index: usize, owner_field: Option<Pubkey>| match owner_field {
        Some(balance_owner) => balance_owner == owner,
        None => tx.account_keys.get(account_index).is_some_and(|key| key.pubkey == owner),
    };

    let mut deltas: HashMap<Pubkey, i128> = HashMap::new();
    let mut decimals: HashMap<Pubkey, u8> = HashMap::new();
    for balance in &tx.pre_token_balances {
        if owned_by_signer(balance.account_index, balance.owner) {
            *deltas.entry(balance.mint).or_default() -= i128::from(balance.amount);
            decimals.insert(balance.mint, balance.decimals);
        }
    }
    for balance in &tx.post_token_balances {
        if owned_by_signer(balance.account_index, balance.owner) {
            *deltas.entry(balance.mint).or_default() += i128::from(balance.amount);
            decimals.insert(balance.mint, balance.decimals);
        }
    }

    let mut input: Option<Leg> = None;
    let mut output: Option<Leg> = None;
    for (mint, delta) in &deltas {
        let leg = Leg {
            mint: *mint,
            decimals: decimals.get(mint).copied().unwrap_or(SOL_DECIMALS),
            magnitude: delta.unsigned_abs(),
        };
        if *delta < 0 {
            input = Leg::keep_larger(input, leg);
        } else if *delta > 0 {
            output = Leg::keep_larger(output, leg);
        }
    }

    // SOL 余额：支出不含网络手续费，收入扣除网络手续费，超过阈值才计入
    if let Some(delta) = tx.lamport_delta(payer_index) {
        let fee = i128::from(tx.fee);
        let threshold = i128::from(native_threshold);
        let spent = -delta - fee;
        let received = delta - fee;
        if spent > threshold {
            let leg = Leg { mint: SOL_MINT, decimals: SOL_DECIMALS, magnitude: spent.unsigned_abs() };
            input = Leg::keep_larger(input, leg);
        } else if received > threshold {
            let leg =
                Leg { mint: SOL_MINT, decimals: SOL_DECIMALS, magnitude: received.unsigned_abs() };
            output = Leg::keep_larger(output, leg);
        }
    }

    let (Some(input), Some(output)) = (input, output) else {
        return Ok(None);
    };
    if input.mint == output.mint || input.mint == Pubkey::default() || output.mint == Pubkey::default()
    {
        return Ok(None);
    }

    let to_amount = |leg: Leg| -> Result<TokenAmount, SwapError> {
        let raw = u64::try_from(leg.magnitude).map_err(|_| {
            SwapError::parse_failure(&tx.signature, format!("amount of {} overflows u64", leg.mint))
        })?;
        Ok(TokenAmount::new(leg.mint, leg.decimals, raw))
    };

    let hop_count = u32::try_from(mints.len() - 1).unwrap_or(u32::MAX).max(1);
    Ok(Some(SwapTransactionRecord {
        signature: tx.signature.clone(),
        timestamp: tx.block_time.unwrap_or(0),
        input_token: to_amount(input)?,
        output_token: to_amount(output)?,
        success: true,
        fee: tx.fee,
        is_multi_hop: hop_count > 1,
        hop_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn balance(index: usize, mint: &Pubkey, owner: &Pubkey, amount: u64) -> Value {
        json!({
            "accountIndex": index,
            "mint": mint.to_string(),
            "owner": owner.to_string(),
            "uiTokenAmount": { "amount": amount.to_string(), "decimals": 6 }
        })
    }

    fn record(owner: &Pubkey, pre: Vec<Value>, post: Vec<Value>, lamports: (u64, u64)) -> Value {
        json!({
            "slot": 1,
            "blockTime": 1_700_000_000,
            "transaction": {
                "signatures": ["sig"],
                "message": {
                    "accountKeys": [
                        { "pubkey": owner.to_string(), "signer": true, "writable": true },
                        { "pubkey": Pubkey::new_unique().to_string(), "signer": false, "writable": true },
                        { "pubkey": Pubkey::new_unique().to_string(), "signer": false, "writable": true },
                        { "pubkey": Pubkey::new_unique().to_string(), "signer": false, "writable": true }
                    ]
                }
            },
            "meta": {
                "err": null,
                "fee": 5000,
                "preBalances": [lamports.0, 0, 0, 0],
                "postBalances": [lamports.1, 0, 0, 0],
                "preTokenBalances": pre,
                "postTokenBalances": post
            }
        })
    }

    #[test]
    fn ignores_routing_accounts() {
        let owner = Pubkey::new_unique();
        let pool = Pubkey::new_unique();
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let value = record(
            &owner,
            vec![balance(1, &a, &owner, 100), balance(3, &b, &pool, 1_000)],
            vec![balance(1, &a, &owner, 40), balance(2, &b, &owner, 50), balance(3, &b, &pool, 950)],
            (10_000_000, 9_995_000),
        );

        let swap = reconstruct_swap(&value, 1_000_000).unwrap().unwrap();
        assert_eq!(swap.input_token.mint, a);
        assert_eq!(swap.input_token.raw_amount, 60);
        assert_eq!(swap.output_token.mint, b);
        assert_eq!(swap.output_token.raw_amount, 50);
        assert_eq!(swap.hop_count, 1);
        assert!(!swap.is_multi_hop);
    }

    #[test]
    fn native_gain_becomes_output() {
        let owner = Pubkey::new_unique();
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let value = record(
            &owner,
            vec![balance(1, &a, &owner, 500), balance(2, &b, &owner, 7)],
            vec![balance(1, &a, &owner, 0), balance(2, &b, &owner, 7)],
            (1_000_000_000, 3_000_000_000),
        );

        let swap = reconstruct_swap(&value, 1_000_000).unwrap().unwrap();
        assert_eq!(swap.input_token.mint, a);
        assert_eq!(swap.output_token.mint, SOL_MINT);
        assert_eq!(swap.output_token.raw_amount, 1_999_995_000);
    }

    #[test]
    fn native_gain_below_threshold_after_fee_is_ignored() {
        let owner = Pubkey::new_unique();
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        // 收入 1_004_000，扣除 5_000 手续费后低于阈值
        let value = record(
            &owner,
            vec![balance(1, &a, &owner, 500), balance(2, &b, &owner, 7)],
            vec![balance(1, &a, &owner, 0), balance(2, &b, &owner, 7)],
            (1_000_000_000, 1_001_004_000),
        );
        assert!(reconstruct_swap(&value, 1_000_000).unwrap().is_none());
    }

    #[test]
    fn errored_record_is_not_a_swap() {
        let owner = Pubkey::new_unique();
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut value = record(
            &owner,
            vec![balance(1, &a, &owner, 100)],
            vec![balance(1, &a, &owner, 40), balance(2, &b, &owner, 50)],
            (10_000_000, 9_995_000),
        );
        value["meta"]["err"] = json!({ "InstructionError": [0, "Custom"] });
        assert!(reconstruct_swap(&value, 1_000_000).unwrap().is_none());
    }
}
