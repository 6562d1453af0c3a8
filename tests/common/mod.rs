//! 测试用的内存账本、AMM 场所与元数据源
//!
//! 所有集成测试共享这些假实现，无需网络即可运行

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{Value, json};
use sol_swap_engine::common::{
    SubmitError,
    ledger::{LedgerRpc, SignatureInfo, SignatureState},
    raydium_api::{AmmQuote, AmmSwapBuild, AmmVenue},
    token_metadata::MetadataSource,
};
use sol_swap_engine::parser::TokenMetadata;
use sol_swap_engine::trading::lifecycle::{StatusUpdate, TransactionStatusCallback};
use solana_sdk::{
    hash::Hash,
    message::VersionedMessage,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// 内存账本
#[derive(Default)]
pub struct FakeLedger {
    pub blockhashes: Mutex<VecDeque<Hash>>,
    /// 前 N 次获取 blockhash 失败
    pub blockhash_failures: AtomicUsize,
    pub blockhash_calls: AtomicUsize,
    pub accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    pub signatures: Mutex<Vec<SignatureInfo>>,
    pub transactions: Mutex<HashMap<String, Value>>,
    /// 拉取时返回错误的签名
    pub broken: Mutex<HashSet<String>>,
    /// 依次弹出的提交结果，空时视为成功
    pub send_script: Mutex<VecDeque<Result<(), SubmitError>>>,
    pub sent: Mutex<Vec<VersionedTransaction>>,
    pub statuses: Mutex<VecDeque<Option<SignatureState>>>,
}

impl FakeLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_transaction(&self, signature: &str, block_time: Option<i64>, record: Value) {
        self.signatures.lock().push(SignatureInfo {
            signature: signature.to_string(),
            failed: false,
            block_time,
        });
        self.transactions.lock().insert(signature.to_string(), record);
    }

    pub fn script_send(&self, results: Vec<Result<(), SubmitError>>) {
        self.send_script.lock().extend(results);
    }

    pub fn sent(&self) -> Vec<VersionedTransaction> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl LedgerRpc for FakeLedger {
    async fn latest_blockhash(&self) -> Result<Hash> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        let failures = self.blockhash_failures.load(Ordering::SeqCst);
        if failures > 0 {
            self.blockhash_failures.store(failures - 1, Ordering::SeqCst);
            return Err(anyhow!("node is behind"));
        }
        Ok(self.blockhashes.lock().pop_front().unwrap_or_else(Hash::new_unique))
    }

    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(self.accounts.lock().get(address).cloned())
    }

    async fn signatures_for_address(
        &self,
        _address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>> {
        Ok(self.signatures.lock().iter().take(limit).cloned().collect())
    }

    async fn transaction_json(&self, signature: &str) -> Result<Option<Value>> {
        if self.broken.lock().contains(signature) {
            return Err(anyhow!("connection reset"));
        }
        Ok(self.transactions.lock().get(signature).cloned())
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> std::result::Result<Signature, SubmitError> {
        self.sent.lock().push(transaction.clone());
        match self.send_script.lock().pop_front() {
            Some(Err(e)) => Err(e),
            _ => Ok(transaction.signatures.first().copied().unwrap_or_default()),
        }
    }

    async fn signature_state(&self, _signature: &Signature) -> Result<Option<SignatureState>> {
        Ok(self.statuses.lock().pop_front().flatten())
    }
}

/// 可编排的 AMM 场所
#[derive(Default)]
pub struct FakeAmm {
    pub listed: Mutex<HashSet<Pubkey>>,
    pub quote: Mutex<Option<AmmQuote>>,
    pub payloads: Mutex<Vec<String>>,
    pub priority_fee: Mutex<String>,
    pub builds: Mutex<Vec<AmmSwapBuild>>,
}

impl FakeAmm {
    pub fn new() -> Arc<Self> {
        let amm = Self::default();
        *amm.priority_fee.lock() = "5000".to_string();
        Arc::new(amm)
    }

    pub fn list(&self, mint: Pubkey) {
        self.listed.lock().insert(mint);
    }
}

#[async_trait]
impl AmmVenue for FakeAmm {
    async fn is_listed(&self, mint: &Pubkey) -> Result<bool> {
        Ok(self.listed.lock().contains(mint))
    }

    async fn quote_exact_in(
        &self,
        _input_mint: &Pubkey,
        _output_mint: &Pubkey,
        _amount: u64,
        _slippage_bps: u16,
    ) -> Result<Option<AmmQuote>> {
        Ok(self.quote.lock().clone())
    }

    async fn priority_fee(&self) -> String {
        self.priority_fee.lock().clone()
    }

    async fn build_swap_transactions(&self, request: &AmmSwapBuild) -> Result<Vec<String>> {
        self.builds.lock().push(request.clone());
        Ok(self.payloads.lock().clone())
    }
}

pub fn amm_quote(input_mint: Pubkey, output_mint: Pubkey, input: u64, output: u64) -> AmmQuote {
    AmmQuote {
        input_mint,
        output_mint,
        input_amount: input,
        output_amount: output,
        other_amount_threshold: output - output / 100,
        slippage_bps: 100,
        price_impact_bps: 12,
        route: vec!["pool-1".to_string()],
        raw: json!({ "success": true }),
    }
}

/// 元数据源，记录调用次数
#[derive(Default)]
pub struct FakeMetadata {
    pub known: Mutex<HashMap<Pubkey, TokenMetadata>>,
    pub failing: Mutex<HashSet<Pubkey>>,
    pub calls: AtomicUsize,
}

impl FakeMetadata {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, mint: Pubkey, symbol: &str, decimals: u8) {
        self.known.lock().insert(
            mint,
            TokenMetadata {
                mint,
                symbol: symbol.to_string(),
                name: format!("{symbol} Token"),
                decimals,
                logo_uri: Some(format!("https://img.example/{symbol}.png")),
            },
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for FakeMetadata {
    async fn fetch(&self, mint: &Pubkey) -> Result<TokenMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().contains(mint) {
            return Err(anyhow!("503 from token list"));
        }
        self.known.lock().get(mint).cloned().ok_or_else(|| anyhow!("{mint} not found"))
    }
}

/// 记录所有状态更新的回调
#[derive(Default, Clone)]
pub struct RecordingCallback {
    pub updates: Arc<Mutex<Vec<StatusUpdate>>>,
}

impl RecordingCallback {
    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().clone()
    }
}

impl TransactionStatusCallback for RecordingCallback {
    fn on_status(&self, update: StatusUpdate) -> BoxFuture<'static, Result<()>> {
        self.updates.lock().push(update);
        Box::pin(async { Ok(()) })
    }
}

/// 将消息编码为场所返回的 base64 交易
pub fn wire_transaction(message: VersionedMessage) -> String {
    let required = usize::from(message.header().num_required_signatures);
    let tx = VersionedTransaction { signatures: vec![Signature::default(); required], message };
    STANDARD.encode(bincode::serialize(&tx).expect("serialize transaction"))
}

/// 代币余额条目
pub fn token_balance(index: usize, mint: &Pubkey, owner: &Pubkey, amount: u64, decimals: u8) -> Value {
    json!({
        "accountIndex": index,
        "mint": mint.to_string(),
        "owner": owner.to_string(),
        "uiTokenAmount": {
            "amount": amount.to_string(),
            "decimals": decimals,
            "uiAmountString": "0"
        }
    })
}

/// `jsonParsed` 格式的交易记录，签名者位于索引 0，另有 5 个可写账户
pub fn ledger_record(
    signature: &str,
    owner: &Pubkey,
    block_time: i64,
    lamports: (u64, u64),
    fee: u64,
    pre: Vec<Value>,
    post: Vec<Value>,
) -> Value {
    let mut keys = vec![json!({ "pubkey": owner.to_string(), "signer": true, "writable": true, "source": "transaction" })];
    for _ in 0..5 {
        keys.push(json!({
            "pubkey": Pubkey::new_unique().to_string(),
            "signer": false,
            "writable": true,
            "source": "transaction"
        }));
    }
    json!({
        "slot": 250_000_000u64,
        "blockTime": block_time,
        "version": 0,
        "transaction": {
            "signatures": [signature],
            "message": { "accountKeys": keys, "instructions": [] }
        },
        "meta": {
            "err": null,
            "fee": fee,
            "preBalances": [lamports.0, 0, 0, 0, 0, 0],
            "postBalances": [lamports.1, 0, 0, 0, 0, 0],
            "preTokenBalances": pre,
            "postTokenBalances": post
        }
    })
}

/// 初始状态的 bonding curve 账户数据（含 8 字节 discriminator）
pub fn curve_account_data(creator: &Pubkey, complete: bool) -> Vec<u8> {
    use sol_swap_engine::instruction::utils::pumpfun::global_constants::{
        INITIAL_REAL_TOKEN_RESERVES, INITIAL_VIRTUAL_SOL_RESERVES, INITIAL_VIRTUAL_TOKEN_RESERVES,
        TOKEN_TOTAL_SUPPLY,
    };
    let mut data = vec![0x17, 0xb7, 0xf8, 0x37, 0x60, 0xd8, 0xac, 0x60];
    for value in [
        INITIAL_VIRTUAL_TOKEN_RESERVES,
        INITIAL_VIRTUAL_SOL_RESERVES,
        INITIAL_REAL_TOKEN_RESERVES,
        0,
        TOKEN_TOTAL_SUPPLY,
    ] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.push(u8::from(complete));
    data.extend_from_slice(creator.as_ref());
    data.push(0);
    data
}

/// 在账本中放入 `mint` 的 bonding curve
pub fn install_curve(ledger: &FakeLedger, mint: &Pubkey, creator: &Pubkey, complete: bool) {
    use sol_swap_engine::instruction::utils::pumpfun::get_bonding_curve_pda;
    ledger
        .accounts
        .lock()
        .insert(get_bonding_curve_pda(mint), curve_account_data(creator, complete));
}
