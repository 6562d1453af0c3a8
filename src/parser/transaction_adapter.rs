//! 交易适配器 - 统一的账本记录访问层
//!
//! 将 `getTransaction` 返回的 JSON（`jsonParsed` 或 `json` 编码，legacy 或 v0）
//! 转换为兑换还原所需的字段：账户、签名者、SOL 余额、代币余额

use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeSet;
use std::str::FromStr;

/// 交易适配器错误
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("缺少字段: {0}")]
    MissingField(&'static str),
    #[error("Pubkey 解析失败: {0}")]
    PubkeyParseError(String),
    #[error("数量解析失败: {0}")]
    AmountParseError(String),
    #[error("账户索引越界: {index} (共 {len} 个账户)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// 账户信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKeyInfo {
    pub pubkey: Pubkey,
    pub signer: bool,
    pub writable: bool,
}

/// 代币余额条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub account_index: usize,
    pub mint: Pubkey,
    /// Token 账户所有者（旧记录可能缺失）
    pub owner: Option<Pubkey>,
    /// 原始数量
    pub amount: u64,
    pub decimals: u8,
}

/// 交易适配器
#[derive(Debug, Clone)]
pub struct TransactionAdapter {
    /// 交易签名
    pub signature: String,
    /// 区块槽位
    pub slot: u64,
    /// 区块时间
    pub block_time: Option<i64>,
    /// 账户列表（含地址查找表加载的账户）
    pub account_keys: Vec<AccountKeyInfo>,
    /// 网络手续费
    pub fee: u64,
    /// meta.err 非空
    pub failed: bool,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
}

impl TransactionAdapter {
    /// 从 `getTransaction` 的 JSON 结果创建适配器
    pub fn from_json(value: &Value) -> Result<Self, AdapterError> {
        let signature = value["transaction"]["signatures"]
            .as_array()
            .and_then(|sigs| sigs.first())
            .and_then(Value::as_str)
            .ok_or(AdapterError::MissingField("transaction.signatures"))?
            .to_string();

        let meta = value.get("meta").filter(|m| !m.is_null()).ok_or(AdapterError::MissingField("meta"))?;

        let account_keys = Self::extract_account_keys(value, meta)?;
        let len = account_keys.len();

        Ok(Self {
            signature,
            slot: value["slot"].as_u64().unwrap_or(0),
            block_time: value["blockTime"].as_i64(),
            fee: meta["fee"].as_u64().unwrap_or(0),
            failed: !meta["err"].is_null(),
            pre_balances: Self::extract_lamports(&meta["preBalances"]),
            post_balances: Self::extract_lamports(&meta["postBalances"]),
            pre_token_balances: Self::extract_token_balances(&meta["preTokenBalances"], len)?,
            post_token_balances: Self::extract_token_balances(&meta["postTokenBalances"], len)?,
            account_keys,
        })
    }

    /// 第一个签名者即手续费支付者
    pub fn fee_payer(&self) -> Option<(usize, Pubkey)> {
        self.account_keys
            .iter()
            .enumerate()
            .find(|(_, key)| key.signer)
            .map(|(index, key)| (index, key.pubkey))
    }

    /// 前后代币余额中出现的全部 mint
    pub fn distinct_mints(&self) -> BTreeSet<Pubkey> {
        self.pre_token_balances
            .iter()
            .chain(self.post_token_balances.iter())
            .map(|balance| balance.mint)
            .collect()
    }

    /// 指定账户的 SOL 变化（post - pre）
    pub fn lamport_delta(&self, index: usize) -> Option<i128> {
        let pre = self.pre_balances.get(index)?;
        let post = self.post_balances.get(index)?;
        Some(i128::from(*post) - i128::from(*pre))
    }

    /// 提取账户密钥
    fn extract_account_keys(
        value: &Value,
        meta: &Value,
    ) -> Result<Vec<AccountKeyInfo>, AdapterError> {
        let message = &value["transaction"]["message"];
        let raw_keys = message["accountKeys"]
            .as_array()
            .ok_or(AdapterError::MissingField("transaction.message.accountKeys"))?;

        let header = &message["header"];
        let num_signers = header["numRequiredSignatures"].as_u64().unwrap_or(1) as usize;
        let readonly_signed = header["numReadonlySignedAccounts"].as_u64().unwrap_or(0) as usize;
        let readonly_unsigned = header["numReadonlyUnsignedAccounts"].as_u64().unwrap_or(0) as usize;
        let static_len = raw_keys.len();

        let mut keys = Vec::with_capacity(static_len);
        for (index, key_value) in raw_keys.iter().enumerate() {
            // jsonParsed: { pubkey, signer, writable, source }
            if let Some(key_str) = key_value["pubkey"].as_str() {
                keys.push(AccountKeyInfo {
                    pubkey: parse_pubkey(key_str)?,
                    signer: key_value["signer"].as_bool().unwrap_or(false),
                    writable: key_value["writable"].as_bool().unwrap_or(false),
                });
            }
            // json: 字符串数组，签名/可写属性由 header 推导
            else if let Some(key_str) = key_value.as_str() {
                let signer = index < num_signers;
                let writable = if signer {
                    index < num_signers.saturating_sub(readonly_signed)
                } else {
                    index < static_len.saturating_sub(readonly_unsigned)
                };
                keys.push(AccountKeyInfo { pubkey: parse_pubkey(key_str)?, signer, writable });
            } else {
                return Err(AdapterError::MissingField("accountKeys[].pubkey"));
            }
        }

        // json 编码的 v0 交易：查找表账户位于 meta.loadedAddresses
        let parsed_format = raw_keys.first().is_some_and(|k| k.is_object());
        if !parsed_format {
            for (field, writable) in [("writable", true), ("readonly", false)] {
                if let Some(loaded) = meta["loadedAddresses"][field].as_array() {
                    for key_value in loaded {
                        let key_str =
                            key_value.as_str().ok_or(AdapterError::MissingField("loadedAddresses"))?;
                        keys.push(AccountKeyInfo {
                            pubkey: parse_pubkey(key_str)?,
                            signer: false,
                            writable,
                        });
                    }
                }
            }
        }

        Ok(keys)
    }

    fn extract_lamports(value: &Value) -> Vec<u64> {
        value
            .as_array()
            .map(|balances| balances.iter().map(|b| b.as_u64().unwrap_or(0)).collect())
            .unwrap_or_default()
    }

    /// 提取代币余额
    fn extract_token_balances(
        value: &Value,
        account_count: usize,
    ) -> Result<Vec<TokenBalance>, AdapterError> {
        let Some(entries) = value.as_array() else {
            return Ok(Vec::new());
        };

        let mut balances = Vec::with_capacity(entries.len());
        for entry in entries {
            let account_index = entry["accountIndex"]
                .as_u64()
                .ok_or(AdapterError::MissingField("tokenBalances[].accountIndex"))?
                as usize;
            if account_index >= account_count {
                return Err(AdapterError::IndexOutOfRange { index: account_index, len: account_count });
            }

            let mint = parse_pubkey(
                entry["mint"].as_str().ok_or(AdapterError::MissingField("tokenBalances[].mint"))?,
            )?;
            let owner = entry["owner"].as_str().map(parse_pubkey).transpose()?;

            let ui_amount = &entry["uiTokenAmount"];
            let amount_str = ui_amount["amount"]
                .as_str()
                .ok_or(AdapterError::MissingField("uiTokenAmount.amount"))?;
            let amount = amount_str
                .parse::<u64>()
                .map_err(|e| AdapterError::AmountParseError(format!("{amount_str}: {e}")))?;
            let decimals = ui_amount["decimals"]
                .as_u64()
                .ok_or(AdapterError::MissingField("uiTokenAmount.decimals"))?
                as u8;

            balances.push(TokenBalance { account_index, mint, owner, amount, decimals });
        }
        Ok(balances)
    }
}

fn parse_pubkey(value: &str) -> Result<Pubkey, AdapterError> {
    Pubkey::from_str(value).map_err(|e| AdapterError::PubkeyParseError(format!("{value}: {e}")))
}
