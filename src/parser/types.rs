//! 交易解析器的核心数据类型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// 代币数量（最小单位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    /// 代币地址
    pub mint: Pubkey,
    /// 精度（小数位数）
    pub decimals: u8,
    /// 原始数量（未处理精度）
    pub raw_amount: u64,
}

impl TokenAmount {
    pub fn new(mint: Pubkey, decimals: u8, raw_amount: u64) -> Self {
        Self { mint, decimals, raw_amount }
    }

    /// UI 格式数量（考虑了精度）
    pub fn ui_amount(&self) -> f64 {
        self.raw_amount as f64 / 10_f64.powi(i32::from(self.decimals))
    }
}

/// 从账本记录中还原出的一笔兑换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransactionRecord {
    /// 交易签名
    pub signature: String,
    /// 区块时间（Unix 秒）
    pub timestamp: i64,
    /// 输入代币
    pub input_token: TokenAmount,
    /// 输出代币
    pub output_token: TokenAmount,
    pub success: bool,
    /// 网络手续费（lamports）
    pub fee: u64,
    pub is_multi_hop: bool,
    /// 路由跳数，至少为 1
    pub hop_count: u32,
}

impl SwapTransactionRecord {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.timestamp, 0)
    }
}

/// 代币展示信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub mint: Pubkey,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
}

/// 附带元数据的兑换记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedSwap {
    pub record: SwapTransactionRecord,
    pub input_metadata: TokenMetadata,
    pub output_metadata: TokenMetadata,
}
