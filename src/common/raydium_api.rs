use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use std::{env, time::Duration};
use tracing::{debug, warn};

use crate::constants::trade::trade::DEFAULT_PRIORITY_FEE;

/// Raydium API 客户端配置
#[derive(Debug, Clone)]
pub struct RaydiumApiConfig {
    /// v3 API 地址，例如 `https://api-v3.raydium.io`（mint 查询、优先费）
    pub base_host: String,
    /// 交易 API 地址，例如 `https://transaction-v1.raydium.io`（报价、构建交易）
    pub swap_host: String,
    /// 请求超时时间（毫秒）
    pub timeout_millis: u64,
}

impl Default for RaydiumApiConfig {
    fn default() -> Self {
        Self {
            base_host: "https://api-v3.raydium.io".to_string(),
            swap_host: "https://transaction-v1.raydium.io".to_string(),
            timeout_millis: 10_000,
        }
    }
}

/// Message format requested from the trade API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxVersion {
    Legacy,
    #[default]
    V0,
}

impl TxVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "LEGACY",
            Self::V0 => "V0",
        }
    }
}

/// A priced AMM route, plus the raw compute response the build endpoint expects back.
#[derive(Debug, Clone, PartialEq)]
pub struct AmmQuote {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub input_amount: u64,
    pub output_amount: u64,
    /// Minimum output after slippage, as computed by the venue
    pub other_amount_threshold: u64,
    pub slippage_bps: u16,
    pub price_impact_bps: u32,
    /// Pool ids along the route
    pub route: Vec<String>,
    pub raw: Value,
}

/// Parameters for `POST /transaction/swap-base-in`.
#[derive(Debug, Clone)]
pub struct AmmSwapBuild {
    pub quote: AmmQuote,
    pub wallet: Pubkey,
    pub tx_version: TxVersion,
    /// Compute unit price in micro-lamports
    pub compute_unit_price: String,
    pub wrap_sol: bool,
    pub unwrap_sol: bool,
    pub input_account: Option<Pubkey>,
    pub output_account: Option<Pubkey>,
}

/// The AMM venue as seen by quoting and assembly.
#[async_trait]
pub trait AmmVenue: Send + Sync {
    /// Whether the venue's registry knows `mint`.
    async fn is_listed(&self, mint: &Pubkey) -> Result<bool>;

    /// `None` when the venue has no route for the pair.
    async fn quote_exact_in(
        &self,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Option<AmmQuote>>;

    /// Suggested compute unit price; never fails.
    async fn priority_fee(&self) -> String;

    /// Serialized (base64) transactions for the swap, in venue order.
    async fn build_swap_transactions(&self, request: &AmmSwapBuild) -> Result<Vec<String>>;
}

/// 构建共享的 HTTP 客户端，自动读取代理环境变量
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client> {
    let mut builder = Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_nodelay(true)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5));

    // 优先使用 HTTPS_PROXY，其次 HTTP_PROXY
    if let Ok(https_proxy) = env::var("HTTPS_PROXY").or_else(|_| env::var("https_proxy")) {
        builder = builder.proxy(Proxy::https(&https_proxy)?);
    } else if let Ok(http_proxy) = env::var("HTTP_PROXY").or_else(|_| env::var("http_proxy")) {
        builder = builder.proxy(Proxy::http(&http_proxy)?);
    }

    Ok(builder.build()?)
}

/// Raydium HTTP API 客户端（报价与交易构建）
#[derive(Clone)]
pub struct RaydiumApiClient {
    http: Client,
    pub config: RaydiumApiConfig,
}

impl RaydiumApiClient {
    /// 使用给定配置创建新的 Raydium API 客户端
    pub fn new(config: RaydiumApiConfig) -> Result<Self> {
        let http = build_http_client(Duration::from_millis(config.timeout_millis))?;
        Ok(Self { http, config })
    }

    #[inline]
    fn endpoint(host: &str, path: &str) -> String {
        format!("{}/{}", host.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// `/mint/ids?mints=` → 每个 mint 对应一个条目，未收录时为 null
    pub async fn fetch_mints_by_ids(&self, mints: &[Pubkey]) -> Result<Vec<Option<Value>>> {
        if mints.is_empty() {
            return Ok(Vec::new());
        }
        let ids = mints.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        let url = Self::endpoint(&self.config.base_host, "/mint/ids");
        let resp = self
            .http
            .get(url)
            .query(&[("mints", ids)])
            .send()
            .await?
            .error_for_status()?;

        let api_resp = resp.json::<ApiResponse<Vec<Option<Value>>>>().await?;
        api_resp.into_data()
    }

    /// `/main/auto-fee` → 各档位的优先费（micro-lamports）
    pub async fn get_auto_fee(&self) -> Result<AutoFeeTiers> {
        let url = Self::endpoint(&self.config.base_host, "/main/auto-fee");
        let resp = self.http.get(url).send().await?.error_for_status()?;
        let api_resp = resp.json::<ApiResponse<AutoFeeData>>().await?;
        Ok(api_resp.into_data()?.default)
    }

    /// `/compute/swap-base-in` 原始响应
    pub async fn compute_swap_base_in(
        &self,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
        slippage_bps: u16,
        tx_version: TxVersion,
    ) -> Result<Value> {
        let url = Self::endpoint(&self.config.swap_host, "/compute/swap-base-in");
        let resp = self
            .http
            .get(url)
            .query(&[
                ("inputMint", input_mint.to_string()),
                ("outputMint", output_mint.to_string()),
                ("amount", amount.to_string()),
                ("slippageBps", slippage_bps.to_string()),
                ("txVersion", tx_version.as_str().to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<Value>().await?)
    }

    /// `/transaction/swap-base-in`
    pub async fn transaction_swap_base_in(&self, request: &AmmSwapBuild) -> Result<Vec<String>> {
        let body = SwapTransactionRequest {
            compute_unit_price_micro_lamports: request.compute_unit_price.clone(),
            swap_response: request.quote.raw.clone(),
            tx_version: request.tx_version.as_str().to_string(),
            wallet: request.wallet.to_string(),
            wrap_sol: request.wrap_sol,
            unwrap_sol: request.unwrap_sol,
            input_account: request.input_account.map(|a| a.to_string()),
            output_account: request.output_account.map(|a| a.to_string()),
        };
        let url = Self::endpoint(&self.config.swap_host, "/transaction/swap-base-in");
        let resp = self.http.post(url).json(&body).send().await?.error_for_status()?;
        let api_resp = resp.json::<ApiResponse<Vec<SwapTransactionPayload>>>().await?;
        let payloads = api_resp.into_data()?;
        if payloads.is_empty() {
            return Err(anyhow!("raydium returned no transactions"));
        }
        Ok(payloads.into_iter().map(|p| p.transaction).collect())
    }
}

#[async_trait]
impl AmmVenue for RaydiumApiClient {
    async fn is_listed(&self, mint: &Pubkey) -> Result<bool> {
        let entries = self.fetch_mints_by_ids(std::slice::from_ref(mint)).await?;
        Ok(matches!(entries.first(), Some(Some(_))))
    }

    async fn quote_exact_in(
        &self,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Option<AmmQuote>> {
        let raw = self
            .compute_swap_base_in(input_mint, output_mint, amount, slippage_bps, TxVersion::V0)
            .await?;
        parse_compute_response(raw)
    }

    async fn priority_fee(&self) -> String {
        match self.get_auto_fee().await {
            Ok(tiers) => tiers.h.to_string(),
            Err(e) => {
                warn!(error = %e, "auto-fee unavailable, using default priority fee");
                DEFAULT_PRIORITY_FEE.to_string()
            }
        }
    }

    async fn build_swap_transactions(&self, request: &AmmSwapBuild) -> Result<Vec<String>> {
        self.transaction_swap_base_in(request).await
    }
}

/// Validates a compute response. `success: false` means the venue has no route.
pub fn parse_compute_response(raw: Value) -> Result<Option<AmmQuote>> {
    let api_resp: ApiResponse<SwapComputeData> = serde_json::from_value(raw.clone())?;
    if !api_resp.success {
        debug!(msg = ?api_resp.msg, "raydium has no route");
        return Ok(None);
    }
    let data = api_resp.into_data()?;
    let parse = |field: &str, value: &str| {
        value.parse::<u64>().map_err(|e| anyhow!("invalid {field} '{value}': {e}"))
    };
    Ok(Some(AmmQuote {
        input_mint: data.input_mint.parse()?,
        output_mint: data.output_mint.parse()?,
        input_amount: parse("inputAmount", &data.input_amount)?,
        output_amount: parse("outputAmount", &data.output_amount)?,
        other_amount_threshold: parse("otherAmountThreshold", &data.other_amount_threshold)?,
        slippage_bps: data.slippage_bps,
        price_impact_bps: (data.price_impact_pct.max(0.0) * 100.0).round() as u32,
        route: data.route_plan.into_iter().map(|r| r.pool_id).collect(),
        raw,
    }))
}

/// Raydium 通用响应包装：{ id, success, data }
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            return Err(anyhow!(
                "raydium request failed: {}",
                self.msg.unwrap_or_else(|| "unknown error".to_string())
            ));
        }
        self.data.ok_or_else(|| anyhow!("raydium response has no data"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoFeeData {
    pub default: AutoFeeTiers,
}

/// 优先费档位（micro-lamports）
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AutoFeeTiers {
    pub vh: u64,
    pub h: u64,
    pub m: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapComputeData {
    #[serde(default)]
    pub swap_type: Option<String>,
    pub input_mint: String,
    pub input_amount: String,
    pub output_mint: String,
    pub output_amount: String,
    pub other_amount_threshold: String,
    #[serde(default)]
    pub slippage_bps: u16,
    #[serde(default)]
    pub price_impact_pct: f64,
    #[serde(default)]
    pub route_plan: Vec<RoutePlanStep>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanStep {
    pub pool_id: String,
    #[serde(default)]
    pub input_mint: Option<String>,
    #[serde(default)]
    pub output_mint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapTransactionRequest {
    compute_unit_price_micro_lamports: String,
    swap_response: Value,
    tx_version: String,
    wallet: String,
    wrap_sol: bool,
    unwrap_sol: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_account: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SwapTransactionPayload {
    transaction: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_compute_response() {
        let input = Pubkey::new_unique();
        let output = Pubkey::new_unique();
        let raw = json!({
            "id": "abc",
            "success": true,
            "version": "V1",
            "data": {
                "swapType": "BaseIn",
                "inputMint": input.to_string(),
                "inputAmount": "1000000000",
                "outputMint": output.to_string(),
                "outputAmount": "200000000",
                "otherAmountThreshold": "198000000",
                "slippageBps": 100,
                "priceImpactPct": 0.37,
                "routePlan": [{ "poolId": "pool-1", "inputMint": input.to_string(), "outputMint": output.to_string() }]
            }
        });
        let quote = parse_compute_response(raw.clone()).unwrap().unwrap();
        assert_eq!(quote.output_amount, 200_000_000);
        assert_eq!(quote.other_amount_threshold, 198_000_000);
        assert_eq!(quote.price_impact_bps, 37);
        assert_eq!(quote.route, vec!["pool-1".to_string()]);
        assert_eq!(quote.raw, raw);
    }

    #[test]
    fn unsuccessful_compute_means_no_route() {
        let raw = json!({ "id": "x", "success": false, "msg": "ROUTE_NOT_FOUND" });
        assert!(parse_compute_response(raw).unwrap().is_none());
    }

    #[test]
    fn malformed_amounts_are_rejected() {
        let raw = json!({
            "success": true,
            "data": {
                "inputMint": Pubkey::new_unique().to_string(),
                "inputAmount": "1",
                "outputMint": Pubkey::new_unique().to_string(),
                "outputAmount": "-5",
                "otherAmountThreshold": "0"
            }
        });
        assert!(parse_compute_response(raw).is_err());
    }
}
