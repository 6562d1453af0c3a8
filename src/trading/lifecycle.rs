//! 交易状态回调模块
//!
//! 在签名、提交、重试、确认等关键节点通知上游应用

use anyhow::Result;
use futures::future::BoxFuture;
use solana_sdk::signature::Signature;
use std::{fmt, sync::Arc};

/// 状态更新事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// 等待钱包签名
    Signing,
    /// 正在提交（从 1 开始计数）
    Submitting { attempt: usize },
    /// 瞬时错误，使用新的 blockhash 重试
    Retrying { reason: String },
    /// 预检模拟失败，附带程序日志
    SimulationFailed { message: String, logs: Vec<String> },
    /// 已被 RPC 接受
    Submitted { signature: Signature },
    Confirmed { signature: Signature },
    Failed { signature: Signature, reason: String },
    /// 轮询结束仍未得到结论
    Inconclusive { signature: Signature },
    /// 独立手续费交易的结果（失败不影响主交易）
    CommissionSettled { signature: Option<Signature>, error: Option<String> },
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signing => write!(f, "Signing transaction..."),
            Self::Submitting { attempt } => write!(f, "Sending transaction (attempt {attempt})..."),
            Self::Retrying { reason } => write!(f, "Retrying with a fresh blockhash: {reason}"),
            Self::SimulationFailed { message, logs } => {
                write!(f, "Simulation failed: {message}")?;
                for line in logs {
                    write!(f, "\n  {line}")?;
                }
                Ok(())
            }
            Self::Submitted { signature } => write!(f, "Transaction sent: {signature}"),
            Self::Confirmed { signature } => write!(f, "Transaction confirmed: {signature}"),
            Self::Failed { signature, reason } => {
                write!(f, "Transaction {signature} failed: {reason}")
            }
            Self::Inconclusive { signature } => {
                write!(f, "Transaction {signature} sent, confirmation pending")
            }
            Self::CommissionSettled { signature: Some(signature), .. } => {
                write!(f, "Commission transferred: {signature}")
            }
            Self::CommissionSettled { error, .. } => write!(
                f,
                "Commission transfer skipped: {}",
                error.as_deref().unwrap_or("no fee transaction")
            ),
        }
    }
}

/// 交易状态回调 Trait
///
/// # 返回
/// * `Err(e)` - 回调失败**不会**影响交易（仅记录日志）
pub trait TransactionStatusCallback: Send + Sync {
    fn on_status(&self, update: StatusUpdate) -> BoxFuture<'static, Result<()>>;
}

/// 空回调实现（默认实现，不做任何操作）
#[derive(Clone)]
pub struct NoopCallback;

impl TransactionStatusCallback for NoopCallback {
    fn on_status(&self, _update: StatusUpdate) -> BoxFuture<'static, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// 同步闭包适配器，适合只需要展示状态文本的调用方
pub struct FnCallback<F>(pub F);

impl<F> TransactionStatusCallback for FnCallback<F>
where
    F: Fn(StatusUpdate) + Send + Sync,
{
    fn on_status(&self, update: StatusUpdate) -> BoxFuture<'static, Result<()>> {
        (self.0)(update);
        Box::pin(async { Ok(()) })
    }
}

/// Arc 包装的回调（便于共享）
pub type CallbackRef = Arc<dyn TransactionStatusCallback>;
