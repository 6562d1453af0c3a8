//! 环境变量配置测试
//!
//! 修改进程环境变量，必须串行执行

use serial_test::serial;
use sol_swap_engine::{EngineConfig, FeeSpec, SwapError};
use solana_sdk::pubkey::Pubkey;
use std::{env, io::Write};

const VARS: [&str; 6] = [
    "RPC_URL",
    "COMMISSION_WALLET",
    "COMMISSION_BPS",
    "RAYDIUM_API_HOST",
    "RAYDIUM_SWAP_HOST",
    "TOKEN_METADATA_HOST",
];

fn clear_env() {
    for var in VARS {
        // SAFETY: 所有修改环境变量的测试都由 #[serial] 串行化
        unsafe { env::remove_var(var) };
    }
}

/// 写入临时 .env 文件并加载（覆盖已有值）
fn load_env(contents: &str) {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    dotenvy::from_path_override(file.path()).unwrap();
}

#[test]
#[serial]
fn test_full_environment_is_parsed() {
    let wallet = Pubkey::new_unique();
    load_env(&format!(
        "RPC_URL=http://rpc.local:8899\n\
         COMMISSION_WALLET={wallet}\n\
         COMMISSION_BPS=75\n\
         RAYDIUM_API_HOST=http://raydium.local\n\
         RAYDIUM_SWAP_HOST=http://swap.local\n\
         TOKEN_METADATA_HOST=http://tokens.local\n"
    ));

    let config = EngineConfig::from_env().unwrap();
    assert_eq!(config.rpc_url, "http://rpc.local:8899");
    assert!(config.fee.is_enabled());
    assert_eq!(config.fee.percentage_bps(), 75);
    assert_eq!(*config.fee.recipient(), wallet);
    assert_eq!(config.raydium_api_host, "http://raydium.local");
    assert_eq!(config.raydium_swap_host, "http://swap.local");
    assert_eq!(config.metadata_host, "http://tokens.local");
    clear_env();
}

#[test]
#[serial]
fn test_commission_defaults_to_half_percent() {
    let wallet = Pubkey::new_unique();
    load_env(&format!("RPC_URL=http://rpc.local\nCOMMISSION_WALLET={wallet}\n"));

    let config = EngineConfig::from_env().unwrap();
    assert_eq!(config.fee.percentage_bps(), 50);
    clear_env();
}

#[test]
#[serial]
fn test_no_commission_wallet_disables_fee() {
    load_env("RPC_URL=http://rpc.local\nCOMMISSION_BPS=80\n");

    let config = EngineConfig::from_env().unwrap();
    assert!(!config.fee.is_enabled());
    assert_eq!(config.raydium_api_host, "https://api-v3.raydium.io");
    clear_env();
}

#[test]
#[serial]
fn test_invalid_values_are_config_errors() {
    load_env("RPC_URL=http://rpc.local\nCOMMISSION_WALLET=not-a-key\n");
    assert!(matches!(EngineConfig::from_env(), Err(SwapError::Config(_))));

    let wallet = Pubkey::new_unique();
    load_env(&format!("RPC_URL=http://rpc.local\nCOMMISSION_WALLET={wallet}\nCOMMISSION_BPS=half\n"));
    assert!(matches!(EngineConfig::from_env(), Err(SwapError::Config(_))));

    load_env(&format!("RPC_URL=http://rpc.local\nCOMMISSION_WALLET={wallet}\nCOMMISSION_BPS=10001\n"));
    assert!(matches!(EngineConfig::from_env(), Err(SwapError::InvalidInput(_))));
    clear_env();
}

#[test]
#[serial]
fn test_missing_rpc_url_is_rejected() {
    clear_env();
    let err = EngineConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("RPC_URL"));
}

#[test]
fn test_fee_spec_bounds() {
    let recipient = Pubkey::new_unique();
    assert!(FeeSpec::new(10_000, recipient).is_ok());
    assert!(FeeSpec::new(10_001, recipient).is_err());
    assert!(!FeeSpec::new(0, recipient).unwrap().is_enabled());
    assert!(!FeeSpec::new(50, Pubkey::default()).unwrap().is_enabled());
    assert!(!FeeSpec::disabled().is_enabled());
}
