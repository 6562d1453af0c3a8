//! 兑换还原测试（内存账本）

use serde_json::json;
use sol_swap_engine::common::ledger::SignatureInfo;
use sol_swap_engine::constants::SOL_MINT;
use sol_swap_engine::parser::{ReconstructionConfig, SwapReconstructor, reconstruct_swap};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

mod common;
use common::{FakeLedger, ledger_record, token_balance};

const THRESHOLD: u64 = 1_000_000;

fn reconstructor(ledger: Arc<FakeLedger>, batch_size: usize) -> SwapReconstructor {
    SwapReconstructor::new(
        ledger,
        ReconstructionConfig { signature_limit: 30, batch_size, native_threshold: THRESHOLD },
    )
}

#[test]
fn test_token_to_token_swap() {
    let owner = Pubkey::new_unique();
    let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
    let record = ledger_record(
        "sig-a",
        &owner,
        1_700_000_100,
        (50_000_000, 49_995_000),
        5_000,
        vec![token_balance(1, &a, &owner, 100, 6)],
        vec![token_balance(1, &a, &owner, 40, 6), token_balance(2, &b, &owner, 50, 9)],
    );

    let swap = reconstruct_swap(&record, THRESHOLD).unwrap().expect("swap");
    assert_eq!(swap.signature, "sig-a");
    assert_eq!((swap.input_token.mint, swap.input_token.raw_amount), (a, 60));
    assert_eq!((swap.output_token.mint, swap.output_token.raw_amount), (b, 50));
    assert_eq!(swap.input_token.decimals, 6);
    assert_eq!(swap.output_token.decimals, 9);
    assert_eq!(swap.fee, 5_000);
    assert_eq!(swap.timestamp, 1_700_000_100);
    assert!(swap.success);
}

#[test]
fn test_single_mint_is_not_a_swap() {
    let owner = Pubkey::new_unique();
    let a = Pubkey::new_unique();
    let record = ledger_record(
        "sig-transfer",
        &owner,
        1,
        (10_000_000, 9_995_000),
        5_000,
        vec![token_balance(1, &a, &owner, 100, 6)],
        vec![token_balance(1, &a, &owner, 40, 6)],
    );
    assert!(reconstruct_swap(&record, THRESHOLD).unwrap().is_none());
}

#[test]
fn test_native_spend_beats_token_input() {
    // 包装 SOL 后立即兑换：wSOL 账户在同一笔交易内创建并关闭
    let owner = Pubkey::new_unique();
    let token = Pubkey::new_unique();
    let record = ledger_record(
        "sig-wrap",
        &owner,
        1,
        (2_000_000_000, 1_000_000_000),
        5_000,
        vec![token_balance(1, &SOL_MINT, &owner, 10, 9)],
        vec![token_balance(1, &SOL_MINT, &owner, 0, 9), token_balance(2, &token, &owner, 123_456, 6)],
    );

    let swap = reconstruct_swap(&record, THRESHOLD).unwrap().expect("swap");
    assert_eq!(swap.input_token.mint, SOL_MINT);
    assert_eq!(swap.input_token.raw_amount, 999_995_000);
    assert_eq!(swap.input_token.decimals, 9);
    assert_eq!((swap.output_token.mint, swap.output_token.raw_amount), (token, 123_456));
}

#[test]
fn test_immaterial_native_change_is_ignored() {
    let owner = Pubkey::new_unique();
    let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
    let record = ledger_record(
        "sig-rent",
        &owner,
        1,
        (10_000_000, 9_000_000),
        5_000,
        vec![token_balance(1, &a, &owner, 100, 6)],
        vec![token_balance(1, &a, &owner, 40, 6), token_balance(2, &b, &owner, 50, 6)],
    );
    // 995_000 的额外支出低于阈值，输入仍是代币 A
    let swap = reconstruct_swap(&record, THRESHOLD).unwrap().unwrap();
    assert_eq!(swap.input_token.mint, a);
}

#[test]
fn test_multi_hop_counts_intermediate_mints() {
    let owner = Pubkey::new_unique();
    let router = Pubkey::new_unique();
    let (a, mid, b) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
    let record = ledger_record(
        "sig-route",
        &owner,
        1,
        (10_000_000, 9_995_000),
        5_000,
        vec![token_balance(1, &a, &owner, 500, 6), token_balance(3, &mid, &router, 1_000, 6)],
        vec![
            token_balance(1, &a, &owner, 0, 6),
            token_balance(2, &b, &owner, 70, 6),
            token_balance(3, &mid, &router, 1_000, 6),
        ],
    );

    let swap = reconstruct_swap(&record, THRESHOLD).unwrap().unwrap();
    assert_eq!(swap.hop_count, 2);
    assert!(swap.is_multi_hop);
    assert_eq!(swap.output_token.mint, b);
}

#[test]
fn test_one_sided_change_is_discarded() {
    let owner = Pubkey::new_unique();
    let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
    let record = ledger_record(
        "sig-burn",
        &owner,
        1,
        (10_000_000, 9_995_000),
        5_000,
        vec![token_balance(1, &a, &owner, 100, 6), token_balance(2, &b, &owner, 5, 6)],
        vec![token_balance(1, &a, &owner, 0, 6), token_balance(2, &b, &owner, 5, 6)],
    );
    assert!(reconstruct_swap(&record, THRESHOLD).unwrap().is_none());
}

#[test]
fn test_malformed_record_is_a_parse_failure() {
    let record = json!({ "transaction": { "signatures": ["sig-bad"] }, "meta": { "fee": 1 } });
    let err = reconstruct_swap(&record, THRESHOLD).unwrap_err();
    assert!(err.to_string().contains("sig-bad"));
}

#[tokio::test]
async fn test_history_is_sorted_and_skips_bad_records() {
    let ledger = FakeLedger::new();
    let owner = Pubkey::new_unique();
    let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
    let swap_record = |signature: &str, time: i64| {
        ledger_record(
            signature,
            &owner,
            time,
            (10_000_000, 9_995_000),
            5_000,
            vec![token_balance(1, &a, &owner, 100, 6)],
            vec![token_balance(1, &a, &owner, 40, 6), token_balance(2, &b, &owner, 50, 6)],
        )
    };

    ledger.with_transaction("old", Some(100), swap_record("old", 100));
    ledger.with_transaction("new", Some(300), swap_record("new", 300));
    ledger.with_transaction("middle", Some(200), swap_record("middle", 200));
    ledger.with_transaction("garbage", Some(250), json!({ "transaction": {}, "meta": null }));
    ledger.with_transaction("flaky", Some(260), swap_record("flaky", 260));
    ledger.broken.lock().insert("flaky".to_string());
    let mut errored = swap_record("errored", 400);
    errored["meta"]["err"] = json!({ "InstructionError": [2, { "Custom": 6001 }] });
    ledger.with_transaction("errored", Some(400), errored);
    ledger.signatures.lock().push(SignatureInfo {
        signature: "listed-failed".to_string(),
        failed: true,
        block_time: Some(500),
    });

    let swaps = reconstructor(ledger.clone(), 2).recent_swaps(&owner).await.unwrap();

    let order: Vec<&str> = swaps.iter().map(|s| s.signature.as_str()).collect();
    assert_eq!(order, vec!["new", "middle", "old"]);
}

#[tokio::test]
async fn test_signature_limit_is_respected() {
    let ledger = FakeLedger::new();
    let owner = Pubkey::new_unique();
    let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
    for i in 0..10 {
        let signature = format!("sig-{i}");
        let record = ledger_record(
            &signature,
            &owner,
            i,
            (10_000_000, 9_995_000),
            5_000,
            vec![token_balance(1, &a, &owner, 100, 6)],
            vec![token_balance(1, &a, &owner, 40, 6), token_balance(2, &b, &owner, 50, 6)],
        );
        ledger.with_transaction(&signature, Some(i), record);
    }

    let reconstructor = SwapReconstructor::new(
        ledger,
        ReconstructionConfig { signature_limit: 4, batch_size: 3, native_threshold: THRESHOLD },
    );
    let swaps = reconstructor.recent_swaps(&owner).await.unwrap();
    assert_eq!(swaps.len(), 4);
}

#[tokio::test]
async fn test_missing_block_time_falls_back_to_signature_listing() {
    let ledger = FakeLedger::new();
    let owner = Pubkey::new_unique();
    let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
    let mut record = ledger_record(
        "sig-untimed",
        &owner,
        0,
        (10_000_000, 9_995_000),
        5_000,
        vec![token_balance(1, &a, &owner, 100, 6)],
        vec![token_balance(1, &a, &owner, 40, 6), token_balance(2, &b, &owner, 50, 6)],
    );
    record.as_object_mut().unwrap().remove("blockTime");
    ledger.with_transaction("sig-untimed", Some(1_700_000_777), record);

    let swaps = reconstructor(ledger, 5).recent_swaps(&owner).await.unwrap();
    assert_eq!(swaps.len(), 1);
    assert_eq!(swaps[0].timestamp, 1_700_000_777);
}
