use serde_json::json;
use std::time::{Duration, Instant};

use aptos_agent::chain::{self, summarize_module, LAUNCHPAD_ADDRESS};
use aptos_agent::ledger::function::encode_entry_call;
use aptos_agent::AgentError;
use aptos_agent::ledger::{
    find_function, AccountAddress, AddressArg, ArgValue, Balance, FunctionCall, FunctionId,
    FunctionKind, FunctionRequest, InMemoryLedger, LedgerClient, LocalAccount, MoveFunction,
    MoveModule, TransactionRecord, TransactionStatus,
};

fn entry_fn(name: &str, params: &[&str], generics: usize) -> MoveFunction {
    MoveFunction {
        name: name.to_string(),
        visibility: "public".to_string(),
        is_entry: true,
        is_view: false,
        generic_type_params: vec![json!({ "constraints": [] }); generics],
        params: params.iter().map(|p| p.to_string()).collect(),
        returns: Vec::new(),
    }
}

#[test]
fn test_address_short_and_long_forms_agree() {
    let short = AccountAddress::from_hex("0x1").unwrap();
    let long = AccountAddress::from_hex(&format!("0x{}1", "0".repeat(63))).unwrap();
    assert_eq!(short, long);
    assert_eq!(short, AccountAddress::from_u8(1));
    assert_eq!(short.to_string(), format!("0x{}01", "0".repeat(62)));

    let bare: AccountAddress = "cafe".parse().unwrap();
    assert_eq!(bare, AccountAddress::from_hex("0xCAFE").unwrap());
}

#[test]
fn test_address_rejects_malformed_input() {
    assert!(AccountAddress::from_hex("").is_err());
    assert!(AccountAddress::from_hex("0x").is_err());
    assert!(AccountAddress::from_hex("0xnothex").is_err());
    assert!(AccountAddress::from_hex(&format!("0x{}", "1".repeat(65))).is_err());
    assert!(AccountAddress::from_hex("0xzz").unwrap_err().is_validation());
}

#[test]
fn test_address_arg_normalizes_text() {
    let arg: AddressArg = serde_json::from_value(json!("0xa")).unwrap();
    assert_eq!(arg.resolve().unwrap(), AccountAddress::from_u8(0xa));

    let text = AddressArg::from("  0x00b ");
    assert_eq!(text.resolve().unwrap(), AccountAddress::from_u8(0xb));

    assert!(AddressArg::from("not an address").resolve().is_err());
}

#[test]
fn test_launchpad_address_constant_matches_hex() {
    let parsed =
        AccountAddress::from_hex("0xe522476ab48374606d11cc8e7a360e229e37fd84fb533fcde63e091090c62149").unwrap();
    assert_eq!(parsed, LAUNCHPAD_ADDRESS);
}

#[test]
fn test_account_address_is_derived_from_key() {
    let account = LocalAccount::generate();
    let restored = LocalAccount::from_private_key_hex(&account.private_key_hex()).unwrap();
    assert_eq!(account.address(), restored.address());
    assert_eq!(account.public_key_hex(), restored.public_key_hex());
    assert_ne!(account.address(), LocalAccount::generate().address());

    assert!(LocalAccount::from_private_key_hex("0x1234").is_err());
    assert!(!format!("{:?}", account).contains(&account.private_key_hex()[2..]));
}

#[test]
fn test_balance_scale() {
    let balance = Balance::from_octas(150_000_000);
    assert_eq!(balance.apt(), 1.5);
    assert_eq!(balance.to_string(), "1.50000000 APT");
    assert_eq!(Balance::from_octas(0).to_string(), "0.00000000 APT");
}

#[test]
fn test_function_id_parsing() {
    let id: FunctionId = "0x1::coin::balance".parse().unwrap();
    assert_eq!(id.address, AccountAddress::from_u8(1));
    assert_eq!(id.module, "coin");
    assert_eq!(id.name, "balance");

    assert!("0x1::coin".parse::<FunctionId>().is_err());
    assert!("0x1::coin::balance::extra".parse::<FunctionId>().is_err());
    assert!("0x1::1coin::balance".parse::<FunctionId>().is_err());
    assert!("nothex::coin::balance".parse::<FunctionId>().is_err());
}

#[test]
fn test_function_request_kinds() {
    let call = FunctionCall::new("0xcafe::storage::get".parse().unwrap())
        .with_argument(ArgValue::Address(AccountAddress::from_u8(2)));

    let view = FunctionRequest::View(call.clone());
    let entry = FunctionRequest::Entry(call);
    assert_eq!(view.kind(), FunctionKind::View);
    assert!(!view.kind().is_mutating());
    assert!(entry.kind().is_mutating());

    let encoded = serde_json::to_value(&view).unwrap();
    assert_eq!(encoded["kind"], "view");
    let decoded: FunctionRequest = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded, view);
}

#[test]
fn test_arg_value_conversion_by_type() {
    assert_eq!(ArgValue::from_json("u64", &json!("12")).unwrap(), ArgValue::U64(12));
    assert_eq!(ArgValue::from_json("u64", &json!(12)).unwrap().to_json(), json!("12"));
    assert_eq!(ArgValue::from_json("u8", &json!(7)).unwrap().to_json(), json!(7));
    assert!(ArgValue::from_json("u8", &json!(300)).is_err());
    assert_eq!(ArgValue::from_json("bool", &json!("TRUE")).unwrap(), ArgValue::Bool(true));
    assert_eq!(
        ArgValue::from_json("vector<u64>", &json!([1, "2"])).unwrap(),
        ArgValue::VecU64(vec![1, 2])
    );
    assert_eq!(
        ArgValue::from_json("0x1::string::String", &json!("hello")).unwrap(),
        ArgValue::String("hello".to_string())
    );

    let not_list = ArgValue::from_json("vector<u64>", &json!(5)).unwrap_err();
    assert!(not_list.to_string().contains("Expected a list for `vector<u64>` but got number"));
    let unsupported = ArgValue::from_json("vector<address>", &json!([])).unwrap_err();
    assert!(unsupported.to_string().contains("Unsupported vector type `address`"));
}

#[test]
fn test_nested_vectors_are_rejected() {
    let nested = ArgValue::from_json("vector<vector<u64>>", &json!([[1]])).unwrap_err();
    assert!(nested.to_string().contains("Unsupported vector type `vector<u64>`"));

    let nested_bools = ArgValue::from_json("vector<vector<bool>>", &json!([[true]])).unwrap_err();
    assert!(nested_bools.to_string().contains("Unsupported vector type `vector<bool>`"));
}

#[test]
fn test_encode_entry_call_strips_signer_and_drops_extra_args() {
    let abi = entry_fn("transfer", &["&signer", "address", "u64"], 0);
    let id: FunctionId = "0x1::aptos_account::transfer".parse().unwrap();

    let call = encode_entry_call(id, &abi, Vec::new(), &[json!("0x2"), json!(10), json!("extra")]).unwrap();
    assert_eq!(
        call.arguments,
        vec![json!(AccountAddress::from_u8(2).to_string()), json!("10")]
    );
}

#[test]
fn test_encode_entry_call_rejects_views_and_missing_type_args() {
    let id: FunctionId = "0x1::coin::transfer".parse().unwrap();

    let generic = entry_fn("transfer", &["&signer", "address", "u64"], 1);
    let err = encode_entry_call(id.clone(), &generic, Vec::new(), &[]).unwrap_err();
    assert!(err.to_string().contains("Missing required type arguments for `"));

    let with_types = encode_entry_call(
        id.clone(),
        &generic,
        vec!["0x1::aptos_coin::AptosCoin".to_string()],
        &[json!("0x2"), json!("5")],
    )
    .unwrap();
    assert_eq!(with_types.type_arguments.len(), 1);

    let mut view = entry_fn("balance", &["address"], 0);
    view.is_entry = false;
    view.is_view = true;
    assert!(encode_entry_call(id, &view, Vec::new(), &[json!("0x2")]).is_err());
}

#[test]
fn test_transaction_record_from_rest_json() {
    let pending = TransactionRecord::from_json("0xabc", &json!({ "type": "pending_transaction", "hash": "0xabc" }));
    assert!(pending.status.is_pending());

    let failed = TransactionRecord::from_json(
        "0xdef",
        &json!({
            "type": "user_transaction",
            "hash": "0xdef",
            "success": false,
            "vm_status": "Move abort",
            "sender": "0x1",
            "sequence_number": "4",
            "gas_used": "12",
            "timestamp": "1700000000000000",
        }),
    );
    assert_eq!(
        failed.status,
        TransactionStatus::Failed {
            vm_status: "Move abort".to_string()
        }
    );
    assert_eq!(failed.sender, Some(AccountAddress::from_u8(1)));
    assert_eq!(failed.sequence_number, Some(4));
    assert_eq!(failed.gas_used, 12);

    let ok = TransactionRecord::from_json("0x1", &json!({ "type": "user_transaction", "success": true }));
    assert!(ok.status.is_success());
}

#[test]
fn test_summarize_module_truncates_large_fields() {
    let mut abi_fn = entry_fn("many", &["u64"; 8], 0);
    abi_fn.params = (0..8).map(|i| format!("u{}", i)).collect();
    let module = MoveModule {
        bytecode: "a".repeat(350),
        abi: Some(aptos_agent::ledger::ModuleAbi {
            address: "0x1".to_string(),
            name: "big".to_string(),
            friends: Vec::new(),
            exposed_functions: vec![abi_fn],
            structs: Vec::new(),
        }),
    };

    let summary = summarize_module(module);
    assert!(summary.bytecode.ends_with("...(truncated 50 chars)"));
    assert!(summary.bytecode.starts_with(&"a".repeat(300)));

    let params = &summary.abi.unwrap().exposed_functions[0].params;
    assert_eq!(params.len(), 6);
    assert_eq!(params[5], "...truncated");
}

#[tokio::test]
async fn test_memory_ledger_transfer_and_lookup() {
    let ledger = InMemoryLedger::default();
    let sender = LocalAccount::generate();
    let receiver = AccountAddress::from_u8(0xbb);

    let funded = ledger.fund_account(sender.address(), 1_000_000).await.unwrap();
    assert_eq!(funded.len(), 1);
    assert!(ledger.transaction_by_hash(&funded[0]).await.unwrap().status.is_success());

    let hash = chain::transfer(&ledger, &sender, &AddressArg::from(receiver), 400).await.unwrap();
    let record = ledger.transaction_by_hash(&hash).await.unwrap();
    assert!(record.status.is_success());
    assert_eq!(record.sender, Some(sender.address()));
    assert_eq!(record.sequence_number, Some(0));

    assert_eq!(ledger.account_balance(receiver).await.unwrap(), 400);
    assert_eq!(ledger.account_balance(sender.address()).await.unwrap(), 1_000_000 - 400 - 1000);
}

#[tokio::test]
async fn test_memory_ledger_failed_and_rejected_transactions() {
    let ledger = InMemoryLedger::default();
    let sender = LocalAccount::generate();

    let unknown = chain::transfer(&ledger, &sender, &AddressArg::from("0x2"), 1).await.unwrap_err();
    assert!(unknown.to_string().contains("SENDING_ACCOUNT_DOES_NOT_EXIST"));

    ledger.fund_account(sender.address(), 5_000).await.unwrap();
    let hash = chain::transfer(&ledger, &sender, &AddressArg::from("0x2"), 1_000_000).await.unwrap();
    let record = chain::get_transaction(&ledger, &hash).await.unwrap();
    match record.status {
        TransactionStatus::Failed { vm_status } => assert!(vm_status.contains("EINSUFFICIENT_BALANCE")),
        other => panic!("expected failure, got {:?}", other),
    }

    let missing = FunctionCall::new("0x1::nothing::here".parse().unwrap());
    let hash = ledger.submit_transaction(&sender, &missing).await.unwrap();
    let record = ledger.transaction_by_hash(&hash).await.unwrap();
    assert_eq!(
        record.status,
        TransactionStatus::Failed {
            vm_status: "LINKER_ERROR".to_string()
        }
    );
}

#[test]
fn test_memory_ledger_modules_respect_limit() {
    let ledger = InMemoryLedger::default();
    let framework = tokio_test::block_on(ledger.account_modules(AccountAddress::from_u8(1), 10)).unwrap();
    assert_eq!(framework.len(), 2);
    assert_eq!(tokio_test::block_on(ledger.account_modules(AccountAddress::from_u8(1), 1)).unwrap().len(), 1);
    assert!(tokio_test::block_on(ledger.account_modules(AccountAddress::from_u8(9), 10)).unwrap().is_empty());

    let id: FunctionId = "0x1::aptos_account::transfer".parse().unwrap();
    assert!(find_function(&framework, &id).is_some());
    let missing: FunctionId = "0x1::aptos_account::nope".parse().unwrap();
    assert!(find_function(&framework, &missing).is_none());
}

#[tokio::test]
async fn test_wait_reports_checks_actually_made() {
    let ledger = InMemoryLedger::default();
    let wait = chain::WaitOptions {
        poll_interval: Duration::from_millis(1),
        max_attempts: 0,
    };

    let err = chain::wait_for_transaction(&ledger, "0xunknown", wait).await.unwrap_err();
    assert!(err.to_string().contains("still pending after 1 checks"));
    assert_eq!(ledger.request_count(), 1);

    let wait = chain::WaitOptions {
        poll_interval: Duration::from_millis(1),
        max_attempts: 3,
    };
    let err = chain::wait_for_transaction(&ledger, "0xunknown", wait).await.unwrap_err();
    assert!(err.to_string().contains("still pending after 3 checks"));
    assert_eq!(ledger.request_count(), 4);
}

#[tokio::test]
async fn test_wait_does_not_sleep_after_last_check() {
    let ledger = InMemoryLedger::default();
    let wait = chain::WaitOptions {
        poll_interval: Duration::from_secs(10),
        max_attempts: 1,
    };

    let started = Instant::now();
    let err = chain::wait_for_transaction(&ledger, "0xunknown", wait).await.unwrap_err();
    assert!(matches!(err, AgentError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
}
