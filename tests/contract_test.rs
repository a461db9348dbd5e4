use aptos_agent::contract::{
    self, module_abi, resource_type, Signer, StorageFunction, ValueStore, MEANING_OF_VIEW,
};
use aptos_agent::ledger::{AccountAddress, FunctionKind, LocalAccount};

#[test]
fn test_get_without_store_is_zero() {
    let store = ValueStore::new();
    let nobody = AccountAddress::from_u8(0x42);
    assert_eq!(store.get(&nobody), 0);
    assert!(!store.exists(&nobody));
    assert!(store.is_empty());
}

#[test]
fn test_store_creates_then_overwrites() {
    let owner = LocalAccount::generate();
    let signer = Signer::from_account(&owner);
    let mut store = ValueStore::new();

    store.store(&signer, 5);
    assert_eq!(store.get(&owner.address()), 5);
    assert!(store.exists(&owner.address()));

    store.store(&signer, 9);
    assert_eq!(store.get(&owner.address()), 9);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_store_only_touches_the_signer() {
    let alice = LocalAccount::generate();
    let bob = LocalAccount::generate();
    let mut store = ValueStore::new();

    store.store(&Signer::from_account(&alice), 1);
    store.store(&Signer::from_account(&bob), 2);

    assert_eq!(store.get(&alice.address()), 1);
    assert_eq!(store.get(&bob.address()), 2);
}

#[test]
fn test_meaning_of_view_is_constant() {
    assert_eq!(ValueStore::meaning_of_view(), 42);
    assert_eq!(MEANING_OF_VIEW, 42);
}

#[test]
fn test_resource_shape() {
    let module = AccountAddress::from_hex("0xcafe").unwrap();
    let owner = LocalAccount::generate();
    let mut store = ValueStore::new();
    assert!(store.resource(&module, &owner.address()).is_none());

    store.store(&Signer::from_account(&owner), 77);
    let resource = store.resource(&module, &owner.address()).unwrap();
    assert_eq!(resource.resource_type, resource_type(&module));
    assert!(resource.resource_type.ends_with("::storage::Storage"));
    assert_eq!(resource.data["value"], "77");
}

#[test]
fn test_functions_are_classified() {
    assert_eq!(StorageFunction::Store.kind(), FunctionKind::Entry);
    assert_eq!(StorageFunction::Get.kind(), FunctionKind::View);
    assert_eq!(StorageFunction::MeaningOfView.kind(), FunctionKind::View);
    assert_eq!(StorageFunction::from_name("meaning_of_view"), Some(StorageFunction::MeaningOfView));
    assert_eq!(StorageFunction::from_name("remove"), None);

    let abi = module_abi(&AccountAddress::from_hex("0xcafe").unwrap());
    assert_eq!(abi.name, contract::MODULE_NAME);
    assert_eq!(abi.exposed_functions.len(), 3);

    let store_fn = abi.exposed_functions.iter().find(|f| f.name == "store").unwrap();
    assert!(store_fn.is_entry && !store_fn.is_view);
    assert_eq!(store_fn.params, vec!["&signer", "u64"]);
    assert_eq!(store_fn.kind(), Some(FunctionKind::Entry));

    let get_fn = abi.exposed_functions.iter().find(|f| f.name == "get").unwrap();
    assert_eq!(get_fn.kind(), Some(FunctionKind::View));
    assert_eq!(get_fn.returns, vec!["u64"]);
}
