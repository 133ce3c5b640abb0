#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;

use kvtree::{
    primitives::pager::{MemPageStore, MemStoreOptions, PageStore},
    storage::btree::{BTree, BTreeOptions, NodeRead, MAX_KEY_SIZE, MAX_VAL_SIZE, PAGE_SIZE},
    types::Result,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn key_for(i: u32) -> Vec<u8> {
    format!("user:{i:08}").into_bytes()
}

#[test]
fn tree_behind_trait_object_grows_and_reads_back() -> Result<()> {
    let store_arc = Arc::new(MemPageStore::new(MemStoreOptions {
        retain_released: false,
        max_pages: None,
    }));
    let store: Arc<dyn PageStore> = store_arc.clone();
    let mut tree = BTree::new(BTreeOptions::default());

    let mut order: Vec<u32> = (0..5_000).collect();
    order.shuffle(&mut ChaCha8Rng::seed_from_u64(0xC0FFEE));
    for i in &order {
        tree.insert(&store, &key_for(*i), format!("value-{i}").as_bytes())?;
    }

    let report = tree.verify(&store)?;
    assert_eq!(report.entries, 5_000);
    assert!(report.depth >= 2, "5000 entries need more than one level");
    assert_eq!(store_arc.live_pages(), report.nodes);

    for i in (0..5_000).step_by(97) {
        let found = tree.get(&store, &key_for(i))?;
        assert_eq!(found.as_deref(), Some(format!("value-{i}").as_bytes()));
    }
    assert_eq!(tree.get(&store, b"user:99999999")?, None);
    Ok(())
}

#[test]
fn every_persisted_page_fits_and_validates() -> Result<()> {
    let store = MemPageStore::default();
    let mut tree = BTree::new(BTreeOptions {
        root_page: None,
        verify_on_read: true,
    });
    for i in 0..300u32 {
        let val = vec![(i % 251) as u8; (i as usize * 37) % MAX_VAL_SIZE];
        tree.insert(&store, &key_for(i), &val)?;
    }
    for id in store.live_page_ids() {
        let node = store.get_page(id)?;
        assert!(node.encoded_size()? <= PAGE_SIZE);
        node.validate()?;
        assert_eq!(node.to_page().len(), PAGE_SIZE);
    }
    tree.verify(&store)?;
    Ok(())
}

#[test]
fn maximal_keys_and_values_stay_addressable() -> Result<()> {
    let store = MemPageStore::default();
    let mut tree = BTree::new(BTreeOptions::default());
    let mut reference = BTreeMap::new();
    for i in 0..24u8 {
        let key = vec![i; MAX_KEY_SIZE];
        let val = vec![i.wrapping_mul(3); MAX_VAL_SIZE];
        tree.insert(&store, &key, &val)?;
        reference.insert(key, val);
    }
    let report = tree.verify(&store)?;
    assert_eq!(report.entries, reference.len());
    assert_eq!(report.leaves, reference.len(), "one maximal entry per leaf");
    for (key, val) in &reference {
        assert_eq!(tree.get(&store, key)?.as_deref(), Some(val.as_slice()));
    }
    Ok(())
}

#[test]
fn reopening_from_root_page_sees_same_contents() -> Result<()> {
    let store = MemPageStore::default();
    let mut tree = BTree::new(BTreeOptions::default());
    for i in 0..1_000u32 {
        tree.insert(&store, &key_for(i), &i.to_le_bytes())?;
    }
    let reopened = BTree::new(BTreeOptions {
        root_page: tree.root_page(),
        verify_on_read: false,
    });
    assert_eq!(reopened.verify(&store)?, tree.verify(&store)?);
    assert_eq!(
        reopened.get(&store, &key_for(512))?.as_deref(),
        Some(&512u32.to_le_bytes()[..])
    );
    tree.stats().emit_tracing();
    Ok(())
}
