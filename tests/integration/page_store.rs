#![allow(missing_docs)]

use kvtree::{
    primitives::pager::{MemPageStore, MemStoreOptions, PageStore},
    storage::btree::{append_entry, BTree, BTreeOptions, NodeBuf, NodeKind, NodeRead},
    types::{KvError, PageId, Result},
};

fn single_leaf(key: &[u8], val: &[u8]) -> Result<kvtree::storage::btree::Node> {
    let mut buf = NodeBuf::new(NodeKind::Leaf, 1)?;
    append_entry(&mut buf, 0, PageId(0), key, val)?;
    buf.freeze()
}

#[test]
fn released_ids_are_never_handed_out_again() -> Result<()> {
    let store = MemPageStore::default();
    let mut seen = Vec::new();
    for round in 0..20u8 {
        let id = store.alloc_page(&single_leaf(&[round], b"v")?)?;
        assert!(!seen.contains(&id));
        seen.push(id);
        if round % 2 == 0 {
            store.free_page(id)?;
        }
    }
    assert_eq!(store.live_pages(), 10);
    assert_eq!(store.released_pages(), 10);
    Ok(())
}

#[test]
fn double_release_is_reported() -> Result<()> {
    let store = MemPageStore::default();
    let id = store.alloc_page(&single_leaf(b"k", b"v")?)?;
    store.free_page(id)?;
    assert!(matches!(
        store.free_page(id),
        Err(KvError::PageNotFound(missing)) if missing == id
    ));
    Ok(())
}

#[test]
fn store_counters_follow_tree_activity() -> Result<()> {
    let store = MemPageStore::default();
    let mut tree = BTree::new(BTreeOptions::default());
    tree.insert(&store, b"a", b"1")?;
    tree.insert(&store, b"b", b"2")?;
    let stats = store.stats();
    assert_eq!(stats.allocations, 2);
    assert_eq!(stats.releases, 1);
    assert_eq!(store.live_page_ids(), vec![PageId(2)]);

    let root = store.get_page(PageId(2))?;
    assert_eq!(root.key_count(), 2);
    assert_eq!(store.reclaim(), 1);
    assert_eq!(store.stats().reclaimed, 1);
    Ok(())
}

#[test]
fn dropped_pages_are_gone_without_retention() -> Result<()> {
    let store = MemPageStore::new(MemStoreOptions {
        retain_released: false,
        max_pages: Some(8),
    });
    let id = store.alloc_page(&single_leaf(b"k", b"v")?)?;
    store.free_page(id)?;
    assert!(matches!(store.get_page(id), Err(KvError::PageNotFound(_))));
    assert_eq!(store.options().max_pages, Some(8));
    Ok(())
}
