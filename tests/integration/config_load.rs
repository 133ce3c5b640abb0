#![allow(missing_docs)]

use kvtree::{
    config::{Config, ConfigError},
    primitives::pager::MemPageStore,
    storage::btree::BTree,
    types::PageId,
};
use tempfile::tempdir;

#[test]
fn config_file_drives_tree_and_store() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("kvtree.toml");
    std::fs::write(
        &path,
        "[btree]\nverify_on_read = true\n\n[store]\nretain_released = false\nmax_pages = 64\n",
    )?;

    let config = Config::load(&path)?;
    assert!(config.btree.verify_on_read);
    assert_eq!(config.btree.root_page, None);
    assert_eq!(config.store.max_pages, Some(64));

    let store = MemPageStore::new(config.store.clone());
    let mut tree = BTree::new(config.btree.clone());
    tree.insert(&store, b"alpha", b"1")?;
    assert_eq!(tree.get(&store, b"alpha")?.as_deref(), Some(&b"1"[..]));
    assert_eq!(store.released_pages(), 0);
    Ok(())
}

#[test]
fn saved_config_loads_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("saved.toml");
    let mut config = Config::default();
    config.btree.root_page = Some(PageId(9));
    config.save(&path)?;
    assert_eq!(Config::load(&path)?, config);
    Ok(())
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("absent.toml");
    match Config::load(&path) {
        Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected read error, got {other:?}"),
    }
}
