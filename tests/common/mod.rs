use std::path::Path;

use gitwiki::*;

pub const AUTHOR1: &str = "Author1 <author1@localhorst>";
pub const AUTHOR2: &str = "Author2 <author2@localhorst>";

pub fn create_store(dir: &Path) -> VersionStore {
    VersionStore::open(dir.join("wiki.git"), OpenOptions {
        create: true,
        ..Default::default()
    })
    .unwrap()
}

#[allow(dead_code)]
pub fn create_page_store(dir: &Path) -> VersionStore {
    VersionStore::open(dir.join("wiki.git"), OpenOptions {
        create: true,
        extension: Some(".md".into()),
        ..Default::default()
    })
    .unwrap()
}

#[allow(dead_code)]
pub fn create_wiki(dir: &Path) -> Wiki {
    Wiki::new(create_page_store(dir))
}

/// Store with `A/B/C/leaf`, `A/page`, `A/B/other` and `top`.
#[allow(dead_code)]
pub fn store_with_tree(dir: &Path) -> VersionStore {
    let store = create_store(dir);
    for path in ["A/B/C/leaf", "A/page", "A/B/other", "top"] {
        store.write(path, path.as_bytes(), None, &format!("add {}", path), AUTHOR1).unwrap();
    }
    store
}
