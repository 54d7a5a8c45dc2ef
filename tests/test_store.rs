mod common;

use common::{AUTHOR1, AUTHOR2};
use gitwiki::*;

fn page_text(store: &VersionStore, path: &str, rev: Option<&Revision>) -> String {
    store.resolve_page(path, rev).unwrap().text()
}

// ---------------------------------------------------------------------------
// Open / create
// ---------------------------------------------------------------------------

#[test]
fn create_empty_repository_has_no_head() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    assert!(store.head().unwrap().is_none());
    assert_eq!(store.branch(), "master");
    assert!(store.path().join("HEAD").exists());
}

#[test]
fn open_missing_without_create() {
    let dir = tempfile::tempdir().unwrap();
    let err = VersionStore::open(dir.path().join("nope.git"), OpenOptions::default()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn open_existing() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("page", b"content", None, "m", AUTHOR1).unwrap();

    let reopened = VersionStore::open(store.path(), OpenOptions::default()).unwrap();
    assert_eq!(page_text(&reopened, "page", None), "content");
}

#[test]
fn create_with_main_page() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionStore::open(dir.path().join("wiki.git"), OpenOptions {
        create: true,
        extension: Some(".md".into()),
        main_page: Some("Home".into()),
        ..Default::default()
    })
    .unwrap();

    let page = store.resolve_page("Home", None).unwrap();
    assert_eq!(page.text(), store::MAIN_PAGE_TEXT);
    assert_eq!(page.blob_path(), "Home.md");
    let commit = page.commit().unwrap();
    assert_eq!(commit.message, "Initialize Repository");
    assert_eq!(commit.author, Author::default());
    assert!(commit.parent.is_none());
}

#[test]
fn create_with_custom_branch() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionStore::open(dir.path().join("wiki.git"), OpenOptions {
        create: true,
        branch: Some("wiki".into()),
        ..Default::default()
    })
    .unwrap();
    store.write("page", b"x", None, "m", AUTHOR1).unwrap();

    let repo = git2::Repository::open_bare(store.path()).unwrap();
    assert!(repo.find_reference("refs/heads/wiki").is_ok());
    assert!(repo.find_reference("refs/heads/master").is_err());
}

#[test]
fn invalid_branch_name_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = VersionStore::open(dir.path().join("wiki.git"), OpenOptions {
        create: true,
        branch: Some("bad..name".into()),
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

// ---------------------------------------------------------------------------
// Resolve
// ---------------------------------------------------------------------------

#[test]
fn never_written_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    assert!(store.resolve("page", None).unwrap_err().is_not_found());
    assert!(store.resolve("", None).unwrap_err().is_not_found());

    store.write("other", b"x", None, "m", AUTHOR1).unwrap();
    let err = store.resolve("page", None).unwrap_err();
    assert!(matches!(err, Error::NotFound { ref path, revision: None } if path == "page"));
}

#[test]
fn resolve_directory_as_tree() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("docs/Guide", b"guide", None, "m", AUTHOR1).unwrap();

    let doc = store.resolve("docs", None).unwrap();
    let tree = doc.as_tree().unwrap();
    assert_eq!(tree.path(), "docs");
    let children = tree.children().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].path(), "docs/Guide");
    assert_eq!(children[0].as_page().unwrap().text(), "guide");
}

#[test]
fn resolve_root_tree() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("a", b"1", None, "m", AUTHOR1).unwrap();
    store.write("b/c", b"2", None, "m", AUTHOR1).unwrap();

    let root = store.resolve_tree("", None).unwrap();
    assert_eq!(root.name(), "");
    assert_eq!(root.safe_name(), "root");
    let names: Vec<String> = root.children().unwrap().iter().map(|d| d.name().to_string()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn resolve_page_rejects_tree_and_vice_versa() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("docs/Guide", b"guide", None, "m", AUTHOR1).unwrap();

    assert!(matches!(store.resolve_page("docs", None), Err(Error::IsADirectory(_))));
    assert!(matches!(store.resolve_tree("docs/Guide", None), Err(Error::NotADirectory(_))));
}

#[test]
fn resolve_normalizes_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("docs/Guide", b"guide", None, "m", AUTHOR1).unwrap();

    assert_eq!(page_text(&store, "/docs//Guide/", None), "guide");
    assert!(matches!(store.resolve("docs/../Guide", None), Err(Error::InvalidPath(_))));
}

#[test]
fn resolve_with_abbreviated_revision() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let c1 = store.write("page", b"one", None, "m1", AUTHOR1).unwrap();
    store.write("page", b"two", Some(&c1.sha), "m2", AUTHOR1).unwrap();

    let short = Revision::parse(&c1.sha.as_str()[..7]).unwrap();
    assert_eq!(page_text(&store, "page", Some(&short)), "one");
}

#[test]
fn resolve_unknown_revision_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("page", b"one", None, "m", AUTHOR1).unwrap();

    let strict = Revision::parse(&"ab".repeat(20)).unwrap();
    let err = store.resolve("page", Some(&strict)).unwrap_err();
    assert!(matches!(err, Error::NotFound { revision: Some(_), .. }));

    let short = Revision::parse("fffff").unwrap();
    let err = store.resolve("page", Some(&short)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn resolve_path_absent_at_older_revision() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let c1 = store.write("first", b"1", None, "m", AUTHOR1).unwrap();
    store.write("second", b"2", None, "m", AUTHOR1).unwrap();

    assert!(store.resolve("second", None).is_ok());
    assert!(store.resolve("second", Some(&c1.sha)).unwrap_err().is_not_found());
}

#[test]
fn page_commit_is_last_change_of_that_page() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let c1 = store.write("a", b"1", None, "m", AUTHOR1).unwrap();
    let c2 = store.write("b", b"2", None, "m", AUTHOR1).unwrap();

    assert_eq!(store.resolve_page("a", None).unwrap().commit().unwrap().sha, c1.sha);
    assert_eq!(store.resolve_page("b", None).unwrap().commit().unwrap().sha, c2.sha);

    let root = store.resolve_tree("", None).unwrap();
    assert_eq!(root.revision(), &c2.sha);
    let children = root.children().unwrap();
    assert_eq!(children[0].commit().unwrap().sha, c1.sha);
    assert_eq!(children[1].commit().unwrap().sha, c2.sha);
}

#[test]
fn commit_and_head_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let c1 = store.write("page", b"x", None, "hello", AUTHOR1).unwrap();

    assert_eq!(store.head().unwrap().unwrap(), c1);
    let short = Revision::parse(c1.sha.short()).unwrap();
    assert_eq!(store.commit(&short).unwrap(), c1);
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

#[test]
fn write_new_page() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());

    let commit = store.write("page", b"old content", None, "message1\ntext", AUTHOR1).unwrap();
    assert_eq!(commit.message, "message1\ntext");
    assert_eq!(commit.author.name, "Author1");
    assert_eq!(commit.author.email, "author1@localhorst");
    assert!(commit.parent.is_none());
    assert!(commit.sha.is_strict());

    let page = store.resolve_page("page", None).unwrap();
    assert_eq!(page.content(), b"old content");
    assert!(!page.is_new());
    assert_eq!(page.baseline_revision(), Some(&commit.sha));
}

#[test]
fn write_believed_new_twice_is_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"old content", None, "message1", AUTHOR1).unwrap();

    for content in [&b"different"[..], &b"old content"[..]] {
        let err = store.write("page", content, None, "again", AUTHOR2).unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)), "{:?}", err);
        assert!(err.is_recoverable());
    }
    assert_eq!(store.head().unwrap().unwrap().sha, first.sha);
    assert_eq!(page_text(&store, "page", None), "old content");
}

#[test]
fn edit_with_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"old content", None, "message1", AUTHOR1).unwrap();

    let second = store
        .write("page", b"new content", Some(&first.sha), "message2", AUTHOR2)
        .unwrap();
    assert_eq!(second.message, "message2");
    assert_eq!(second.author.name, "Author2");
    assert_eq!(second.parent.as_ref(), Some(&first.sha));

    assert_eq!(page_text(&store, "page", None), "new content");
    assert_eq!(page_text(&store, "page", Some(&first.sha)), "old content");
}

#[test]
fn stale_baseline_is_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"v1", None, "m", AUTHOR1).unwrap();
    let second = store.write("page", b"v2", Some(&first.sha), "m", AUTHOR1).unwrap();

    let err = store.write("page", b"v3", Some(&first.sha), "m", AUTHOR2).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(store.head().unwrap().unwrap().sha, second.sha);
    assert_eq!(page_text(&store, "page", None), "v2");
}

#[test]
fn commits_to_other_paths_do_not_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let a = store.write("a", b"a1", None, "m", AUTHOR1).unwrap();
    store.write("b", b"b1", None, "m", AUTHOR2).unwrap();

    let edited = store.write("a", b"a2", Some(&a.sha), "m", AUTHOR1).unwrap();
    assert_eq!(page_text(&store, "a", None), "a2");
    assert_eq!(page_text(&store, "b", Some(&edited.sha)), "b1");
}

#[test]
fn identical_content_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"same", None, "m", AUTHOR1).unwrap();

    let again = store.write("page", b"same", Some(&first.sha), "other message", AUTHOR2).unwrap();
    assert_eq!(again, first);
    assert_eq!(store.head().unwrap().unwrap().sha, first.sha);
    assert_eq!(store.history("page").unwrap().len(), 1);
}

#[test]
fn noop_returns_last_change_of_page() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let a = store.write("a", b"same", None, "m", AUTHOR1).unwrap();
    let b = store.write("b", b"x", None, "m", AUTHOR1).unwrap();

    let again = store.write("a", b"same", Some(&a.sha), "m", AUTHOR1).unwrap();
    assert_eq!(again.sha, a.sha);
    assert_eq!(store.head().unwrap().unwrap().sha, b.sha);
}

#[test]
fn validation_rejects_before_commit() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());

    for (message, author) in [
        ("", AUTHOR1),
        ("   \n", AUTHOR1),
        ("m", "Author1"),
        ("m", "Author1 author1@localhorst"),
        ("m", "<author1@localhorst>"),
    ] {
        let err = store.write("page", b"x", None, message, author).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{:?} / {:?}: {:?}", message, author, err);
    }
    assert!(store.head().unwrap().is_none());
}

#[test]
fn abbreviated_baseline_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"v1", None, "m", AUTHOR1).unwrap();

    let short = Revision::parse(first.sha.short()).unwrap();
    let err = store.write("page", b"v2", Some(&short), "m", AUTHOR1).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(page_text(&store, "page", None), "v1");
}

#[test]
fn write_to_root_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    assert!(matches!(store.write("/", b"x", None, "m", AUTHOR1), Err(Error::InvalidPath(_))));
    assert!(matches!(store.new_page(""), Err(Error::InvalidPath(_))));
}

#[test]
fn write_below_page_is_not_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("top", b"x", None, "m", AUTHOR1).unwrap();

    let err = store.write("top/sub", b"y", None, "m", AUTHOR1).unwrap_err();
    assert!(matches!(err, Error::NotADirectory(ref p) if p == "top"));
}

#[test]
fn write_onto_directory_is_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("dir/page", b"x", None, "m", AUTHOR1).unwrap();

    let err = store.write("dir", b"y", None, "m", AUTHOR1).unwrap_err();
    assert!(matches!(err, Error::IsADirectory(_)));
}

#[test]
fn nested_write_keeps_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("a/b/one", b"1", None, "m", AUTHOR1).unwrap();
    store.write("a/b/two", b"2", None, "m", AUTHOR1).unwrap();
    store.write("a/three", b"3", None, "m", AUTHOR1).unwrap();

    assert_eq!(page_text(&store, "a/b/one", None), "1");
    assert_eq!(page_text(&store, "a/b/two", None), "2");
    assert_eq!(page_text(&store, "a/three", None), "3");
}

#[test]
fn find_or_new_returns_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());

    let page = store.find_or_new("docs/New").unwrap();
    assert!(page.is_new());
    assert_eq!(page.path(), "docs/New");
    assert!(page.content().is_empty());

    store.write("docs/New", b"now exists", None, "m", AUTHOR1).unwrap();
    let page = store.find_or_new("docs/New").unwrap();
    assert!(!page.is_new());
}

// ---------------------------------------------------------------------------
// Extension mapping
// ---------------------------------------------------------------------------

#[test]
fn extension_is_appended_to_blob_name() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_page_store(dir.path());
    store.write("Home", b"# Home", None, "m", AUTHOR1).unwrap();

    let page = store.resolve_page("Home", None).unwrap();
    assert_eq!(page.path(), "Home");
    assert_eq!(page.name(), "Home");
    assert_eq!(page.blob_path(), "Home.md");
    assert_eq!(page.mime(), MimeKind::Markdown);

    let repo = git2::Repository::open_bare(store.path()).unwrap();
    let head = repo.find_reference("refs/heads/master").unwrap().peel_to_tree().unwrap();
    assert!(head.get_name("Home.md").is_some());
    assert!(head.get_name("Home").is_none());
}

#[test]
fn extension_hidden_in_listing() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_page_store(dir.path());
    store.write("docs/Guide", b"g", None, "m", AUTHOR1).unwrap();

    let docs = store.resolve_tree("docs", None).unwrap();
    let children = docs.children().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].path(), "docs/Guide");
    assert_eq!(children[0].as_page().unwrap().blob_path(), "docs/Guide.md");
}

#[test]
fn write_below_page_with_extension_is_not_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_page_store(dir.path());
    store.write("Home", b"index", None, "m", AUTHOR1).unwrap();

    let err = store.write("Home/Sub", b"sub", None, "m", AUTHOR1).unwrap_err();
    assert!(matches!(err, Error::NotADirectory(ref p) if p == "Home"));

    let root = store.resolve_tree("", None).unwrap();
    let children: Vec<(String, bool)> = root
        .children()
        .unwrap()
        .iter()
        .map(|d| (d.path().to_string(), d.is_tree()))
        .collect();
    assert_eq!(children, vec![("Home".to_string(), false)]);
}

#[test]
fn write_page_onto_directory_with_extension_is_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_page_store(dir.path());
    store.write("Home/Sub", b"sub", None, "m", AUTHOR1).unwrap();

    let err = store.write("Home", b"index", None, "m", AUTHOR1).unwrap_err();
    assert!(matches!(err, Error::IsADirectory(ref p) if p == "Home"));
    assert!(store.resolve("Home", None).unwrap().is_tree());
}

#[test]
fn extension_not_doubled() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_page_store(dir.path());
    store.write("Notes.md", b"notes", None, "m", AUTHOR1).unwrap();

    let page = store.resolve_page("Notes", None).unwrap();
    assert_eq!(page.blob_path(), "Notes.md");
    assert_eq!(page.text(), "notes");
}
