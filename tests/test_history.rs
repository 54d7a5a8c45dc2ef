mod common;

use common::{AUTHOR1, AUTHOR2};
use gitwiki::*;

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

#[test]
fn history_most_recent_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"old content", None, "message1", AUTHOR1).unwrap();
    let second = store.write("page", b"new content", Some(&first.sha), "message2", AUTHOR2).unwrap();

    let history = store.history("page").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].sha, second.sha);
    assert_eq!(history[1].sha, first.sha);
    assert_eq!(history[0].message, "message2");
}

#[test]
fn history_skips_commits_to_other_paths() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let a1 = store.write("a", b"1", None, "a1", AUTHOR1).unwrap();
    store.write("b", b"1", None, "b1", AUTHOR1).unwrap();
    let a2 = store.write("a", b"2", Some(&a1.sha), "a2", AUTHOR1).unwrap();
    store.write("c", b"1", None, "c1", AUTHOR1).unwrap();

    let shas: Vec<_> = store.history("a").unwrap().into_iter().map(|c| c.sha).collect();
    assert_eq!(shas, vec![a2.sha, a1.sha]);
}

#[test]
fn history_of_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("docs/a", b"1", None, "docs a", AUTHOR1).unwrap();
    store.write("top", b"1", None, "top", AUTHOR1).unwrap();
    store.write("docs/b", b"1", None, "docs b", AUTHOR1).unwrap();

    let messages: Vec<_> = store.history("docs").unwrap().into_iter().map(|c| c.message).collect();
    assert_eq!(messages, vec!["docs b", "docs a"]);
}

#[test]
fn history_of_root_lists_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("a", b"1", None, "one", AUTHOR1).unwrap();
    store.write("b", b"1", None, "two", AUTHOR1).unwrap();
    store.write("c", b"1", None, "three", AUTHOR1).unwrap();

    assert_eq!(store.history("").unwrap().len(), 3);
    assert_eq!(store.history_limit("", Some(2)).unwrap().len(), 2);
}

#[test]
fn history_of_missing_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    assert!(store.history("page").unwrap_err().is_not_found());

    store.write("other", b"1", None, "m", AUTHOR1).unwrap();
    assert!(store.history("page").unwrap_err().is_not_found());
}

#[test]
fn history_with_extension() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_page_store(dir.path());
    let first = store.write("Home", b"1", None, "m1", AUTHOR1).unwrap();
    store.write("Home", b"2", Some(&first.sha), "m2", AUTHOR1).unwrap();

    assert_eq!(store.history("Home").unwrap().len(), 2);
}

#[test]
fn noop_write_adds_no_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"same", None, "m", AUTHOR1).unwrap();
    store.write("page", b"same", Some(&first.sha), "m", AUTHOR1).unwrap();
    store.write("page", b"same", Some(&first.sha), "m", AUTHOR1).unwrap();

    assert_eq!(store.history("page").unwrap().len(), 1);
    assert_eq!(store.history("").unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

#[test]
fn diff_between_revisions() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"line one\n", None, "m1", AUTHOR1).unwrap();
    let second = store
        .write("page", b"line one\nline two\n", Some(&first.sha), "m2", AUTHOR1)
        .unwrap();

    let diff = store.diff(Some("page"), &first.sha, &second.sha).unwrap();
    assert!(diff.contains("+line two"), "{}", diff);
    assert!(diff.contains(" line one"), "{}", diff);
    assert!(!diff.contains("-line one"), "{}", diff);
}

#[test]
fn diff_scoped_to_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_page_store(dir.path());
    let a = store.write("a", b"a1\n", None, "m", AUTHOR1).unwrap();
    store.write("b", b"b1\n", None, "m", AUTHOR1).unwrap();
    let last = store.write("a", b"a2\n", Some(&a.sha), "m", AUTHOR1).unwrap();

    let scoped = store.diff(Some("a"), &a.sha, &last.sha).unwrap();
    assert!(scoped.contains("+a2"));
    assert!(!scoped.contains("b1"));

    let whole = store.diff(None, &a.sha, &last.sha).unwrap();
    assert!(whole.contains("+a2"));
    assert!(whole.contains("+b1"));
}

#[test]
fn diff_scope_is_literal() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let star = store.write("a*", b"star\n", None, "m", AUTHOR1).unwrap();
    let other = store.write("abc", b"other\n", None, "m", AUTHOR1).unwrap();

    let scoped = store.diff(Some("a*"), &star.sha, &other.sha).unwrap();
    assert!(scoped.is_empty(), "{}", scoped);

    let edited = store.write("a*", b"star2\n", Some(&star.sha), "m", AUTHOR1).unwrap();
    let scoped = store.diff(Some("a*"), &star.sha, &edited.sha).unwrap();
    assert!(scoped.contains("+star2"), "{}", scoped);
    assert!(!scoped.contains("abc"), "{}", scoped);
}

#[test]
fn diff_scoped_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("docs/a", b"a1\n", None, "m", AUTHOR1).unwrap();
    store.write("docs2", b"x\n", None, "m", AUTHOR1).unwrap();
    let last = store.write("docs/b", b"b1\n", None, "m", AUTHOR1).unwrap();

    let scoped = store.diff(Some("docs"), &first.sha, &last.sha).unwrap();
    assert!(scoped.contains("+b1"), "{}", scoped);
    assert!(!scoped.contains("docs2"), "{}", scoped);
}

#[test]
fn diff_accepts_abbreviated_revisions() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"x\n", None, "m", AUTHOR1).unwrap();
    let second = store.write("page", b"y\n", Some(&first.sha), "m", AUTHOR1).unwrap();

    let from = Revision::parse(first.sha.short()).unwrap();
    let to = Revision::parse(second.sha.short()).unwrap();
    let diff = store.diff(None, &from, &to).unwrap();
    assert!(diff.contains("-x"));
    assert!(diff.contains("+y"));
}

#[test]
fn diff_same_revision_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"x\n", None, "m", AUTHOR1).unwrap();
    assert!(store.diff(None, &first.sha, &first.sha).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

#[test]
fn show_root_commit() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"hello\n", None, "initial", AUTHOR1).unwrap();

    let (commit, diff) = store.show(&first.sha).unwrap();
    assert_eq!(commit, first);
    assert!(diff.contains("+hello"));
}

#[test]
fn show_against_parent() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    let first = store.write("page", b"hello\n", None, "m1", AUTHOR1).unwrap();
    store.write("other", b"unrelated\n", None, "m2", AUTHOR1).unwrap();

    let head = store.head().unwrap().unwrap();
    let (commit, diff) = store.show(&head.sha).unwrap();
    assert_eq!(commit.parent.as_ref(), Some(&first.sha));
    assert!(diff.contains("+unrelated"));
    assert!(!diff.contains("hello"));
}

#[test]
fn show_unknown_revision() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::create_store(dir.path());
    store.write("page", b"x", None, "m", AUTHOR1).unwrap();

    let rev = Revision::parse(&"0".repeat(40)).unwrap();
    assert!(store.show(&rev).unwrap_err().is_not_found());
}
