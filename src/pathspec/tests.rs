use std::sync::Arc;

use super::{PathMap, PathSpec, PathSpecGroup};

fn spec(decl: &str) -> Arc<PathSpec> {
    Arc::new(PathSpec::new(decl).expect("valid declaration"))
}

#[test]
fn test_classification() {
    assert_eq!(spec("").group(), PathSpecGroup::Root);
    assert_eq!(spec("/").group(), PathSpecGroup::Default);
    assert_eq!(spec("/a/b").group(), PathSpecGroup::Exact);
    assert_eq!(spec("/a/*").group(), PathSpecGroup::Prefix);
    assert_eq!(spec("*.jsp").group(), PathSpecGroup::Suffix);
}

#[test]
fn test_invalid_declarations() {
    for decl in ["a/b", "*.", "*.a.*", "/a/*/b", "/a*", "*.a/b"] {
        assert!(PathSpec::new(decl).is_err(), "expected {decl:?} to be rejected");
    }
}

#[test]
fn test_exact_match() {
    let s = spec("/foo/bar");
    assert!(s.matches("/foo/bar"));
    assert!(!s.matches("/foo/bar/"));
    assert!(!s.matches("/foo"));
}

#[test]
fn test_prefix_match() {
    let s = spec("/foo/*");
    assert!(s.matches("/foo"));
    assert!(s.matches("/foo/bar"));
    assert!(s.matches("/foo/bar/baz"));
    assert!(!s.matches("/foobar"));
    assert!(!s.matches("/fo"));
}

#[test]
fn test_suffix_match() {
    let s = spec("*.jsp");
    assert!(s.matches("/x.jsp"));
    assert!(s.matches("/a/b/index.jsp"));
    assert!(!s.matches("/x.jspx"));
    assert!(!s.matches(".jsp"));
}

#[test]
fn test_root_and_default_match() {
    let root = spec("");
    assert!(root.matches("/"));
    assert!(!root.matches("/a"));

    let default = spec("/");
    assert!(default.matches("/"));
    assert!(default.matches("/anything/at/all"));
}

#[test]
fn test_specificity_ordering() {
    let exact = spec("/a/b");
    let long_prefix = spec("/a/b/*");
    let short_prefix = spec("/a/*");
    let suffix = spec("*.jsp");
    let root = spec("");
    let default = spec("/");

    assert!(exact.specificity() > long_prefix.specificity());
    assert!(long_prefix.specificity() > short_prefix.specificity());
    assert!(short_prefix.specificity() > suffix.specificity());
    assert!(suffix.specificity() > root.specificity());
    assert!(root.specificity() > default.specificity());
}

#[test]
fn test_split_exact() {
    let s = spec("/foo/bar");
    let split = s.split("/foo/bar").unwrap();
    assert_eq!(split.servlet_path, "/foo/bar");
    assert_eq!(split.path_info, None);
}

#[test]
fn test_split_prefix() {
    let s = spec("/foo/*");
    let split = s.split("/foo/bar/baz").unwrap();
    assert_eq!(split.servlet_path, "/foo");
    assert_eq!(split.path_info, Some("/bar/baz"));

    let split = s.split("/foo").unwrap();
    assert_eq!(split.servlet_path, "/foo");
    assert_eq!(split.path_info, None);
}

#[test]
fn test_split_root() {
    let s = spec("");
    let split = s.split("/").unwrap();
    assert_eq!(split.servlet_path, "");
    assert_eq!(split.path_info, Some("/"));
}

#[test]
fn test_split_non_matching() {
    assert!(spec("/foo/*").split("/bar").is_none());
}

#[test]
fn test_best_match_exact_over_prefix() {
    let mut map = PathMap::new();
    map.insert(spec("/foo/bar"), "h1");
    map.insert(spec("/foo/*"), "h2");

    assert_eq!(map.best_match("/foo/bar").map(|(_, v)| *v), Some("h1"));
    assert_eq!(map.best_match("/foo/baz").map(|(_, v)| *v), Some("h2"));
    assert_eq!(map.best_match("/other"), None);
}

#[test]
fn test_best_match_longest_prefix_wins() {
    let mut map = PathMap::new();
    map.insert(spec("/a/*"), "short");
    map.insert(spec("/a/b/*"), "long");

    assert_eq!(map.best_match("/a/b/c").map(|(_, v)| *v), Some("long"));
    assert_eq!(map.best_match("/a/x").map(|(_, v)| *v), Some("short"));
}

#[test]
fn test_best_match_suffix_vs_default() {
    let mut map = PathMap::new();
    map.insert(spec("*.jsp"), "jsp");
    map.insert(spec("/"), "default");

    assert_eq!(map.best_match("/x.jsp").map(|(_, v)| *v), Some("jsp"));
    assert_eq!(map.best_match("/x.html").map(|(_, v)| *v), Some("default"));
}

#[test]
fn test_best_match_root_before_default() {
    let mut map = PathMap::new();
    map.insert(spec(""), "root");
    map.insert(spec("/"), "default");

    assert_eq!(map.best_match("/").map(|(_, v)| *v), Some("root"));
    assert_eq!(map.best_match("/x").map(|(_, v)| *v), Some("default"));
}

#[test]
fn test_insert_replaces_duplicate_declaration() {
    let mut map = PathMap::new();
    map.insert(spec("/a/*"), "first");
    map.insert(spec("/a/*"), "second");

    assert_eq!(map.len(), 1);
    assert_eq!(map.best_match("/a/x").map(|(_, v)| *v), Some("second"));
}
