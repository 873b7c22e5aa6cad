//! String and key/value predicates used by the filters.
use crate::api::KeyValue;

/// Returns the value of the first entry with the given key.
pub fn find_in_key_values<'a>(kvs: &'a [KeyValue], key: &str) -> Option<&'a str> {
    kvs.iter()
        .find(|kv| kv.key == key)
        .map(|kv| kv.value.as_str())
}

/// Returns `true` if `actual` contains every pair of `required`.
///
/// Only the first entry of a key in `actual` is considered.
pub fn contains_all_key_values(actual: &[KeyValue], required: &[KeyValue]) -> bool {
    required
        .iter()
        .all(|kv| find_in_key_values(actual, &kv.key) == Some(kv.value.as_str()))
}

/// Returns `true` if `basename` is the last element of the slash separated path `s`.
pub fn is_basename_of(basename: &str, s: &str) -> bool {
    basename == path_base(s)
}

/// Returns `true` if `prefix` is a prefix of `s`.
pub fn is_prefix_of(prefix: &str, s: &str) -> bool {
    s.starts_with(prefix)
}

/// Returns `true` if `keyword` is a substring of `s`.
pub fn is_part_of(keyword: &str, s: &str) -> bool {
    s.contains(keyword)
}

/// Returns `true` if any member of `set` stands in `relation` to `candidate`.
pub fn any_satisfies(set: &[String], candidate: &str, relation: fn(&str, &str) -> bool) -> bool {
    set.iter().any(|member| relation(member, candidate))
}

/// Returns `true` if every string of `required` is yielded by `members`.
pub fn has_all<'a>(members: impl Iterator<Item = &'a str> + Clone, required: &[String]) -> bool {
    required
        .iter()
        .all(|name| members.clone().any(|member| member == name))
}

/// Last element of a slash separated path.
fn path_base(s: &str) -> &str {
    if s.is_empty() {
        return ".";
    }
    let trimmed = s.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kvs(pairs: &[(&str, &str)]) -> Vec<KeyValue> {
        pairs.iter().map(|(k, v)| KeyValue::new(*k, *v)).collect()
    }

    #[test]
    fn test_contains_all_empty_requirement() {
        assert!(contains_all_key_values(&[], &[]));
        assert!(contains_all_key_values(&kvs(&[("a", "1")]), &[]));
    }

    #[test]
    fn test_contains_all_key_values() {
        let actual = kvs(&[("os", "linux"), ("arch", "amd64"), ("version", "1")]);
        assert!(contains_all_key_values(
            &actual,
            &kvs(&[("arch", "amd64"), ("os", "linux")])
        ));
        assert!(!contains_all_key_values(&actual, &kvs(&[("arch", "arm64")])));
        assert!(!contains_all_key_values(&actual, &kvs(&[("missing", "1")])));
    }

    #[test]
    fn test_first_entry_by_key_wins() {
        let actual = kvs(&[("k", "first"), ("k", "second")]);
        assert!(contains_all_key_values(&actual, &kvs(&[("k", "first")])));
        assert!(!contains_all_key_values(&actual, &kvs(&[("k", "second")])));
    }

    #[test]
    fn test_path_base() {
        assert_eq!(path_base("coreos.com/etcd"), "etcd");
        assert_eq!(path_base("etcd"), "etcd");
        assert_eq!(path_base("a/b/"), "b");
        assert_eq!(path_base(""), ".");
        assert_eq!(path_base("///"), "/");
    }

    #[test]
    fn test_string_relations() {
        assert!(is_basename_of("etcd", "coreos.com/etcd"));
        assert!(!is_basename_of("coreos.com", "coreos.com/etcd"));
        assert!(is_prefix_of("coreos.com", "coreos.com/etcd"));
        assert!(!is_prefix_of("etcd", "coreos.com/etcd"));
        assert!(is_part_of("os.com/et", "coreos.com/etcd"));
        assert!(!is_part_of("redis", "coreos.com/etcd"));
    }

    #[test]
    fn test_any_satisfies() {
        let set = vec!["quay.io".to_owned(), "coreos.com".to_owned()];
        assert!(any_satisfies(&set, "coreos.com/etcd", is_prefix_of));
        assert!(!any_satisfies(&set, "docker.io/redis", is_prefix_of));
        assert!(!any_satisfies(&[], "coreos.com/etcd", is_prefix_of));
    }

    #[test]
    fn test_has_all() {
        let names = ["redis", "etcd"];
        assert!(has_all(names.iter().copied(), &["etcd".to_owned()]));
        assert!(has_all(
            names.iter().copied(),
            &["etcd".to_owned(), "redis".to_owned()]
        ));
        assert!(!has_all(
            names.iter().copied(),
            &["etcd".to_owned(), "nginx".to_owned()]
        ));
    }
}
