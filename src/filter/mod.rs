//! Composable filters over pod and image snapshots.
//!
//! A structured filter is a set of optional criteria. Each criterion is an
//! independent function returning `None` when the filter does not use it, so
//! a filter is satisfied when every used criterion holds. A request carries a
//! list of filters combined with OR; an empty list matches everything.
mod image;
pub mod matching;
mod pod;

pub use image::{satisfies_any_image_filter, satisfies_image_filter};
pub use pod::{satisfies_any_pod_filter, satisfies_pod_filter};

/// A single filter criterion; `None` means the criterion is not set.
pub type Criterion<T, F> = fn(&T, &F) -> Option<bool>;

/// Returns `true` if `item` meets every criterion set in `filter`.
pub fn satisfies<T, F>(criteria: &[Criterion<T, F>], item: &T, filter: &F) -> bool {
    criteria
        .iter()
        .all(|criterion| criterion(item, filter).unwrap_or(true))
}

/// Returns `true` if `filters` is empty or `item` satisfies any of them.
pub fn satisfies_any<T, F>(criteria: &[Criterion<T, F>], item: &T, filters: &[F]) -> bool {
    filters.is_empty() || filters.iter().any(|filter| satisfies(criteria, item, filter))
}

/// Evaluates `check` only if `values` is non-empty.
fn when_set<V>(values: &[V], check: impl FnOnce(&[V]) -> bool) -> Option<bool> {
    (!values.is_empty()).then(|| check(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_least(value: &u32, filter: &(Option<u32>, Option<u32>)) -> Option<bool> {
        filter.0.map(|min| *value >= min)
    }

    fn at_most(value: &u32, filter: &(Option<u32>, Option<u32>)) -> Option<bool> {
        filter.1.map(|max| *value <= max)
    }

    const CRITERIA: &[Criterion<u32, (Option<u32>, Option<u32>)>] = &[at_least, at_most];

    #[test]
    fn test_unset_criteria_match() {
        assert!(satisfies(CRITERIA, &5, &(None, None)));
    }

    #[test]
    fn test_criteria_are_combined_with_and() {
        assert!(satisfies(CRITERIA, &5, &(Some(1), Some(5))));
        assert!(!satisfies(CRITERIA, &5, &(Some(1), Some(4))));
        assert!(!satisfies(CRITERIA, &5, &(Some(6), None)));
    }

    #[test]
    fn test_filters_are_combined_with_or() {
        assert!(satisfies_any(CRITERIA, &5, &[]));
        assert!(satisfies_any(
            CRITERIA,
            &5,
            &[(Some(6), None), (None, Some(5))]
        ));
        assert!(!satisfies_any(
            CRITERIA,
            &5,
            &[(Some(6), None), (None, Some(4))]
        ));
    }

    #[test]
    fn test_when_set() {
        assert_eq!(when_set::<u8>(&[], |_| false), None);
        assert_eq!(when_set(&[1], |v| v[0] == 1), Some(true));
    }
}
