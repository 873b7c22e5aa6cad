use crate::api::{ImageFilter, ImageSnapshot};

use super::matching::{
    any_satisfies, contains_all_key_values, is_basename_of, is_part_of, is_prefix_of,
};
use super::{Criterion, satisfies, satisfies_any, when_set};

const CRITERIA: &[Criterion<ImageSnapshot, ImageFilter>] = &[
    by_id,
    by_full_name,
    by_prefix,
    by_base_name,
    by_keyword,
    by_imported_after,
    by_imported_before,
    by_labels,
    by_annotations,
];

/// Returns `true` if the image meets every criterion set in `filter`.
pub fn satisfies_image_filter(image: &ImageSnapshot, filter: &ImageFilter) -> bool {
    satisfies(CRITERIA, image, filter)
}

/// Returns `true` if `filters` is empty or the image satisfies any of them.
pub fn satisfies_any_image_filter(image: &ImageSnapshot, filters: &[ImageFilter]) -> bool {
    satisfies_any(CRITERIA, image, filters)
}

fn by_id(image: &ImageSnapshot, filter: &ImageFilter) -> Option<bool> {
    when_set(&filter.ids, |ids| ids.contains(&image.id))
}

fn by_full_name(image: &ImageSnapshot, filter: &ImageFilter) -> Option<bool> {
    when_set(&filter.full_names, |names| names.contains(&image.name))
}

fn by_prefix(image: &ImageSnapshot, filter: &ImageFilter) -> Option<bool> {
    when_set(&filter.prefixes, |prefixes| {
        any_satisfies(prefixes, &image.name, is_prefix_of)
    })
}

fn by_base_name(image: &ImageSnapshot, filter: &ImageFilter) -> Option<bool> {
    when_set(&filter.base_names, |names| {
        any_satisfies(names, &image.name, is_basename_of)
    })
}

fn by_keyword(image: &ImageSnapshot, filter: &ImageFilter) -> Option<bool> {
    when_set(&filter.keywords, |keywords| {
        any_satisfies(keywords, &image.name, is_part_of)
    })
}

fn by_imported_after(image: &ImageSnapshot, filter: &ImageFilter) -> Option<bool> {
    (filter.imported_after > 0).then(|| image.import_timestamp > filter.imported_after)
}

fn by_imported_before(image: &ImageSnapshot, filter: &ImageFilter) -> Option<bool> {
    (filter.imported_before > 0).then(|| image.import_timestamp < filter.imported_before)
}

fn by_labels(image: &ImageSnapshot, filter: &ImageFilter) -> Option<bool> {
    when_set(&filter.labels, |required| {
        contains_all_key_values(&image.labels, required)
    })
}

fn by_annotations(image: &ImageSnapshot, filter: &ImageFilter) -> Option<bool> {
    when_set(&filter.annotations, |required| {
        contains_all_key_values(&image.annotations, required)
    })
}
