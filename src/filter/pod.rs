use crate::api::{PodFilter, PodSnapshot};

use super::matching::{contains_all_key_values, has_all};
use super::{Criterion, satisfies, satisfies_any, when_set};

const CRITERIA: &[Criterion<PodSnapshot, PodFilter>] = &[
    by_id,
    by_state,
    by_app_names,
    by_image_ids,
    by_network_names,
    by_annotations,
    by_cgroup,
    by_pod_sub_cgroup,
];

/// Returns `true` if the pod meets every criterion set in `filter`.
pub fn satisfies_pod_filter(pod: &PodSnapshot, filter: &PodFilter) -> bool {
    satisfies(CRITERIA, pod, filter)
}

/// Returns `true` if `filters` is empty or the pod satisfies any of them.
pub fn satisfies_any_pod_filter(pod: &PodSnapshot, filters: &[PodFilter]) -> bool {
    satisfies_any(CRITERIA, pod, filters)
}

fn by_id(pod: &PodSnapshot, filter: &PodFilter) -> Option<bool> {
    when_set(&filter.ids, |ids| ids.contains(&pod.id))
}

fn by_state(pod: &PodSnapshot, filter: &PodFilter) -> Option<bool> {
    when_set(&filter.states, |states| states.contains(&pod.state))
}

fn by_app_names(pod: &PodSnapshot, filter: &PodFilter) -> Option<bool> {
    when_set(&filter.app_names, |names| {
        has_all(pod.apps.iter().map(|app| app.name.as_str()), names)
    })
}

fn by_image_ids(pod: &PodSnapshot, filter: &PodFilter) -> Option<bool> {
    when_set(&filter.image_ids, |ids| {
        has_all(pod.apps.iter().map(|app| app.image.id.as_str()), ids)
    })
}

fn by_network_names(pod: &PodSnapshot, filter: &PodFilter) -> Option<bool> {
    when_set(&filter.network_names, |names| {
        has_all(pod.networks.iter().map(|net| net.name.as_str()), names)
    })
}

fn by_annotations(pod: &PodSnapshot, filter: &PodFilter) -> Option<bool> {
    when_set(&filter.annotations, |required| {
        contains_all_key_values(&pod.annotations, required)
    })
}

fn by_cgroup(pod: &PodSnapshot, filter: &PodFilter) -> Option<bool> {
    when_set(&filter.cgroups, |cgroups| cgroups.contains(&pod.cgroup))
}

/// The pod's cgroup has to be a prefix of one of the given paths, i.e. the
/// paths name cgroups nested below the pod. A pod without cgroup never matches.
fn by_pod_sub_cgroup(pod: &PodSnapshot, filter: &PodFilter) -> Option<bool> {
    when_set(&filter.pod_sub_cgroups, |paths| {
        !pod.cgroup.is_empty() && paths.iter().any(|path| path.starts_with(&pod.cgroup))
    })
}
