//! Assembly of the public pod and image views from the stores.
mod image;
mod pod;

pub use image::{image_from_record, image_info};
pub use pod::{PodContext, basic_pod, fill_app_info};
