use crate::api::{ImageFormat, ImageSnapshot, models::to_key_values};
use crate::image::{Error, ImageRecord, ImageStore, Result};
use crate::manifest::ImageManifest;

/// Builds the public view of a stored image.
///
/// Unlike pods, images have no partial view: if the manifest cannot be loaded
/// or parsed the conversion fails.
pub async fn image_from_record(store: &dyn ImageStore, record: &ImageRecord) -> Result<ImageSnapshot> {
    let manifest = store.manifest_bytes(&record.blob_key).await?;
    let parsed = ImageManifest::parse(&manifest).map_err(|source| Error::InvalidManifest {
        key: record.blob_key.clone(),
        source,
    })?;

    Ok(ImageSnapshot {
        base_format: ImageFormat::default(),
        id: record.blob_key.clone(),
        name: parsed.name.clone(),
        version: parsed.version().to_owned(),
        import_timestamp: record.import_time,
        size: record.size + record.tree_store_size,
        annotations: to_key_values(&parsed.annotations),
        labels: to_key_values(&parsed.labels),
        manifest: Some(manifest),
    })
}

/// Resolves `image_id` and returns the view of the image it names.
pub async fn image_info(store: &dyn ImageStore, image_id: &str) -> Result<ImageSnapshot> {
    let key = store.resolve_key(image_id).await.inspect_err(|err| {
        log::error!("failed to resolve the image ID `{}`: {}", image_id, err)
    })?;
    let record = store
        .record(&key)
        .await
        .inspect_err(|err| log::error!("failed to get image record `{}`: {}", key, err))?;
    image_from_record(store, &record).await.inspect_err(|err| {
        log::error!("failed to convert image `{}`: {}", key, err)
    })
}
