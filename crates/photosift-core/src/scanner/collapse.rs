use crate::model::{
    self, LogicalPhoto, RawFile, RelatedFile, RelatedKind,
};
use std::collections::HashMap;

/// Base-name key: filename with its final extension stripped, compared
/// case-insensitively, scoped to the containing directory.
fn group_key(file: &RawFile) -> (String, String) {
    let stem = match file.name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file.name.as_str(),
    };
    (file.directory.clone(), stem.to_lowercase())
}

/// Collapse raw discovery records into logical photos.
///
/// Files sharing a base name within one directory become a single photo:
/// the RAW (or failing that the best raster) is the primary, XMP/XML
/// siblings are sidecars, and rasters under a RAW primary are previews.
/// Identical base names in different directories never collapse. Groups
/// that contain only sidecars are dropped.
pub fn collapse_into_photos(files: Vec<RawFile>) -> Vec<LogicalPhoto> {
    let mut groups: HashMap<(String, String), Vec<RawFile>> = HashMap::new();
    for file in files {
        groups.entry(group_key(&file)).or_default().push(file);
    }

    let mut photos: Vec<LogicalPhoto> = Vec::with_capacity(groups.len());

    for (_, mut members) in groups {
        members.sort_by(|a, b| a.path.cmp(&b.path));

        let raw_primary = members
            .iter()
            .position(|f| model::is_raw_extension(&f.extension));

        if let Some(primary_idx) = raw_primary {
            let primary = members.remove(primary_idx);
            photos.push(build_photo_with_related(primary, members));
        } else if let Some(primary_idx) = members
            .iter()
            .position(|f| model::is_image_extension(&f.extension))
        {
            // No RAW: the first raster is the primary and claims the
            // sidecars; any further rasters stand alone as their own
            // photos (a JPEG is only a "preview" of a RAW).
            let primary = members.remove(primary_idx);

            let (sidecars, rest): (Vec<RawFile>, Vec<RawFile>) = members
                .into_iter()
                .partition(|f| model::is_sidecar_extension(&f.extension));

            photos.push(build_photo_with_related(primary, sidecars));
            for standalone in rest {
                photos.push(build_photo_with_related(standalone, Vec::new()));
            }
        }
        // Only sidecars left: not a photo.
    }

    photos
}

fn build_photo_with_related(primary: RawFile, members: Vec<RawFile>) -> LogicalPhoto {
    let primary_is_raw = model::is_raw_extension(&primary.extension);
    let mut related_files: Vec<RelatedFile> = Vec::with_capacity(members.len());
    let mut preview_path: Option<String> = None;

    for member in members {
        let kind = if model::is_sidecar_extension(&member.extension) {
            RelatedKind::Sidecar
        } else if model::is_raw_extension(&member.extension) {
            RelatedKind::Raw
        } else {
            // Raster alongside a RAW primary: an embedded-preview export.
            // Prefer a JPEG for the thumbnail but accept any raster.
            let is_jpeg = member.extension == "jpg" || member.extension == "jpeg";
            if is_jpeg || preview_path.is_none() {
                preview_path = Some(member.path.clone());
            }
            RelatedKind::JpegPreview
        };

        related_files.push(RelatedFile {
            path: member.path,
            name: member.name,
            kind,
        });
    }

    let thumbnail_path = if primary_is_raw {
        preview_path
    } else {
        Some(primary.path.clone())
    };

    LogicalPhoto {
        id: model::photo_id(&primary.path),
        path: primary.path,
        name: primary.name,
        directory: primary.directory,
        extension: primary.extension,
        size: primary.size,
        modified_at: primary.modified_at,
        hash: None,
        thumbnail_path,
        related_files,
        is_duplicate: false,
        duplicate_of: None,
        is_cloud_placeholder: primary.is_cloud_placeholder,
    }
}
