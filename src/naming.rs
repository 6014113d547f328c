//
// naming.rs
// Dicom-Archive-Tools
//
// Builds deterministic display names for output artifacts from a handful of header fields.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use dicom::core::Tag;
use dicom::dictionary_std::tags;

use crate::dicom_access::ElementAccess;
use crate::models::FrameLayout;

const DATE_TAGS: [Tag; 3] = [tags::ACQUISITION_DATE, tags::CONTENT_DATE, tags::STUDY_DATE];
const LABEL_TAGS: [Tag; 3] = [tags::SERIES_DESCRIPTION, tags::STUDY_DESCRIPTION, tags::MODALITY];

/// `{date}_{label}_{suffix}_{frame_tag}`, e.g. `20081001_R_CC_Tomosynthesis_Projection_637_single_frame`.
///
/// Only header fields are consulted, so the same file always yields the same name.
pub fn derive_filename<T: ElementAccess>(obj: &T, source: &Path) -> String {
    let date = first_text(obj, &DATE_TAGS)
        .map(|d| sanitize_label(&d))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "nodate".to_string());

    let label = first_text(obj, &LABEL_TAGS)
        .map(|l| sanitize_label(&l))
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "unlabelled".to_string());

    let suffix = obj
        .element_text(tags::SOP_INSTANCE_UID)
        .and_then(|uid| uid_suffix(&uid))
        .or_else(|| {
            source
                .file_stem()
                .map(|s| sanitize_label(&s.to_string_lossy()))
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "0".to_string());

    let layout = FrameLayout::from_shape(obj.pixel_shape().as_ref());

    format!("{}_{}_{}_{}", date, label, suffix, layout.tag())
}

fn first_text<T: ElementAccess>(obj: &T, tags: &[Tag]) -> Option<String> {
    tags.iter().find_map(|&tag| obj.element_text(tag))
}

/// Last UID component that is not a trailing zero: `…1363785608958.637.0` gives `637`.
pub fn uid_suffix(uid: &str) -> Option<String> {
    let components: Vec<&str> = uid
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .split('.')
        .filter(|c| !c.is_empty())
        .collect();

    let last_significant = components
        .iter()
        .rev()
        .find(|c| c.chars().any(|ch| ch != '0'))
        .or_else(|| components.last())?;

    Some(last_significant.to_string())
}

/// Keep runs of ASCII alphanumerics, joined with underscores.
pub fn sanitize_label(input: &str) -> String {
    input
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
