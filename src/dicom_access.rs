use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{DefaultDicomObject, InMemDicomObject};
use dicom::dictionary_std::StandardDataDictionary;

use crate::models::PixelShape;

/// Small helper trait to pull header values out of file-backed and in-memory objects alike.
pub trait ElementAccess {
    fn element_str(&self, tag: Tag) -> Option<String>;
    fn has_element(&self, tag: Tag) -> bool;

    /// Trimmed, non-empty text value.
    fn element_text(&self, tag: Tag) -> Option<String> {
        self.element_str(tag)
            .map(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\0').to_string())
            .filter(|s| !s.is_empty())
    }

    /// Integer value, accepting both binary (US) and string (IS) encodings.
    fn element_int(&self, tag: Tag) -> Option<i64> {
        self.element_text(tag)
            .and_then(|s| s.split('\\').next().map(|v| v.trim().to_string()))
            .and_then(|v| v.parse::<i64>().ok())
    }

    fn pixel_shape(&self) -> Option<PixelShape> {
        if !self.has_element(tags::PIXEL_DATA) {
            return None;
        }
        let frames = self
            .element_int(tags::NUMBER_OF_FRAMES)
            .filter(|&n| n > 0)
            .unwrap_or(1);
        Some(PixelShape {
            frames: u32::try_from(frames).unwrap_or(u32::MAX),
            rows: self.element_int(tags::ROWS).unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32,
            columns: self
                .element_int(tags::COLUMNS)
                .unwrap_or(0)
                .clamp(0, i64::from(u32::MAX)) as u32,
            samples_per_pixel: self
                .element_int(tags::SAMPLES_PER_PIXEL)
                .unwrap_or(1)
                .clamp(0, i64::from(u16::MAX)) as u16,
            bits_allocated: self
                .element_int(tags::BITS_ALLOCATED)
                .unwrap_or(8)
                .clamp(0, i64::from(u16::MAX)) as u16,
        })
    }
}

impl ElementAccess for DefaultDicomObject {
    fn element_str(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| s.into_owned())
    }

    fn has_element(&self, tag: Tag) -> bool {
        self.element(tag).is_ok()
    }
}

impl ElementAccess for InMemDicomObject<StandardDataDictionary> {
    fn element_str(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| s.into_owned())
    }

    fn has_element(&self, tag: Tag) -> bool {
        self.element(tag).is_ok()
    }
}
