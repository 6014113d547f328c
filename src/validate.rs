use dicom::dictionary_std::tags;

use crate::dicom_access::ElementAccess;

const SUPPORTED_PHOTOMETRIC: [&str; 4] = ["MONOCHROME1", "MONOCHROME2", "RGB", "YBR_FULL"];

/// Pixel module attributes an encoder cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingConstraints {
    /// Allowed Bits Allocated values.
    pub bits_allocated: &'static [u16],
}

impl EncodingConstraints {
    /// JPEG-LS accepts 8- and 16-bit containers.
    pub const JPEG_LS: EncodingConstraints = EncodingConstraints {
        bits_allocated: &[8, 16],
    };

    pub const JPEG_BASELINE: EncodingConstraints = EncodingConstraints {
        bits_allocated: &[8],
    };
}

/// Checks that the pixel description can be fed to an encoder without corrupting it.
/// Returns every violation found; an empty list means the file is compatible.
pub fn check_encoding_constraints<T: ElementAccess>(
    obj: &T,
    constraints: &EncodingConstraints,
) -> Vec<String> {
    let mut problems = Vec::new();

    if !obj.has_element(tags::PIXEL_DATA) {
        problems.push("Pixel Data is absent".to_string());
        return problems;
    }

    match obj.element_text(tags::PHOTOMETRIC_INTERPRETATION) {
        Some(pi) if SUPPORTED_PHOTOMETRIC.contains(&pi.as_str()) => {}
        Some(pi) => problems.push(format!("Photometric Interpretation {} is not supported", pi)),
        None => problems.push("Photometric Interpretation is missing".to_string()),
    }

    let bits_allocated = obj.element_int(tags::BITS_ALLOCATED);
    match bits_allocated {
        Some(bits) if constraints.bits_allocated.iter().any(|&b| i64::from(b) == bits) => {}
        Some(bits) => problems.push(format!(
            "Bits Allocated {} is not one of {:?}",
            bits, constraints.bits_allocated
        )),
        None => problems.push("Bits Allocated is missing".to_string()),
    }

    let bits_stored = obj.element_int(tags::BITS_STORED);
    match (bits_stored, bits_allocated) {
        (Some(stored), Some(allocated)) if stored < 1 || stored > allocated => problems.push(
            format!("Bits Stored {} must be within 1..={}", stored, allocated),
        ),
        (None, _) => problems.push("Bits Stored is missing".to_string()),
        _ => {}
    }

    match (obj.element_int(tags::HIGH_BIT), bits_stored) {
        (Some(high), Some(stored)) if high != stored - 1 => {
            problems.push(format!("High Bit {} must be Bits Stored - 1 ({})", high, stored - 1))
        }
        (None, _) => problems.push("High Bit is missing".to_string()),
        _ => {}
    }

    if obj.has_element(tags::PLANAR_CONFIGURATION) {
        problems.push("Planar Configuration must be absent".to_string());
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::{DataElement, PrimitiveValue, VR};
    use dicom::dictionary_std::StandardDataDictionary;
    use dicom::object::InMemDicomObject;

    fn pixel_module(bits_allocated: u16, bits_stored: u16, high_bit: u16) -> InMemDicomObject<StandardDataDictionary> {
        let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
        obj.put(DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            PrimitiveValue::from("MONOCHROME2"),
        ));
        obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(bits_allocated)));
        obj.put(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(bits_stored)));
        obj.put(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(high_bit)));
        obj.put(DataElement::new(tags::PIXEL_DATA, VR::OB, PrimitiveValue::from(vec![0_u8; 4])));
        obj
    }

    #[test]
    fn twelve_bit_in_sixteen_is_accepted() {
        let obj = pixel_module(16, 12, 11);
        assert!(check_encoding_constraints(&obj, &EncodingConstraints::JPEG_LS).is_empty());
    }

    #[test]
    fn violations_are_all_reported() {
        let mut obj = pixel_module(32, 33, 5);
        obj.put(DataElement::new(
            tags::PLANAR_CONFIGURATION,
            VR::US,
            PrimitiveValue::from(1_u16),
        ));
        let problems = check_encoding_constraints(&obj, &EncodingConstraints::JPEG_LS);
        assert_eq!(problems.len(), 4, "{problems:?}");
    }

    #[test]
    fn baseline_needs_eight_bits() {
        let obj = pixel_module(16, 16, 15);
        assert_eq!(
            check_encoding_constraints(&obj, &EncodingConstraints::JPEG_BASELINE).len(),
            1
        );
    }
}
