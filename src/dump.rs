//
// dump.rs
// Dicom-Archive-Tools
//
// Renders a DICOM dataset as text, one line per element in dataset order, for metadata dumps and content diffs.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use dicom::core::dictionary::DataDictionary;
use dicom::core::value::Value;
use dicom::core::{PrimitiveValue, Tag};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{open_file, InMemDicomObject};

/// Limits applied while rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub max_depth: usize,
    pub max_value_len: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            max_depth: 4,
            max_value_len: 64,
        }
    }
}

/// Print the rendered dataset to stdout.
pub fn dump_file(path: &Path, options: RenderOptions) -> Result<()> {
    let output = render_file(path, options)?;
    print!("{output}");
    Ok(())
}

pub fn render_file(path: &Path, options: RenderOptions) -> Result<String> {
    // Loading and rendering are separate so the text can feed both dumps and diffs.
    let obj = open_file(path).with_context(|| format!("Failed to open DICOM file {:?}", path))?;
    Ok(render_dataset(&obj, options))
}

/// The file meta group is not part of the output; only dataset elements are listed.
pub fn render_dataset(obj: &InMemDicomObject<StandardDataDictionary>, options: RenderOptions) -> String {
    let mut out = String::new();
    dump_object(obj, 0, &options, &mut out);
    out
}

fn dump_object(
    obj: &InMemDicomObject<StandardDataDictionary>,
    depth: usize,
    options: &RenderOptions,
    out: &mut String,
) {
    for elem in obj.iter() {
        // Collect all metadata needed to render the line.
        let tag = elem.header().tag;
        let vr = elem.header().vr;
        let name = tag_name(tag);
        let indent = "  ".repeat(depth);

        match elem.value() {
            Value::Primitive(p) => {
                // Primitive values can be long; only a preview is kept.
                let preview = preview_primitive(p, options.max_value_len);
                let _ = writeln!(
                    out,
                    "{}{} {} {} {}",
                    indent,
                    format_tag(tag),
                    name,
                    vr,
                    preview
                );
            }
            Value::Sequence(seq) => {
                let _ = writeln!(
                    out,
                    "{}{} {} {} [sequence: {} item(s)]",
                    indent,
                    format_tag(tag),
                    name,
                    vr,
                    seq.items().len()
                );
                // Items nest two levels deeper, up to max_depth.
                if depth < options.max_depth {
                    for (idx, item) in seq.items().iter().enumerate() {
                        let _ = writeln!(out, "{}  Item {}", indent, idx + 1);
                        dump_object(item, depth + 2, options, out);
                    }
                }
            }
            Value::PixelSequence(p) => {
                // Fragments are summarized, never printed.
                let total: usize = p.fragments().iter().map(|f| f.len()).sum();
                let _ = writeln!(
                    out,
                    "{}{} {} {} [encapsulated: {} fragment(s), {} bytes]",
                    indent,
                    format_tag(tag),
                    name,
                    vr,
                    p.fragments().len(),
                    total
                );
            }
        }
    }
}

fn preview_primitive(value: &PrimitiveValue, max_value_len: usize) -> String {
    let text = value.to_str();
    if !text.is_empty() {
        return truncate(&text, max_value_len);
    }

    // Binary values with no text form are shown by size.
    let bytes = value.to_bytes();
    format!("{} bytes", bytes.len())
}

fn truncate(input: &str, limit: usize) -> String {
    if input.chars().count() <= limit {
        input.to_string()
    } else {
        let mut truncated: String = input.chars().take(limit).collect();
        truncated.push('…');
        truncated
    }
}

fn format_tag(tag: Tag) -> String {
    format!("({:04X},{:04X})", tag.group(), tag.element())
}

fn tag_name(tag: Tag) -> String {
    StandardDataDictionary
        .by_tag(tag)
        .map(|e| e.alias.to_string())
        .unwrap_or_else(|| "UnknownTag".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::{DataElement, VR};
    use dicom::dictionary_std::tags;

    #[test]
    fn renders_one_line_per_element_in_tag_order() {
        let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
        obj.put(DataElement::new(
            tags::PATIENT_NAME,
            VR::PN,
            PrimitiveValue::from("Doe^Jane"),
        ));
        obj.put(DataElement::new(
            tags::MODALITY,
            VR::CS,
            PrimitiveValue::from("MG"),
        ));

        let text = render_dataset(&obj, RenderOptions::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "(0008,0060) Modality CS MG");
        assert_eq!(lines[1], "(0010,0010) PatientName PN Doe^Jane");
    }

    #[test]
    fn long_values_are_truncated_on_char_boundaries() {
        assert_eq!(truncate("ééééé", 3), "ééé…");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
