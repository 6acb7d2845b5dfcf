// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! PASCAL VOC XML annotation files (`<image>.xml`).

use crate::error::{AnnotationError, Result};
use crate::models::annotation::BBox;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Write;
use std::path::Path;

/// Value written to `source/database` and `owner/name`.
pub const TOOL_NAME: &str = "boxlabel";

/// One `<object>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct VocObject<'a> {
    pub name: &'a str,
    pub bbox: BBox,
    /// Detector score, written as an extra `<confidence>` element.
    pub confidence: Option<f32>,
}

/// Result of parsing a VOC file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VocDocument {
    pub size: Option<(u32, u32)>,
    pub objects: Vec<(String, BBox)>,
}

fn write_err(path: &Path, e: quick_xml::Error) -> AnnotationError {
    AnnotationError::io(path, std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn build_xml<'a>(
    image_path: &Path,
    image_size: (u32, u32),
    objects: impl IntoIterator<Item = VocObject<'a>>,
) -> quick_xml::Result<Vec<u8>> {
    let folder = image_path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let filename = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let full_path = image_path.display().to_string();

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("annotation")))?;
    write_text_element(&mut writer, "folder", &folder)?;
    write_text_element(&mut writer, "filename", &filename)?;

    writer.write_event(Event::Start(BytesStart::new("source")))?;
    write_text_element(&mut writer, "database", TOOL_NAME)?;
    write_text_element(&mut writer, "annotation", "PASCAL VOC")?;
    write_text_element(&mut writer, "path", &full_path)?;
    writer.write_event(Event::End(BytesEnd::new("source")))?;

    writer.write_event(Event::Start(BytesStart::new("owner")))?;
    write_text_element(&mut writer, "name", TOOL_NAME)?;
    writer.write_event(Event::End(BytesEnd::new("owner")))?;

    writer.write_event(Event::Start(BytesStart::new("size")))?;
    write_text_element(&mut writer, "width", &image_size.0.to_string())?;
    write_text_element(&mut writer, "height", &image_size.1.to_string())?;
    write_text_element(&mut writer, "depth", "3")?;
    writer.write_event(Event::End(BytesEnd::new("size")))?;

    write_text_element(&mut writer, "segmented", "0")?;

    for object in objects {
        writer.write_event(Event::Start(BytesStart::new("object")))?;
        write_text_element(&mut writer, "name", object.name)?;
        write_text_element(&mut writer, "pose", "Unspecified")?;
        write_text_element(&mut writer, "truncated", "0")?;
        write_text_element(&mut writer, "difficult", "0")?;
        if let Some(confidence) = object.confidence {
            write_text_element(&mut writer, "confidence", &format!("{:.4}", confidence))?;
        }
        writer.write_event(Event::Start(BytesStart::new("bndbox")))?;
        write_text_element(&mut writer, "xmin", &object.bbox.x1.to_string())?;
        write_text_element(&mut writer, "ymin", &object.bbox.y1.to_string())?;
        write_text_element(&mut writer, "xmax", &object.bbox.x2.to_string())?;
        write_text_element(&mut writer, "ymax", &object.bbox.y2.to_string())?;
        writer.write_event(Event::End(BytesEnd::new("bndbox")))?;
        writer.write_event(Event::End(BytesEnd::new("object")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("annotation")))?;
    Ok(writer.into_inner())
}

/// Render a VOC document for `image_path`.
pub fn encode<'a>(
    image_path: &Path,
    image_size: (u32, u32),
    objects: impl IntoIterator<Item = VocObject<'a>>,
) -> Result<String> {
    let bytes = build_xml(image_path, image_size, objects).map_err(|e| write_err(image_path, e))?;
    String::from_utf8(bytes).map_err(|_| AnnotationError::malformed(image_path, "invalid UTF-8 in XML"))
}

#[derive(Default)]
struct PendingObject {
    name: Option<String>,
    coords: [Option<f64>; 4],
    has_bndbox: bool,
}

impl PendingObject {
    fn finish(self, path: &Path, index: usize) -> Result<(String, BBox)> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AnnotationError::malformed(path, format!("object {} has no name", index)))?;
        if !self.has_bndbox {
            return Err(AnnotationError::malformed(
                path,
                format!("object {} ({}) has no bndbox", index, name),
            ));
        }
        let mut c = [0i32; 4];
        for (slot, value) in c.iter_mut().zip(self.coords) {
            let value = value.ok_or_else(|| {
                AnnotationError::malformed(path, format!("object {} ({}) has an incomplete bndbox", index, name))
            })?;
            *slot = value.round() as i32;
        }
        Ok((name, BBox::new(c[0], c[1], c[2], c[3])))
    }
}

fn parse_number(path: &Path, element: &str, text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AnnotationError::malformed(path, format!("<{}> is not a number: '{}'", element, text)))
}

/// Parse a VOC document. Coordinates may be integers or decimals; they are
/// rounded to the nearest pixel. `path` is only used for errors.
pub fn decode(text: &str, path: &Path) -> Result<VocDocument> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut doc = VocDocument::default();
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;
    let mut object: Option<PendingObject> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "annotation" if stack.is_empty() => saw_root = true,
                    "object" => object = Some(PendingObject::default()),
                    "bndbox" => {
                        if let Some(o) = object.as_mut() {
                            o.has_bndbox = true;
                        }
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.pop();
                if name == "object" {
                    if let Some(o) = object.take() {
                        let index = doc.objects.len() + 1;
                        doc.objects.push(o.finish(path, index)?);
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| AnnotationError::malformed(path, err.to_string()))?
                    .into_owned();
                let current = stack.last().map(String::as_str).unwrap_or("");
                let parent = stack.len().checked_sub(2).and_then(|i| stack.get(i)).map(String::as_str);
                match (parent, current) {
                    (Some("size"), "width") => width = Some(parse_number(path, current, &text)? as u32),
                    (Some("size"), "height") => height = Some(parse_number(path, current, &text)? as u32),
                    (Some("object"), "name") => {
                        if let Some(o) = object.as_mut() {
                            o.name = Some(text);
                        }
                    }
                    (Some("bndbox"), coord) => {
                        let slot = match coord {
                            "xmin" => Some(0),
                            "ymin" => Some(1),
                            "xmax" => Some(2),
                            "ymax" => Some(3),
                            _ => None,
                        };
                        if let (Some(slot), Some(o)) = (slot, object.as_mut()) {
                            o.coords[slot] = Some(parse_number(path, coord, &text)?);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AnnotationError::malformed(path, e.to_string())),
            _ => {}
        }
    }

    if !saw_root {
        return Err(AnnotationError::malformed(path, "missing <annotation> root"));
    }
    if let Some(open) = stack.last() {
        return Err(AnnotationError::malformed(path, format!("unclosed <{}>", open)));
    }
    if let (Some(w), Some(h)) = (width, height) {
        doc.size = Some((w, h));
    }
    Ok(doc)
}
