//! PDF toolkit: page counting, concatenation with outline entries, internal
//! link annotations and crash-safe writes.

use crate::error::{Error, Result};
use crate::geometry::PdfRect;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat, dictionary};
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Number of pages in an in-memory PDF
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    Ok(Document::load_mem(bytes)?.get_pages().len())
}

/// One bookmark in the merged document
#[derive(Debug, Clone)]
pub struct OutlineEntry {
    pub title: String,
    /// Absolute 0-based page index in the merged document
    pub page_index: usize,
    /// Named destination for the same page
    pub dest_name: String,
}

/// Concatenates documents page by page and records outline entries
pub struct PdfMerger {
    document: Document,
    pages: Vec<ObjectId>,
    outline: Vec<OutlineEntry>,
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfMerger {
    pub fn new() -> Self {
        Self {
            document: Document::with_version("1.7"),
            pages: Vec::new(),
            outline: Vec::new(),
        }
    }

    /// Pages appended so far
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Appends every page of `source`, optionally bookmarking its first page.
    /// Returns the index of the first appended page.
    pub fn append(&mut self, mut source: Document, outline: Option<(&str, &str)>) -> Result<usize> {
        let first_index = self.pages.len();

        source.renumber_objects_with(self.document.max_id + 1);
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        if source_pages.is_empty() {
            return Err(Error::Pdf(lopdf::Error::PageNumberNotFound(1)));
        }

        for &page_id in &source_pages {
            flatten_inherited(&mut source, page_id);
        }

        self.document.max_id = self.document.max_id.max(source.max_id);
        for (id, object) in source.objects {
            if is_structural(&object) {
                continue;
            }
            self.document.objects.insert(id, object);
        }
        self.pages.extend(source_pages);

        if let Some((title, dest_name)) = outline {
            self.outline.push(OutlineEntry {
                title: title.to_string(),
                page_index: first_index,
                dest_name: dest_name.to_string(),
            });
        }
        Ok(first_index)
    }

    /// Builds the page tree, outline and named destinations
    pub fn finish(mut self) -> Result<Document> {
        let pages_id = self.document.new_object_id();
        for &page_id in &self.pages {
            let page = self.document.get_object_mut(page_id)?.as_dict_mut()?;
            page.set("Parent", Object::Reference(pages_id));
        }

        let kids: Vec<Object> = self.pages.iter().map(|&id| Object::Reference(id)).collect();
        self.document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(self.pages.len() as i64),
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        };

        if !self.outline.is_empty() {
            let outlines_id = self.build_outline()?;
            catalog.set("Outlines", Object::Reference(outlines_id));
            catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
            catalog.set("Names", Object::Dictionary(self.named_destinations()?));
        }

        let catalog_id = self.document.add_object(catalog);
        self.document.trailer.set("Root", Object::Reference(catalog_id));
        Ok(self.document)
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or(Error::Pdf(lopdf::Error::PageNumberNotFound(index as u32 + 1)))
    }

    fn build_outline(&mut self) -> Result<ObjectId> {
        let outlines_id = self.document.new_object_id();
        let item_ids: Vec<ObjectId> = self
            .outline
            .iter()
            .map(|_| self.document.new_object_id())
            .collect();

        for (i, entry) in self.outline.iter().enumerate() {
            let page_id = self.page_id(entry.page_index)?;
            let mut item = dictionary! {
                "Title" => text_string(&entry.title),
                "Parent" => Object::Reference(outlines_id),
                "Dest" => fit_destination(page_id),
                "C" => vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)],
            };
            if i > 0 {
                item.set("Prev", Object::Reference(item_ids[i - 1]));
            }
            if i + 1 < item_ids.len() {
                item.set("Next", Object::Reference(item_ids[i + 1]));
            }
            self.document
                .objects
                .insert(item_ids[i], Object::Dictionary(item));
        }

        self.document.objects.insert(
            outlines_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => Object::Reference(item_ids[0]),
                "Last" => Object::Reference(item_ids[item_ids.len() - 1]),
                "Count" => Object::Integer(item_ids.len() as i64),
            }),
        );
        Ok(outlines_id)
    }

    fn named_destinations(&self) -> Result<Dictionary> {
        // name trees must be sorted by key
        let mut sorted: BTreeMap<&str, ObjectId> = BTreeMap::new();
        for entry in &self.outline {
            sorted.insert(entry.dest_name.as_str(), self.page_id(entry.page_index)?);
        }

        let mut names = Vec::with_capacity(sorted.len() * 2);
        for (name, page_id) in sorted {
            names.push(Object::string_literal(name));
            names.push(fit_destination(page_id));
        }

        Ok(dictionary! {
            "Dests" => dictionary! { "Names" => names },
        })
    }
}

/// Adds a borderless link on `source_page` jumping to `dest_page` (both 0-based)
pub fn add_internal_link(
    document: &mut Document,
    source_page: usize,
    rect: PdfRect,
    dest_page: usize,
) -> Result<()> {
    let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
    let source_id = *pages
        .get(source_page)
        .ok_or(lopdf::Error::PageNumberNotFound(source_page as u32 + 1))?;
    let dest_id = *pages
        .get(dest_page)
        .ok_or(lopdf::Error::PageNumberNotFound(dest_page as u32 + 1))?;

    let [x1, y1, x2, y2] = rect.as_array();
    let annotation_id = document.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => [x1, y1, x2, y2]
            .iter()
            .map(|&v| Object::Real(v as f32))
            .collect::<Vec<_>>(),
        "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
        "Dest" => fit_destination(dest_id),
    });

    let existing = document.get_dictionary(source_id)?.get(b"Annots").ok().cloned();
    match existing {
        Some(Object::Reference(array_id)) => {
            document
                .get_object_mut(array_id)?
                .as_array_mut()?
                .push(Object::Reference(annotation_id));
        }
        Some(Object::Array(mut annotations)) => {
            annotations.push(Object::Reference(annotation_id));
            document
                .get_dictionary_mut(source_id)?
                .set("Annots", Object::Array(annotations));
        }
        _ => {
            document
                .get_dictionary_mut(source_id)?
                .set("Annots", vec![Object::Reference(annotation_id)]);
        }
    }
    Ok(())
}

/// Writes through a temporary file in the destination's directory and renames
/// it over `path`, so `path` only ever holds a complete file.
pub fn replace_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Persist {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// Saves `document` to `path` via [`replace_atomically`]
pub fn save_atomically(document: &mut Document, path: &Path) -> Result<()> {
    replace_atomically(path, |mut out| {
        document.save_to(&mut out)?;
        Ok(())
    })
}

/// Opens a PDF from disk
pub fn open(path: &Path) -> Result<Document> {
    Ok(Document::load(path)?)
}

fn fit_destination(page_id: ObjectId) -> Object {
    Object::Array(vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())])
}

/// PDF text string: literal for ASCII, UTF-16BE with BOM otherwise
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::string_literal(text)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

fn is_structural(object: &Object) -> bool {
    let Ok(dict) = object.as_dict() else {
        return false;
    };
    matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Catalog") | Ok(b"Pages") | Ok(b"Outlines")
    )
}

/// Copies attributes a page inherits from its page-tree ancestors onto the
/// page itself, since those ancestors are not carried into the merged tree.
fn flatten_inherited(document: &mut Document, page_id: ObjectId) {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();
    let Ok(page) = document.get_dictionary(page_id) else {
        return;
    };

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut hops = 0;
    while let Some(parent_id) = parent {
        let Ok(node) = document.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            if page.has(key) || inherited.iter().any(|(k, _)| *k == key) {
                continue;
            }
            if let Ok(value) = node.get(key) {
                inherited.push((key, value.clone()));
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        hops += 1;
        if hops > 64 {
            break;
        }
    }

    if let Ok(page) = document.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}
