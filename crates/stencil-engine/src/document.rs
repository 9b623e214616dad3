//! In-memory document package: XML parts, their relationships, and media.
//!
//! Reading and writing the zip container is left to callers; the engine only
//! needs part markup, relationship lists and the media it embeds.

use std::collections::BTreeMap;
use std::sync::Arc;

use stencil_xml::{Element, XmlDocument, XmlNode, XmlParser, XmlSerializer, max_attribute_value};

use crate::error::RenderError;

/// Relationship type of embedded images.
pub const IMAGE_RELATIONSHIP_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const RELATIONSHIPS_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// One relationship entry, attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    attributes: Vec<(String, String)>,
}

impl Relationship {
    #[must_use]
    pub fn new(attributes: Vec<(String, String)>) -> Self {
        Self { attributes }
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attribute("Id")
    }

    #[must_use]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }
}

/// An XML part and its relationships.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    source: String,
    rendered: Option<String>,
    relationships: Option<Vec<Relationship>>,
}

impl Part {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Markup as loaded, before rendering.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Rendered markup, or the source if the part was not rendered.
    #[must_use]
    pub fn xml(&self) -> &str {
        self.rendered.as_deref().unwrap_or(&self.source)
    }

    #[must_use]
    pub fn is_rendered(&self) -> bool {
        self.rendered.is_some()
    }

    /// Relationships of this part; `None` when it has no relationships file.
    #[must_use]
    pub fn relationships(&self) -> Option<&[Relationship]> {
        self.relationships.as_deref()
    }
}

/// Document package contents the engine reads and modifies.
#[derive(Debug, Clone, Default)]
pub struct Document {
    parts: BTreeMap<String, Part>,
    media: BTreeMap<String, Arc<[u8]>>,
    media_dir: String,
}

impl Document {
    /// Create an empty document storing new media under `media_dir`.
    #[must_use]
    pub fn new(media_dir: impl Into<String>) -> Self {
        Self {
            media_dir: media_dir.into().trim_end_matches('/').to_owned(),
            ..Self::default()
        }
    }

    /// Add an XML part.
    pub fn add_part(&mut self, name: impl Into<String>, xml: impl Into<String>) {
        let name = name.into();
        self.parts.insert(
            name.clone(),
            Part {
                name,
                source: xml.into(),
                rendered: None,
                relationships: None,
            },
        );
    }

    /// Attach a relationships file to an existing part.
    ///
    /// # Errors
    ///
    /// Returns an error if the part is unknown or the markup is malformed.
    pub fn load_relationships(&mut self, part: &str, xml: &str) -> Result<(), RenderError> {
        let document = XmlParser::new().parse(xml)?;
        let relationships = document
            .root
            .child_elements()
            .filter(|element| element.is("Relationship"))
            .map(|element| Relationship::new(element.attrs.clone()))
            .collect();
        self.part_mut(part)?.relationships = Some(relationships);
        Ok(())
    }

    #[must_use]
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.get(name)
    }

    fn part_mut(&mut self, name: &str) -> Result<&mut Part, RenderError> {
        self.parts
            .get_mut(name)
            .ok_or_else(|| RenderError::UnknownPart(name.to_owned()))
    }

    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Replace a part's markup with its rendered form.
    ///
    /// # Errors
    ///
    /// Returns an error if the part is unknown.
    pub fn set_rendered(&mut self, part: &str, xml: String) -> Result<(), RenderError> {
        self.part_mut(part)?.rendered = Some(xml);
        Ok(())
    }

    /// Largest numeric value of `attribute` on `element` in the part's
    /// original markup; 0 when none.
    ///
    /// # Errors
    ///
    /// Returns an error if the part is unknown or its markup is malformed.
    pub fn max_attribute_value(
        &self,
        part: &str,
        element: &str,
        attribute: &str,
    ) -> Result<u64, RenderError> {
        let part = self
            .part(part)
            .ok_or_else(|| RenderError::UnknownPart(part.to_owned()))?;
        Ok(max_attribute_value(&part.source, element, attribute)?)
    }

    /// Store a media payload and return its package path.
    ///
    /// Only the final component of `name` is used. The same bytes under the
    /// same name are stored once; a different payload with a taken name gets
    /// a numbered name.
    pub fn store_media(&mut self, name: &str, data: Arc<[u8]>) -> String {
        let name = media_file_name(name).unwrap_or("image");
        let (stem, extension) = match name.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
            _ => (name, None),
        };
        let mut counter = 0;
        loop {
            let file_name = match (counter, extension) {
                (0, _) => name.to_owned(),
                (n, Some(extension)) => format!("{stem}-{n}.{extension}"),
                (n, None) => format!("{stem}-{n}"),
            };
            let path = if self.media_dir.is_empty() {
                file_name
            } else {
                format!("{}/{file_name}", self.media_dir)
            };
            match self.media.get(&path) {
                Some(existing) if **existing == *data => return path,
                Some(_) => counter += 1,
                None => {
                    tracing::debug!(path = %path, bytes = data.len(), "Stored media");
                    self.media.insert(path.clone(), data);
                    return path;
                }
            }
        }
    }

    /// Store a media payload and link it from `part` with an image
    /// relationship. Returns the new relationship id.
    ///
    /// # Errors
    ///
    /// Returns an error if the part is unknown.
    pub fn add_media(
        &mut self,
        part: &str,
        name: &str,
        data: Arc<[u8]>,
    ) -> Result<String, RenderError> {
        if self.part(part).is_none() {
            return Err(RenderError::UnknownPart(part.to_owned()));
        }
        let path = self.store_media(name, data);
        let target = relative_target(part, &path);
        self.add_relationship(
            part,
            vec![
                ("Type".to_owned(), IMAGE_RELATIONSHIP_TYPE.to_owned()),
                ("Target".to_owned(), target),
            ],
        )
    }

    /// Add a relationship to `part` with a fresh id. An `Id` among
    /// `attributes` is replaced. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns an error if the part is unknown.
    pub fn add_relationship(
        &mut self,
        part: &str,
        attributes: Vec<(String, String)>,
    ) -> Result<String, RenderError> {
        let relationships = self.part_mut(part)?.relationships.get_or_insert_with(Vec::new);
        let id = next_relationship_id(relationships);

        let mut entry = vec![("Id".to_owned(), id.clone())];
        entry.extend(attributes.into_iter().filter(|(key, _)| key != "Id"));
        relationships.push(Relationship::new(entry));

        tracing::debug!(part, id = %id, "Added relationship");
        Ok(id)
    }

    /// First relationship of `part` whose `attribute` equals `value`.
    #[must_use]
    pub fn find_relationship_by(
        &self,
        attribute: &str,
        value: &str,
        part: &str,
    ) -> Option<&Relationship> {
        self.part(part)?
            .relationships()?
            .iter()
            .find(|relationship| relationship.attribute(attribute) == Some(value))
    }

    /// Stored media, keyed by package path.
    pub fn media(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.media.iter().map(|(path, data)| (path.as_str(), &**data))
    }

    /// Serialized relationships file of `part`, if it has relationships.
    #[must_use]
    pub fn relationships_xml(&self, part: &str) -> Option<String> {
        let relationships = self.part(part)?.relationships()?;
        let mut root = Element::new("Relationships").with_attr("xmlns", RELATIONSHIPS_NAMESPACE);
        for relationship in relationships {
            let mut element = Element::new("Relationship");
            element.attrs = relationship.attributes.clone();
            root.children.push(element.into());
        }
        Some(XmlSerializer::new().serialize(&XmlDocument {
            declaration: true,
            root,
        }))
    }

    /// Add `Default` content types for the extensions of stored media that
    /// `content_types_xml` does not declare yet.
    ///
    /// # Errors
    ///
    /// Returns an error if `content_types_xml` is malformed.
    pub fn update_content_types(&self, content_types_xml: &str) -> Result<String, RenderError> {
        let mut document = XmlParser::new().parse(content_types_xml)?;
        let declared: Vec<String> = document
            .root
            .child_elements()
            .filter(|element| element.is("Default"))
            .filter_map(|element| element.attr("Extension"))
            .map(str::to_ascii_lowercase)
            .collect();

        let mut missing: Vec<String> = self
            .media
            .keys()
            .filter_map(|path| path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()))
            .filter(|ext| !declared.contains(ext))
            .collect();
        missing.sort();
        missing.dedup();

        for (offset, extension) in missing.into_iter().enumerate() {
            let content_type = image_content_type(&extension);
            let element = Element::new("Default")
                .with_attr("Extension", extension)
                .with_attr("ContentType", content_type);
            document.root.children.insert(offset, XmlNode::Element(element));
        }
        Ok(XmlSerializer::new().serialize(&document))
    }
}

/// Final path component of `name`, or `None` if it names no file.
#[must_use]
pub fn media_file_name(name: &str) -> Option<&str> {
    let file_name = name.rsplit(['/', '\\']).next()?.trim();
    match file_name {
        "" | "." | ".." => None,
        file_name => Some(file_name),
    }
}

/// Path of a part's relationships file: `word/_rels/document.xml.rels`.
#[must_use]
pub fn relationships_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Relationship target for `path`, relative to the directory of `part`.
fn relative_target(part: &str, path: &str) -> String {
    let part_dir = part.rsplit_once('/').map_or("", |(dir, _)| dir);
    if part_dir.is_empty() {
        return path.to_owned();
    }
    path.strip_prefix(part_dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .map_or_else(|| format!("/{path}"), str::to_owned)
}

fn next_relationship_id(relationships: &[Relationship]) -> String {
    let max = relationships
        .iter()
        .filter_map(Relationship::id)
        .filter_map(|id| id.strip_prefix("rId")?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

fn image_content_type(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        _ => "application/octet-stream",
    }
}
