//! Image relationships shared across parts.
//!
//! Images are keyed by a digest of their bytes. The first part to reference
//! an image stores the media and creates an image relationship; other parts
//! get a copy of that relationship under their own id; a part referencing the
//! same image again reuses its id.

use std::collections::{BTreeMap, HashMap};

use crate::content::Image;
use crate::document::Document;
use crate::error::RenderError;

/// Relationship ids per image digest and part.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    relationships: HashMap<String, BTreeMap<String, String>>,
}

impl ImageRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the image's bytes in the document without linking it.
    pub fn embed(document: &mut Document, image: &Image) -> String {
        document.store_media(image.name(), image.shared_data())
    }

    /// Relationship id under which `part` references `image`.
    ///
    /// # Errors
    ///
    /// Returns an error if the part is unknown.
    pub fn register(
        &mut self,
        document: &mut Document,
        part: &str,
        image: &Image,
    ) -> Result<String, RenderError> {
        let digest = image.digest();
        let known = self.relationships.entry(digest).or_default();
        if let Some(id) = known.get(part) {
            return Ok(id.clone());
        }

        let id = match known.iter().next() {
            Some((first_part, first_id)) => {
                let relationship = document
                    .find_relationship_by("Id", first_id, first_part)
                    .ok_or_else(|| RenderError::MissingRelationship {
                        part: first_part.clone(),
                        id: first_id.clone(),
                    })?;
                let attributes = relationship.attributes().to_vec();
                document.add_relationship(part, attributes)?
            }
            None => document.add_media(part, image.name(), image.shared_data())?,
        };

        tracing::debug!(image = image.name(), part, id = %id, "Registered image");
        known.insert(part.to_owned(), id.clone());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn document() -> Document {
        let mut document = Document::new("word/media");
        document.add_part("word/document.xml", "<w:document/>");
        document.add_part("word/header1.xml", "<w:hdr/>");
        document
    }

    #[test]
    fn test_same_part_reuses_id() {
        let mut document = document();
        let mut registry = ImageRegistry::new();
        let image = Image::new("a.png", vec![1_u8, 2, 3]);

        let first = registry.register(&mut document, "word/document.xml", &image).unwrap();
        let second = registry.register(&mut document, "word/document.xml", &image).unwrap();

        assert_eq!(first, second);
        assert_eq!(document.part("word/document.xml").unwrap().relationships().unwrap().len(), 1);
    }

    #[test]
    fn test_other_part_copies_relationship() {
        let mut document = document();
        let mut registry = ImageRegistry::new();
        let image = Image::new("a.png", vec![1_u8, 2, 3]);

        let body = registry.register(&mut document, "word/document.xml", &image).unwrap();
        let header = registry.register(&mut document, "word/header1.xml", &image).unwrap();

        assert_eq!((body.as_str(), header.as_str()), ("rId1", "rId1"));
        let copied = document
            .find_relationship_by("Id", &header, "word/header1.xml")
            .unwrap();
        assert_eq!(copied.attribute("Target"), Some("media/a.png"));
        assert_eq!(document.media().count(), 1);
    }

    #[test]
    fn test_same_bytes_under_other_name_share_media() {
        let mut document = document();
        let mut registry = ImageRegistry::new();

        registry
            .register(&mut document, "word/document.xml", &Image::new("a.png", vec![9_u8]))
            .unwrap();
        let id = registry
            .register(&mut document, "word/document.xml", &Image::new("b.png", vec![9_u8]))
            .unwrap();

        assert_eq!(id, "rId1");
        assert_eq!(document.media().count(), 1);
    }

    #[test]
    fn test_embed_then_register_stores_once() {
        let mut document = document();
        let mut registry = ImageRegistry::new();
        let image = Image::new("a.png", vec![1_u8]);

        assert_eq!(ImageRegistry::embed(&mut document, &image), "word/media/a.png");
        registry.register(&mut document, "word/document.xml", &image).unwrap();

        assert_eq!(document.media().count(), 1);
    }
}
