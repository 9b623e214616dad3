//! Extracted docx packages on disk.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use stencil_config::RenderConfig;
use stencil_engine::{Document, relationships_path};

use crate::error::CliError;

const CONTENT_TYPES: &str = "[Content_Types].xml";

/// Files of an extracted package, keyed by package path.
pub(crate) struct Package {
    files: Vec<(String, PathBuf)>,
}

impl Package {
    /// Scan the package rooted at `root`.
    pub(crate) fn open(root: &Path) -> Result<Self, CliError> {
        if !root.is_dir() {
            return Err(CliError::Validation(format!(
                "{} is not an extracted package directory",
                root.display()
            )));
        }
        let mut files = Vec::new();
        walk_dir(root, root, &mut files)?;
        files.sort();
        Ok(Self { files })
    }

    /// Package paths in name order.
    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(name, _)| name.as_str())
    }

    fn path_of(&self, name: &str) -> Option<&Path> {
        self.files
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, path)| path.as_path())
    }

    pub(crate) fn read(&self, name: &str) -> Result<String, CliError> {
        let path = self.path_of(name).ok_or_else(|| {
            CliError::Validation(format!("{name} is not part of the package"))
        })?;
        Ok(fs::read_to_string(path)?)
    }

    /// Document holding the parts selected by `render`, with their
    /// relationships.
    pub(crate) fn load_document(
        &self,
        render: &RenderConfig,
        media_dir: &str,
    ) -> Result<Document, CliError> {
        let mut document = Document::new(media_dir);
        for (name, path) in &self.files {
            if !render.matches_part(name) {
                continue;
            }
            document.add_part(name.clone(), fs::read_to_string(path)?);
            if let Some(rels) = self.path_of(&relationships_path(name)) {
                document.load_relationships(name, &fs::read_to_string(rels)?)?;
            }
            tracing::debug!(part = %name, "Loaded part");
        }
        Ok(document)
    }

    /// Write `document` into `output`, copying every file it did not change.
    ///
    /// Returns the number of files written.
    pub(crate) fn write(&self, document: &Document, output: &Path) -> Result<usize, CliError> {
        let mut written = BTreeSet::new();

        for part in document.parts() {
            write_file(output, part.name(), part.xml().as_bytes())?;
            written.insert(part.name().to_owned());
            if let Some(xml) = document.relationships_xml(part.name()) {
                let rels = relationships_path(part.name());
                write_file(output, &rels, xml.as_bytes())?;
                written.insert(rels);
            }
        }
        for (path, data) in document.media() {
            write_file(output, path, data)?;
            written.insert(path.to_owned());
        }

        for (name, source) in &self.files {
            if written.contains(name) {
                continue;
            }
            if name == CONTENT_TYPES {
                let xml = document.update_content_types(&fs::read_to_string(source)?)?;
                write_file(output, name, xml.as_bytes())?;
            } else {
                let target = target_path(output, name)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(source, target)?;
            }
            written.insert(name.clone());
        }

        Ok(written.len())
    }
}

fn write_file(output: &Path, name: &str, data: &[u8]) -> Result<(), CliError> {
    let target = target_path(output, name)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(fs::write(target, data)?)
}

/// `output` joined with the package path `name`, which must stay inside it.
fn target_path(output: &Path, name: &str) -> Result<PathBuf, CliError> {
    let relative = Path::new(name);
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(CliError::Validation(format!(
            "package path {name} leaves the output directory"
        )));
    }
    Ok(output.join(relative))
}

fn walk_dir(
    base: &Path,
    current: &Path,
    files: &mut Vec<(String, PathBuf)>,
) -> Result<(), io::Error> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_dir(base, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(base) {
            let relative = relative.to_string_lossy().replace('\\', "/");
            files.push((relative, path));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stencil_engine::{Context, Image, Template};
    use tempfile::TempDir;

    const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

    fn create_package() -> TempDir {
        let dir = TempDir::new().unwrap();
        let files = [
            (CONTENT_TYPES, CONTENT_TYPES_XML),
            ("word/document.xml", "<w:document><w:body/></w:document>"),
            ("word/styles.xml", "<w:styles/>"),
            ("docProps/core.xml", "<cp:coreProperties/>"),
        ];
        for (name, content) in files {
            write_file(dir.path(), name, content.as_bytes()).unwrap();
        }
        dir
    }

    #[test]
    fn test_open_lists_files_in_order() {
        let dir = create_package();

        let package = Package::open(dir.path()).unwrap();

        assert_eq!(
            package.names().collect::<Vec<_>>(),
            vec![
                "[Content_Types].xml",
                "docProps/core.xml",
                "word/document.xml",
                "word/styles.xml"
            ]
        );
    }

    #[test]
    fn test_open_rejects_file() {
        let dir = create_package();

        let result = Package::open(&dir.path().join("word/document.xml"));

        assert!(matches!(result, Err(CliError::Validation(_))));
    }

    #[test]
    fn test_load_document_selects_parts() {
        let dir = create_package();
        write_file(
            dir.path(),
            "word/_rels/document.xml.rels",
            br#"<Relationships><Relationship Id="rId3" Type="t" Target="styles.xml"/></Relationships>"#,
        )
        .unwrap();
        let package = Package::open(dir.path()).unwrap();

        let document = package
            .load_document(&RenderConfig::default(), "word/media")
            .unwrap();

        assert_eq!(document.part_names().collect::<Vec<_>>(), vec!["word/document.xml"]);
        let part = document.part("word/document.xml").unwrap();
        assert_eq!(part.relationships().unwrap()[0].id(), Some("rId3"));
    }

    #[test]
    fn test_target_path_stays_inside_output() {
        let output = TempDir::new().unwrap();

        assert_eq!(
            target_path(output.path(), "word/media/a.png").unwrap(),
            output.path().join("word/media/a.png")
        );
        for name in ["../outside.png", "word/../../x.png", "/etc/passwd", "./a.png"] {
            let result = target_path(output.path(), name);
            assert!(matches!(result, Err(CliError::Validation(_))), "{name}");
        }
        assert!(write_file(output.path(), "../outside.png", b"x").is_err());
        assert!(!output.path().parent().unwrap().join("outside.png").exists());
    }

    #[test]
    fn test_write_copies_and_adds_media() {
        let dir = create_package();
        let package = Package::open(dir.path()).unwrap();
        let mut document = package
            .load_document(&RenderConfig::default(), "word/media")
            .unwrap();
        let image = Image::new("logo.png", vec![1_u8, 2, 3]);
        document.add_media("word/document.xml", image.name(), image.shared_data()).unwrap();
        let rendered = Template::default().render(document, Context::new()).unwrap();
        let output = TempDir::new().unwrap();

        let written = package.write(&rendered, output.path()).unwrap();

        assert_eq!(written, 6);
        assert_eq!(fs::read(output.path().join("word/media/logo.png")).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            fs::read_to_string(output.path().join("word/styles.xml")).unwrap(),
            "<w:styles/>"
        );
        let rels = fs::read_to_string(output.path().join("word/_rels/document.xml.rels")).unwrap();
        assert!(rels.contains(r#"Target="media/logo.png""#));
        let content_types =
            fs::read_to_string(output.path().join(CONTENT_TYPES)).unwrap();
        assert!(content_types.contains(r#"Extension="png""#));
    }
}
