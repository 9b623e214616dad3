//! Rendering a whole document.

use std::time::Instant;

use stencil_config::{Config, RenderConfig};
use stencil_xml::{XmlParser, XmlSerializer};

use crate::context::Context;
use crate::document::Document;
use crate::environment::{Environment, Scope, Session};
use crate::error::RenderError;
use crate::processor;

/// Renders the configured parts of a [`Document`] against a [`Context`].
///
/// A template holds no per-render state, so one instance can render any
/// number of documents.
#[derive(Debug, Clone, Default)]
pub struct Template {
    render: RenderConfig,
}

impl Template {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            render: config.render.clone(),
        }
    }

    #[must_use]
    pub fn with_render_config(render: RenderConfig) -> Self {
        Self { render }
    }

    /// Render every configured part of `document`, in part name order.
    ///
    /// Images anywhere in the context are stored in the document first, so
    /// they ship with it even when no directive references them.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while rendering; part-level errors
    /// name the part.
    pub fn render(&self, document: Document, context: Context) -> Result<Document, RenderError> {
        let start = Instant::now();
        let context = context.normalize()?;
        let images = context.images();

        let parts: Vec<String> = document
            .part_names()
            .filter(|name| self.render.matches_part(name))
            .map(str::to_owned)
            .collect();

        let session = Session::new(document, &self.render);
        for image in &images {
            let path = session.embed_image(image);
            tracing::debug!(image = image.name(), path = %path, "Embedded context image");
        }

        let scope = Scope::new(context);
        for part in &parts {
            render_part(&session, &scope, part).map_err(|source| RenderError::Part {
                part: part.clone(),
                source: Box::new(source),
            })?;
        }

        tracing::info!(
            parts = parts.len(),
            images = images.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Rendered document"
        );
        Ok(session.into_document())
    }
}

fn render_part(session: &Session, scope: &Scope, part: &str) -> Result<(), RenderError> {
    let source = session
        .document()
        .part(part)
        .map(|part| part.source().to_owned())
        .ok_or_else(|| RenderError::UnknownPart(part.to_owned()))?;

    let mut xml = XmlParser::new().parse(&source)?;
    let env = Environment::new(session, scope.clone(), part);
    let children = std::mem::take(&mut xml.root.children);
    xml.root.children = processor::render_nodes(children, &env)?;

    let rendered = XmlSerializer::new().serialize(&xml);
    tracing::info!(part, bytes = rendered.len(), "Rendered part");
    session.document_mut().set_rendered(part, rendered)
}
