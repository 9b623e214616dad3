//! Evaluation environment: variable scope plus per-render session state.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use stencil_config::RenderConfig;
use stencil_xml::XmlNode;

use crate::content::Image;
use crate::context::Context;
use crate::document::Document;
use crate::error::RenderError;
use crate::expression::Lookup;
use crate::images::ImageRegistry;
use crate::unique_ids::UniqueIds;
use crate::value::Value;

/// Immutable chain of variable bindings over a root context.
///
/// Adding a binding creates a child scope; the parent stays untouched, so
/// each loop iteration sees only its own item.
#[derive(Debug, Clone)]
pub struct Scope(Rc<Frame>);

#[derive(Debug)]
enum Frame {
    Root(Context),
    Binding {
        name: String,
        value: Value,
        parent: Scope,
    },
}

impl Scope {
    #[must_use]
    pub fn new(context: Context) -> Self {
        Self(Rc::new(Frame::Root(context)))
    }

    /// Child scope binding `name` to `value`.
    #[must_use]
    pub fn bind(&self, name: impl Into<String>, value: Value) -> Self {
        Self(Rc::new(Frame::Binding {
            name: name.into(),
            value,
            parent: self.clone(),
        }))
    }
}

impl Lookup for Scope {
    fn lookup(&self, name: &str) -> Option<&Value> {
        let mut frame = &*self.0;
        loop {
            match frame {
                Frame::Root(context) => return context.get(name),
                Frame::Binding {
                    name: bound,
                    value,
                    parent,
                } => {
                    if bound == name {
                        return Some(value);
                    }
                    frame = &*parent.0;
                }
            }
        }
    }
}

/// State shared by everything rendered in one [`crate::Template::render`]
/// call.
#[derive(Debug)]
pub struct Session {
    document: RefCell<Document>,
    unique_ids: RefCell<UniqueIds>,
    images: RefCell<ImageRegistry>,
}

impl Session {
    #[must_use]
    pub fn new(document: Document, config: &RenderConfig) -> Self {
        Self {
            document: RefCell::new(document),
            unique_ids: RefCell::new(UniqueIds::new(config.unique_ids.clone())),
            images: RefCell::new(ImageRegistry::new()),
        }
    }

    pub fn document(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.document.borrow_mut()
    }

    /// Renumber identifiers in fragments produced for `part`.
    ///
    /// # Errors
    ///
    /// Returns an error if the part is unknown or its markup is malformed.
    pub fn renumber(&self, part: &str, fragments: &mut [XmlNode]) -> Result<usize, RenderError> {
        let document = self.document.borrow();
        self.unique_ids
            .borrow_mut()
            .renumber(&document, part, fragments)
    }

    /// Store an image's bytes without linking it from any part.
    pub fn embed_image(&self, image: &Image) -> String {
        ImageRegistry::embed(&mut self.document.borrow_mut(), image)
    }

    /// Relationship id of `image` within `part`.
    ///
    /// # Errors
    ///
    /// Returns an error if the part is unknown.
    pub fn register_image(&self, part: &str, image: &Image) -> Result<String, RenderError> {
        self.images
            .borrow_mut()
            .register(&mut self.document.borrow_mut(), part, image)
    }

    #[must_use]
    pub fn into_document(self) -> Document {
        self.document.into_inner()
    }
}

/// What a directive sees while it is evaluated: variables in scope, the
/// render session, and the part being rendered.
#[derive(Debug, Clone)]
pub struct Environment<'s> {
    scope: Scope,
    session: &'s Session,
    part: Rc<str>,
}

impl<'s> Environment<'s> {
    #[must_use]
    pub fn new(session: &'s Session, scope: Scope, part: &str) -> Self {
        Self {
            scope,
            session,
            part: Rc::from(part),
        }
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn session(&self) -> &'s Session {
        self.session
    }

    #[must_use]
    pub fn current_part(&self) -> &str {
        &self.part
    }

    /// Environment with `name` bound to `value`; everything else is shared.
    #[must_use]
    pub fn alter_context(&self, name: &str, value: Value) -> Self {
        Self {
            scope: self.scope.bind(name, value),
            session: self.session,
            part: Rc::clone(&self.part),
        }
    }
}

impl Lookup for Environment<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.scope.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_binding_shadows_root() {
        let root = Scope::new(Context::new().with("item", "root").with("title", "T"));
        let inner = root.bind("item", Value::from("loop"));

        assert_eq!(inner.lookup("item"), Some(&Value::from("loop")));
        assert_eq!(inner.lookup("title"), Some(&Value::from("T")));
        assert_eq!(root.lookup("item"), Some(&Value::from("root")));
        assert_eq!(inner.lookup("missing"), None);
    }

    #[test]
    fn test_alter_context_leaves_original_untouched() {
        let session = Session::new(Document::new("word/media"), &RenderConfig::default());
        let env = Environment::new(&session, Scope::new(Context::new()), "word/document.xml");

        let altered = env.alter_context("person", Value::from("Ann"));

        assert_eq!(altered.lookup("person"), Some(&Value::from("Ann")));
        assert_eq!(env.lookup("person"), None);
        assert_eq!(altered.current_part(), "word/document.xml");
    }
}
