//! `stencil fields` command implementation.

use std::path::PathBuf;

use clap::Args;
use stencil_config::Config;
use stencil_engine::{Directive, TemplateError, merge_field_text};
use stencil_xml::{GrepVisitor, Pattern, XmlError, XmlNode, XmlParser, walk};

use crate::error::CliError;
use crate::output::Output;
use crate::package::Package;

/// Arguments for the fields command.
#[derive(Args)]
pub(crate) struct FieldsArgs {
    /// Directory of the extracted template package.
    template: PathBuf,

    /// Path to configuration file (default: auto-discover stencil.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl FieldsArgs {
    /// Execute the fields command.
    ///
    /// # Errors
    ///
    /// Returns an error if the package cannot be read or a part is malformed.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;
        let package = Package::open(&self.template)?;

        let mut total = 0;
        let mut invalid = 0;
        for name in package.names().filter(|name| config.render.matches_part(name)) {
            let directives = part_directives(&package.read(name)?)?;
            if directives.is_empty() {
                continue;
            }
            output.part(name);
            for (text, result) in &directives {
                let error = result.as_ref().err();
                if error.is_some() {
                    invalid += 1;
                }
                output.directive(text, error.map(|err| err as &dyn std::fmt::Display));
            }
            total += directives.len();
        }

        if invalid == 0 {
            output.success(&format!("\n{total} directives"));
        } else {
            output.warning(&format!("\n{total} directives, {invalid} invalid"));
        }
        Ok(())
    }
}

/// Merge-field directives of a part in document order, each with its parse
/// result.
fn part_directives(xml: &str) -> Result<Vec<(String, Result<Directive, TemplateError>)>, XmlError> {
    let document = XmlParser::new().parse(xml)?;
    let mut nodes = vec![XmlNode::Element(document.root)];
    let mut grep = GrepVisitor::new(Pattern::element("fldSimple").with_attribute("instr"));
    walk(&mut nodes, &mut grep);

    Ok(grep
        .result()
        .iter()
        .filter_map(XmlNode::as_element)
        .filter_map(|field| field.attr_local("instr"))
        .filter_map(merge_field_text)
        .map(|text| (text.to_owned(), Directive::parse(text)))
        .collect())
}
