//! `stencil render` command implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use base64::Engine;
use clap::Args;
use serde_json::Value as Json;
use stencil_config::{CliSettings, Config};
use stencil_engine::{Context, Template};

use crate::error::CliError;
use crate::output::Output;
use crate::package::Package;

const IMAGE_PREFIX: &str = "image:";

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Directory of the extracted template package.
    template: PathBuf,

    /// JSON file holding the render context.
    #[arg(short = 'x', long, env = "STENCIL_CONTEXT")]
    context: PathBuf,

    /// Directory to write the rendered package to.
    #[arg(short, long)]
    output: PathBuf,

    /// Part name pattern to render (repeatable, overrides config).
    #[arg(long = "part", value_name = "PATTERN")]
    parts: Vec<String>,

    /// Media directory inside the package (overrides config).
    #[arg(long)]
    media_dir: Option<String>,

    /// Path to configuration file (default: auto-discover stencil.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, rendering or writing fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let start = Instant::now();

        let cli_settings = CliSettings {
            parts: (!self.parts.is_empty()).then(|| self.parts.clone()),
            media_dir: self.media_dir.clone(),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        if same_directory(&self.template, &self.output) {
            return Err(CliError::Validation(
                "output directory must differ from the template directory".to_owned(),
            ));
        }

        let package = Package::open(&self.template)?;
        let context = load_context(&self.context)?;
        let document = package.load_document(&config.render, &config.images.media_dir)?;

        let part_count = document.part_names().count();
        if part_count == 0 {
            output.warning(&format!(
                "No parts of {} match {}",
                self.template.display(),
                config.render.parts.join(", ")
            ));
        }
        output.info(&format!("Rendering {part_count} parts of {}...", self.template.display()));

        for name in document.part_names() {
            output.detail(&format!("  {name}"));
        }

        let rendered = Template::new(&config).render(document, context)?;
        let written = package.write(&rendered, &self.output)?;

        output.success(&format!(
            "Wrote {written} files to {} in {:.2}s",
            self.output.display(),
            start.elapsed().as_secs_f64()
        ));
        Ok(())
    }
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Read the context file, inlining image files given by `path`.
fn load_context(path: &Path) -> Result<Context, CliError> {
    let text = fs::read_to_string(path)?;
    let mut json: Json = serde_json::from_str(&text).map_err(|source| CliError::ContextFile {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    inline_image_files(&mut json, base)?;
    Ok(Context::from_json(json)?)
}

/// Replace `{"path": ...}` in image values with base64 `data`, resolving
/// paths against `base`.
fn inline_image_files(json: &mut Json, base: &Path) -> Result<(), CliError> {
    match json {
        Json::Object(map) => {
            for (key, value) in map.iter_mut() {
                if key.starts_with(IMAGE_PREFIX)
                    && let Json::Object(image) = value
                {
                    inline_image_file(key, image, base)?;
                } else {
                    inline_image_files(value, base)?;
                }
            }
        }
        Json::Array(items) => {
            for item in items {
                inline_image_files(item, base)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// The file name becomes the image name unless one is given.
fn inline_image_file(
    key: &str,
    image: &mut serde_json::Map<String, Json>,
    base: &Path,
) -> Result<(), CliError> {
    if image.contains_key("data") {
        return Ok(());
    }
    let Some(Json::String(relative)) = image.get("path") else {
        return Ok(());
    };

    let file = base.join(relative);
    let data = fs::read(&file).map_err(|source| CliError::ImageFile {
        key: key.to_owned(),
        path: file.clone(),
        source,
    })?;
    image.remove("path");
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    image.insert("data".to_owned(), Json::String(encoded));
    if !image.contains_key("name")
        && let Some(name) = file.file_name()
    {
        let name = name.to_string_lossy().into_owned();
        image.insert("name".to_owned(), Json::String(name));
    }
    tracing::debug!(key, path = %file.display(), "Inlined image file");
    Ok(())
}
