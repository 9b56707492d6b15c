//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the documentation site: loading configuration
//! ([`crate::config`]), reading sources ([`crate::source`]), grouping them
//! into collections ([`crate::collections`]), rendering templates embedded in
//! the sources, converting Markdown ([`crate::markdown`]), applying layouts
//! ([`crate::template`]), writing the result into the scratch directory, and
//! publishing it ([`crate::publish`]).
//!
//! Nothing is written until every file has rendered, so a failed build
//! leaves the publish directory untouched.

use crate::collections::{entry_value, Collections};
use crate::config::{Config, Error as ConfigError, SiteData};
use crate::helpers::RenderContext;
use crate::markdown::{self, Error as MarkdownError};
use crate::publish::{publish, rmdir, Error as PublishError, Published};
use crate::source::{read_sources, Contents, Error as SourceError, SourceFile};
use crate::template::{Error as TemplateError, Layouts, Partials};
use crate::value::from_json_map;
use gtmpl::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Builds and publishes the site described by `config`.
pub fn build_site(config: &Config) -> Result<Published> {
    let data = SiteData::load(config)?;
    tracing::info!(
        collections = data.toc.len(),
        source = %config.source_directory.display(),
        "Loaded configuration"
    );

    let files = render_site(config, &data)?;

    // Clear out whatever a failed publish left behind.
    rmdir(&config.build_directory)?;
    write_files(&config.build_directory, &files)?;
    tracing::info!(
        files = files.len(),
        directory = %config.build_directory.display(),
        "Wrote build"
    );

    Ok(publish(&config.build_directory, &config.target_directory)?)
}

/// Runs the rendering pipeline in memory and returns the output files, with
/// paths relative to the output directory.
pub fn render_site(config: &Config, data: &SiteData) -> Result<Vec<SourceFile>> {
    let mut files = read_sources(&config.source_directory, &config.ignore)?;
    tracing::info!(files = files.len(), "Read sources");

    let collections = Collections::build(&data.toc, &files);
    let partials = Partials::load(&config.partials_directory)?;
    let ctx = RenderContext::new();

    precompile(&ctx, &partials, data, &collections, &mut files)?;
    convert_markdown(&mut files)?;

    let mut layouts = Layouts::new(&config.templates_directory, &partials);
    apply_layouts(
        &ctx,
        &mut layouts,
        config.default_layout.as_deref(),
        data,
        &collections,
        &mut files,
    )?;
    Ok(files)
}

/// The data every template sees: `defaults`, `pkg`, `collections`, and each
/// collection under its own name.
fn global_data(data: &SiteData, collections: HashMap<String, Value>) -> HashMap<String, Value> {
    let mut m: HashMap<String, Value> = collections
        .iter()
        .map(|(name, entries)| (name.clone(), entries.clone()))
        .collect();
    m.insert("collections".to_owned(), Value::Map(collections));
    m.insert("defaults".to_owned(), from_json_map(&data.defaults));
    m.insert("pkg".to_owned(), from_json_map(&data.pkg));
    m
}

/// The data for rendering file `index`: the global data overlaid with the
/// file's own entry.
fn file_data(
    global: &HashMap<String, Value>,
    files: &[SourceFile],
    index: usize,
    collections: &Collections,
) -> Value {
    let mut m = global.clone();
    if let Value::Map(entry) = entry_value(files, index, collections) {
        m.extend(entry);
    }
    Value::Map(m)
}

/// Renders the templates embedded in each text file's body.
fn precompile(
    ctx: &RenderContext,
    partials: &Partials,
    data: &SiteData,
    collections: &Collections,
    files: &mut [SourceFile],
) -> Result<()> {
    let global = global_data(data, collections.to_values(files));
    for index in 0..files.len() {
        let body = match &files[index].contents {
            // Without an action there is nothing to render.
            Contents::Text(body) if body.contains("{{") => body,
            _ => continue,
        };
        let path = files[index].path.clone();
        tracing::debug!(path = %path.display(), "Precompiling");
        let template = partials.compile(body).map_err(|err| Error::Template {
            path: path.clone(),
            err,
        })?;
        let rendered = ctx
            .render(&template, file_data(&global, files, index, collections))
            .map_err(|err| Error::Template { path, err })?;
        files[index].contents = Contents::Text(rendered);
    }
    Ok(())
}

/// Converts every Markdown file to HTML and renames it to `.html`.
fn convert_markdown(files: &mut [SourceFile]) -> Result<()> {
    let mut converted = 0;
    for file in files.iter_mut().filter(|f| f.is_markdown()) {
        if let Contents::Text(text) = &file.contents {
            let html = markdown::to_html(text).map_err(|err| Error::Markdown {
                path: file.path.clone(),
                err,
            })?;
            file.contents = Contents::Text(html);
            file.path.set_extension("html");
            converted += 1;
        }
    }
    tracing::info!(converted, "Converted markdown");
    Ok(())
}

/// Renders each file that has a layout through it. The file's HTML is
/// available to the layout as `.contents`.
fn apply_layouts(
    ctx: &RenderContext,
    layouts: &mut Layouts,
    default_layout: Option<&str>,
    data: &SiteData,
    collections: &Collections,
    files: &mut [SourceFile],
) -> Result<()> {
    let global = global_data(data, collections.to_values(files));
    let mut applied = 0;
    for index in 0..files.len() {
        if let Contents::Binary(_) = files[index].contents {
            continue;
        }
        let layout = match files[index].field("layout").and_then(|l| l.as_str()) {
            Some(layout) => layout.to_owned(),
            None => match default_layout {
                Some(layout) => layout.to_owned(),
                None => continue,
            },
        };

        let path = files[index].path.clone();
        tracing::debug!(path = %path.display(), layout = %layout, "Applying layout");
        let template = layouts.get(&layout)?;
        let rendered = ctx
            .render(template, file_data(&global, files, index, collections))
            .map_err(|err| Error::Template { path, err })?;
        files[index].contents = Contents::Text(rendered);
        applied += 1;
    }
    tracing::info!(applied, "Applied layouts");
    Ok(())
}

/// Writes every file under `directory`.
fn write_files(directory: &Path, files: &[SourceFile]) -> Result<()> {
    let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
    for file in files {
        let path = directory.join(&file.path);
        if let Some(dir) = path.parent() {
            if seen_dirs.insert(dir.to_owned()) {
                std::fs::create_dir_all(dir).map_err(|err| Error::Write {
                    path: dir.to_owned(),
                    err,
                })?;
            }
        }
        let bytes: &[u8] = match &file.contents {
            Contents::Text(text) => text.as_bytes(),
            Contents::Binary(bytes) => bytes,
        };
        std::fs::write(&path, bytes).map_err(|err| Error::Write { path, err })?;
    }
    Ok(())
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during configuration,
/// reading sources, templating, Markdown conversion, writing, and
/// publishing.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors loading configuration.
    Config(ConfigError),

    /// Returned for errors reading source files.
    Source(SourceError),

    /// Returned for errors loading partials and layouts.
    LoadTemplate(TemplateError),

    /// Returned for errors parsing or executing a file's template.
    Template { path: PathBuf, err: String },

    /// Returned for errors converting a file's Markdown.
    Markdown { path: PathBuf, err: MarkdownError },

    /// Returned for I/O problems while writing the scratch directory.
    Write { path: PathBuf, err: std::io::Error },

    /// Returned for errors publishing the build.
    Publish(PublishError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(err) => err.fmt(f),
            Error::Source(err) => err.fmt(f),
            Error::LoadTemplate(err) => err.fmt(f),
            Error::Template { path, err } => {
                write!(f, "Rendering '{}': {}", path.display(), err)
            }
            Error::Markdown { path, err } => {
                write!(f, "Converting '{}': {}", path.display(), err)
            }
            Error::Write { path, err } => {
                write!(f, "Writing '{}': {}", path.display(), err)
            }
            Error::Publish(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(err) => Some(err),
            Error::Source(err) => Some(err),
            Error::LoadTemplate(err) => Some(err),
            Error::Template { .. } => None,
            Error::Markdown { path: _, err } => Some(err),
            Error::Write { path: _, err } => Some(err),
            Error::Publish(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    /// Converts [`ConfigError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ConfigError) -> Error {
        Error::Config(err)
    }
}

impl From<SourceError> for Error {
    /// Converts [`SourceError`]s into [`Error`].
    fn from(err: SourceError) -> Error {
        Error::Source(err)
    }
}

impl From<TemplateError> for Error {
    /// Converts [`TemplateError`]s into [`Error`].
    fn from(err: TemplateError) -> Error {
        Error::LoadTemplate(err)
    }
}

impl From<PublishError> for Error {
    /// Converts [`PublishError`]s into [`Error`].
    fn from(err: PublishError) -> Error {
        Error::Publish(err)
    }
}
