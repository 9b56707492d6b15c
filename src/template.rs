//! Loads partials and layouts and compiles them into [`Template`]s with the
//! helper set registered.
//!
//! Every file under the partials directory becomes a named template that
//! content and layouts include with `{{template "name" .}}`. The name is the
//! path relative to the partials directory without its extension, with `/`
//! separators (e.g. `partials/nav/item.html` is `nav/item`).

use crate::helpers;
use gtmpl::Template;
use std::collections::hash_map::{Entry, HashMap};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The partial templates of a project, kept as `define` blocks so they can
/// be prepended to any template source.
#[derive(Clone, Debug, Default)]
pub struct Partials {
    source: String,
}

impl Partials {
    /// Loads every file under `directory`. A missing directory yields no
    /// partials.
    pub fn load(directory: &Path) -> Result<Partials> {
        let mut partials = Partials::default();
        if !directory.is_dir() {
            tracing::debug!(directory = %directory.display(), "No partials directory");
            return Ok(partials);
        }

        let walk = WalkDir::new(directory)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));
        for result in walk {
            let entry = result?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = match entry.path().strip_prefix(directory) {
                Ok(relative) => relative.with_extension(""),
                Err(_) => continue,
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let body = read_template(entry.path())?;
            partials.insert(&name, &body);
        }
        Ok(partials)
    }

    /// Adds a partial named `name`.
    pub fn insert(&mut self, name: &str, body: &str) {
        self.source
            .push_str(&format!("{{{{define \"{}\"}}}}{}{{{{end}}}}", name, body));
    }

    /// Compiles `body` into a template that can call the helpers and
    /// include the partials.
    pub fn compile(&self, body: &str) -> std::result::Result<Template, String> {
        let mut template = Template::default();
        helpers::register(&mut template);
        let mut source = String::with_capacity(self.source.len() + body.len());
        source.push_str(&self.source);
        source.push_str(body);
        template.parse(&source)?;
        Ok(template)
    }
}

/// The layout templates of a project, compiled on first use.
pub struct Layouts<'a> {
    directory: PathBuf,
    partials: &'a Partials,
    cache: HashMap<String, Template>,
}

impl<'a> Layouts<'a> {
    pub fn new(directory: &Path, partials: &'a Partials) -> Layouts<'a> {
        Layouts {
            directory: directory.to_owned(),
            partials,
            cache: HashMap::new(),
        }
    }

    /// The compiled layout `name`, a path relative to the templates
    /// directory.
    pub fn get(&mut self, name: &str) -> Result<&Template> {
        match self.cache.entry(name.to_owned()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = self.directory.join(name);
                let body = read_template(&path)?;
                let template = self
                    .partials
                    .compile(&body)
                    .map_err(|err| Error::Parse { path, err })?;
                Ok(entry.insert(template))
            }
        }
    }
}

fn read_template(path: &Path) -> Result<String> {
    use std::io::Read;
    let mut contents = String::new();
    File::open(path)
        .map_err(|err| Error::OpenTemplateFile {
            path: path.to_owned(),
            err,
        })?
        .read_to_string(&mut contents)?;
    Ok(contents)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for loading templates.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    Parse { path: PathBuf, err: String },

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::Parse { path, err } => {
                write!(f, "Parsing template file '{}': {}", path.display(), err)
            }
            Error::WalkDir(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::Parse { .. } => None,
            Error::WalkDir(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts [`walkdir::Error`]s into [`Error`].
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helpers::RenderContext;
    use crate::value::from_json;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_partials_are_named_by_relative_path() -> Result<()> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("nav"))?;
        fs::write(dir.path().join("nav/item.html"), "<li>{{.title}}</li>")?;
        fs::write(dir.path().join("footer.html"), "<footer>{{.pkg.version}}</footer>")?;

        let partials = Partials::load(dir.path())?;
        assert!(partials.source.starts_with(r#"{{define "footer"}}"#));

        let template = partials
            .compile(r#"{{range .items}}{{template "nav/item" .}}{{end}}{{template "footer" .}}"#)
            .expect("compiles");
        let out = RenderContext::new()
            .render(
                &template,
                from_json(&json!({
                    "items": [{"title": "Intro"}, {"title": "Usage"}],
                    "pkg": {"version": "8.11.1"}
                })),
            )
            .expect("renders");
        assert_eq!(out, "<li>Intro</li><li>Usage</li><footer>8.11.1</footer>");
        Ok(())
    }

    #[test]
    fn test_missing_partials_directory() -> Result<()> {
        let dir = TempDir::new()?;
        let partials = Partials::load(&dir.path().join("nope"))?;
        assert!(partials.source.is_empty());
        Ok(())
    }

    #[test]
    fn test_layouts_are_cached_and_missing_layouts_fail() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("page.html"), "<main>{{.contents}}</main>")?;
        let partials = Partials::default();
        let mut layouts = Layouts::new(dir.path(), &partials);
        layouts.get("page.html")?;
        fs::remove_file(dir.path().join("page.html"))?;
        layouts.get("page.html")?;

        match layouts.get("other.html") {
            Err(Error::OpenTemplateFile { .. }) => Ok(()),
            other => panic!("wanted an open error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_parse_errors_name_the_layout() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("bad.html"), "{{if .x}}unclosed")?;
        let partials = Partials::default();
        let mut layouts = Layouts::new(dir.path(), &partials);
        match layouts.get("bad.html") {
            Err(Error::Parse { path, .. }) => assert_eq!(path, dir.path().join("bad.html")),
            other => panic!("wanted a parse error, got {:?}", other.map(|_| ())),
        }
        Ok(())
    }
}
