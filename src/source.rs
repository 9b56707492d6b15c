//! Defines the [`SourceFile`] type and the logic for reading a source tree
//! from the file system into memory. Content files (Markdown and HTML) are
//! read as text and may begin with a YAML front-matter block:
//!
//! ```md
//! ---
//! title: Usage
//! collection: api
//! layout: docs.html
//! ---
//! # Usage
//! ```
//!
//! Every other file is carried through the pipeline as opaque bytes.

use crate::toc::Titled;
use glob::Pattern;
use serde_json::{Map, Value as Json};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];
const HTML_EXTENSIONS: [&str; 2] = ["html", "htm"];

/// The contents of a [`SourceFile`].
#[derive(Clone, Debug, PartialEq)]
pub enum Contents {
    /// The body of a content file, with the front-matter removed.
    Text(String),

    /// Anything that isn't a content file.
    Binary(Vec<u8>),
}

/// A file moving through the pipeline. `path` starts out as the path
/// relative to the source directory and is renamed when the file is
/// converted (e.g. `usage.md` becomes `usage.html`).
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub metadata: Map<String, Json>,
    pub contents: Contents,
}

impl SourceFile {
    /// Constructs a content file from its source text, splitting off and
    /// parsing the front-matter.
    pub fn parse(path: PathBuf, input: &str) -> Result<SourceFile> {
        let (metadata, body) = split_frontmatter(input)?;
        Ok(SourceFile {
            path,
            metadata,
            contents: Contents::Text(body.to_owned()),
        })
    }

    fn has_extension(&self, extensions: &[&str]) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
    }

    pub fn is_markdown(&self) -> bool {
        self.has_extension(&MARKDOWN_EXTENSIONS)
    }

    /// The file's path with `/` separators, as used in URLs.
    pub fn url_path(&self) -> String {
        self.path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// A front-matter field.
    pub fn field(&self, key: &str) -> Option<&Json> {
        self.metadata.get(key)
    }

    /// The names of the collections this file declares itself part of via
    /// its `collection` front-matter field (a string or a list).
    pub fn declared_collections(&self) -> Vec<&str> {
        match self.field("collection") {
            Some(Json::String(name)) => vec![name.as_str()],
            Some(Json::Array(names)) => names.iter().filter_map(|n| n.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

impl Titled for SourceFile {
    fn title(&self) -> Option<&str> {
        self.field("title")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Splits `input` into front-matter metadata and body. Input without a
/// leading `---` line has no front-matter.
fn split_frontmatter(input: &str) -> Result<(Map<String, Json>, &str)> {
    const FENCE: &str = "---";

    let mut lines = input.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end() == FENCE => {}
        _ => return Ok((Map::new(), input)),
    }

    let yaml_start = input.find('\n').map_or(input.len(), |i| i + 1);
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == FENCE {
            let yaml = &input[yaml_start..offset];
            let body = &input[offset + line.len()..];
            return Ok((parse_frontmatter(yaml)?, body));
        }
        offset += line.len();
    }
    Err(Error::FrontmatterMissingEndFence)
}

fn parse_frontmatter(yaml: &str) -> Result<Map<String, Json>> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_yaml::from_str::<Json>(yaml)? {
        Json::Object(map) => Ok(map),
        Json::Null => Ok(Map::new()),
        _ => Err(Error::FrontmatterNotMapping),
    }
}

fn is_content(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| {
            MARKDOWN_EXTENSIONS
                .iter()
                .chain(HTML_EXTENSIONS.iter())
                .any(|x| e.eq_ignore_ascii_case(x))
        })
}

/// Reads every file under `source_directory` in path order, skipping files
/// whose name or relative path matches one of `ignore`.
pub fn read_sources(source_directory: &Path, ignore: &[Pattern]) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for result in WalkDir::new(source_directory).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = result?;
        if !entry.file_type().is_file() {
            continue;
        }

        // strip_prefix() should never fail since every entry is under
        // `source_directory`
        let relative = match entry.path().strip_prefix(source_directory) {
            Ok(relative) => relative.to_owned(),
            Err(_) => continue,
        };
        let file_name = entry.file_name().to_string_lossy();
        let relative_str = relative.to_string_lossy();
        if ignore
            .iter()
            .any(|p| p.matches(&file_name) || p.matches(&relative_str))
        {
            tracing::debug!(path = %relative.display(), "Ignoring source file");
            continue;
        }

        files.push(read_source(entry.path(), relative)?);
    }
    Ok(files)
}

fn read_source(path: &Path, relative: PathBuf) -> Result<SourceFile> {
    let bytes = std::fs::read(path)?;
    if !is_content(&relative) {
        return Ok(SourceFile {
            path: relative,
            metadata: Map::new(),
            contents: Contents::Binary(bytes),
        });
    }

    let annotate = |err: Error| {
        Error::Annotated(
            format!("reading `{}`", relative.display()),
            Box::new(err),
        )
    };
    let text = String::from_utf8(bytes).map_err(|_| annotate(Error::NotUtf8))?;
    SourceFile::parse(relative.clone(), &text).map_err(annotate)
}

/// Represents the result of reading sources.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error reading a [`SourceFile`].
#[derive(Debug)]
pub enum Error {
    /// Returned when a file opens a front-matter block with `---` but never
    /// closes it.
    FrontmatterMissingEndFence,

    /// Returned when the front-matter isn't valid YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the front-matter is valid YAML but not a mapping.
    FrontmatterNotMapping,

    /// Returned when a content file isn't valid UTF-8.
    NotUtf8,

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::FrontmatterNotMapping => {
                write!(f, "Front-matter must be a mapping")
            }
            Error::NotUtf8 => write!(f, "Content file is not valid UTF-8"),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::FrontmatterNotMapping => None,
            Error::NotUtf8 => None,
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`].
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`].
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_with_frontmatter() -> Result<()> {
        let file = SourceFile::parse(
            PathBuf::from("usage.md"),
            "---\ntitle: Usage\ncollection: [api, guide]\nheading: false\n---\n# Usage\n",
        )?;
        assert_eq!(file.title(), Some("Usage"));
        assert_eq!(file.declared_collections(), vec!["api", "guide"]);
        assert_eq!(file.field("heading"), Some(&Json::Bool(false)));
        assert_eq!(file.contents, Contents::Text("# Usage\n".to_owned()));
        assert!(file.is_markdown());
        Ok(())
    }

    #[test]
    fn test_parse_without_frontmatter() -> Result<()> {
        let file = SourceFile::parse(PathBuf::from("page.html"), "<p>--- not a fence</p>")?;
        assert!(file.metadata.is_empty());
        assert_eq!(file.title(), None);
        assert_eq!(file.contents, Contents::Text("<p>--- not a fence</p>".to_owned()));
        assert!(!file.is_markdown());
        Ok(())
    }

    #[test]
    fn test_parse_empty_frontmatter_and_crlf() -> Result<()> {
        let file = SourceFile::parse(PathBuf::from("a.md"), "---\r\n---\r\nbody")?;
        assert!(file.metadata.is_empty());
        assert_eq!(file.contents, Contents::Text("body".to_owned()));
        Ok(())
    }

    #[test]
    fn test_parse_unclosed_frontmatter() {
        match SourceFile::parse(PathBuf::from("a.md"), "---\ntitle: x\n") {
            Err(Error::FrontmatterMissingEndFence) => {}
            other => panic!("wanted a missing fence error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_scalar_frontmatter() {
        match SourceFile::parse(PathBuf::from("a.md"), "---\njust text\n---\n") {
            Err(Error::FrontmatterNotMapping) => {}
            other => panic!("wanted a mapping error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_sources() -> Result<()> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("includes"))?;
        fs::write(dir.path().join("b.md"), "---\ntitle: B\n---\nb")?;
        fs::write(dir.path().join("a.md"), "a")?;
        fs::write(dir.path().join("toc.json"), "{}")?;
        fs::write(dir.path().join("logo.png"), [0u8, 159, 146, 150])?;
        fs::write(dir.path().join("includes/part.md"), "part")?;

        let ignore = vec![Pattern::new("*.json").expect("pattern")];
        let files = read_sources(dir.path(), &ignore)?;
        let paths: Vec<String> = files.iter().map(|f| f.url_path()).collect();
        assert_eq!(paths, vec!["a.md", "b.md", "includes/part.md", "logo.png"]);
        assert_eq!(files[1].title(), Some("B"));
        assert_eq!(files[3].contents, Contents::Binary(vec![0, 159, 146, 150]));
        Ok(())
    }
}
