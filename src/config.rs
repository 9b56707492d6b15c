//! Loads the project layout ([`Config`]) and the JSON files that feed the
//! build ([`SiteData`]): site metadata, package info, and the TOC that
//! defines collections. Everything is deserialized into typed structures;
//! a file with the wrong shape is an error naming that file.

use crate::toc::TocSorter;
use glob::Pattern;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// The optional project file at the root of a documentation project.
pub const PROJECT_FILE: &str = "docsmith.yaml";

/// The layout of a project. Every path is relative to the project root and
/// defaults to the conventional location.
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Project {
    source_directory: PathBuf,
    build_directory: PathBuf,
    target_directory: PathBuf,
    templates_directory: PathBuf,
    partials_directory: PathBuf,
    metadata_file: PathBuf,
    package_file: PathBuf,
    toc_file: PathBuf,
    ignore: Vec<String>,
    default_layout: Option<String>,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            source_directory: PathBuf::from("src/docs"),
            build_directory: PathBuf::from("build/tmp"),
            target_directory: PathBuf::from("."),
            templates_directory: PathBuf::from("src/templates"),
            partials_directory: PathBuf::from("src/templates/partials"),
            metadata_file: PathBuf::from("src/docs/metadata.json"),
            package_file: PathBuf::from("package.json"),
            toc_file: PathBuf::from("src/docs/toc.json"),
            ignore: vec!["*.json".to_owned()],
            default_layout: None,
        }
    }
}

/// Where a build reads its inputs and writes its outputs.
#[derive(Debug)]
pub struct Config {
    /// The directory of Markdown (and other) source files.
    pub source_directory: PathBuf,

    /// The scratch directory the pipeline renders into. It is deleted once
    /// its contents have been published.
    pub build_directory: PathBuf,

    /// The directory rendered pages are published to.
    pub target_directory: PathBuf,

    /// The directory holding layout templates.
    pub templates_directory: PathBuf,

    /// The directory holding partial templates.
    pub partials_directory: PathBuf,

    pub metadata_file: PathBuf,
    pub package_file: PathBuf,
    pub toc_file: PathBuf,

    /// Source files whose name matches any of these are not rendered.
    pub ignore: Vec<Pattern>,

    /// The layout for files that don't name one. `None` leaves such files
    /// without a layout.
    pub default_layout: Option<String>,
}

impl Config {
    /// Loads the configuration for the project rooted at `root`, reading
    /// [`PROJECT_FILE`] if it exists and using the default layout otherwise.
    pub fn from_directory(root: &Path) -> Result<Config> {
        let path = root.join(PROJECT_FILE);
        if path.is_file() {
            Config::from_project_file(&path)
        } else {
            Config::from_project(root, Project::default())
        }
    }

    /// Loads the configuration from a project file. Paths in the file are
    /// relative to the file's directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)
            .map_err(|err| Error::DeserializeYaml {
                path: path.to_owned(),
                err,
            })?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        Config::from_project(root, project)
    }

    fn from_project(root: &Path, project: Project) -> Result<Config> {
        let config = Config {
            source_directory: root.join(project.source_directory),
            build_directory: root.join(project.build_directory),
            target_directory: root.join(project.target_directory),
            templates_directory: root.join(project.templates_directory),
            partials_directory: root.join(project.partials_directory),
            metadata_file: root.join(project.metadata_file),
            package_file: root.join(project.package_file),
            toc_file: root.join(project.toc_file),
            ignore: compile_patterns(&project.ignore)?,
            default_layout: project.default_layout,
        };
        config.check_build_directory(root)?;
        Ok(config)
    }

    /// The scratch directory is deleted on every build, so it must not be
    /// the project root or hold any directory the build reads or publishes
    /// to.
    fn check_build_directory(&self, root: &Path) -> Result<()> {
        let protected = [
            ("project", root),
            ("source", self.source_directory.as_path()),
            ("templates", self.templates_directory.as_path()),
            ("partials", self.partials_directory.as_path()),
            ("target", self.target_directory.as_path()),
        ];
        for (kind, directory) in protected.iter() {
            if directory.starts_with(&self.build_directory) {
                return Err(Error::OverlappingDirectories {
                    kind: *kind,
                    path: directory.to_path_buf(),
                    build_directory: self.build_directory.clone(),
                });
            }
        }
        Ok(())
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|err| Error::InvalidPattern {
                pattern: p.clone(),
                err,
            })
        })
        .collect()
}

/// How a collection's members are ordered.
#[derive(Clone, Debug, PartialEq)]
pub enum Sort {
    /// Listed titles first, in list order (see [`crate::toc`]).
    Titles(TocSorter),

    /// By the value of a metadata field. Members missing the field come
    /// first.
    Field(String),
}

impl Default for Sort {
    fn default() -> Self {
        Sort::Field("date".to_owned())
    }
}

/// One collection declared in the TOC file.
#[derive(Debug)]
pub struct CollectionConfig {
    /// Files whose source path matches any pattern are members, in
    /// addition to files that name the collection in their front-matter.
    pub patterns: Vec<Pattern>,
    pub sort: Sort,
    pub reverse: bool,

    /// Keep at most this many members after sorting.
    pub limit: Option<usize>,

    /// Whether members get `previous`/`next` links to their neighbors.
    pub refer: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSort {
    Titles(Vec<String>),
    Field(String),
}

// The TOC also carries display options for templates; only the keys below
// affect collections, the rest are ignored.
#[derive(Deserialize)]
struct RawCollection {
    #[serde(default)]
    pattern: Option<OneOrMany>,
    #[serde(default, rename = "sortBy")]
    sort_by: Option<RawSort>,
    #[serde(default)]
    reverse: bool,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default = "default_refer")]
    refer: bool,
}

fn default_refer() -> bool {
    true
}

impl RawCollection {
    fn compile(self) -> Result<CollectionConfig> {
        let patterns = match self.pattern {
            None => Vec::new(),
            Some(OneOrMany::One(p)) => compile_patterns(&[p])?,
            Some(OneOrMany::Many(ps)) => compile_patterns(&ps)?,
        };
        Ok(CollectionConfig {
            patterns,
            sort: match self.sort_by {
                None => Sort::default(),
                Some(RawSort::Titles(order)) => Sort::Titles(TocSorter::new(order)),
                Some(RawSort::Field(field)) => Sort::Field(field),
            },
            reverse: self.reverse,
            limit: self.limit,
            refer: self.refer,
        })
    }
}

/// Collection name to collection definition.
pub type Toc = BTreeMap<String, CollectionConfig>;

/// The data every template sees, loaded from the project's JSON files.
#[derive(Debug)]
pub struct SiteData {
    /// The site metadata, exposed to templates as `.defaults`.
    pub defaults: Map<String, Json>,

    /// The package info, exposed to templates as `.pkg`.
    pub pkg: Map<String, Json>,

    pub toc: Toc,
}

impl SiteData {
    pub fn load(config: &Config) -> Result<SiteData> {
        let raw: BTreeMap<String, RawCollection> = read_json(&config.toc_file, "TOC")?;
        let toc = raw
            .into_iter()
            .map(|(name, collection)| Ok((name, collection.compile()?)))
            .collect::<Result<Toc>>()?;
        Ok(SiteData {
            defaults: read_json(&config.metadata_file, "metadata")?,
            pkg: read_json(&config.package_file, "package")?,
            toc,
        })
    }
}

fn open(path: &Path, kind: &'static str) -> Result<File> {
    File::open(path).map_err(|err| Error::Open {
        kind,
        path: path.to_owned(),
        err,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path, kind: &'static str) -> Result<T> {
    serde_json::from_reader(BufReader::new(open(path, kind)?)).map_err(|err| {
        Error::DeserializeJson {
            kind,
            path: path.to_owned(),
            err,
        }
    })
}

/// The result of loading configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when a configuration file can't be opened.
    Open {
        kind: &'static str,
        path: PathBuf,
        err: std::io::Error,
    },

    /// Returned when the project file isn't a valid project description.
    DeserializeYaml {
        path: PathBuf,
        err: serde_yaml::Error,
    },

    /// Returned when a JSON file is malformed or has the wrong shape.
    DeserializeJson {
        kind: &'static str,
        path: PathBuf,
        err: serde_json::Error,
    },

    /// Returned when the build directory is, or contains, a directory the
    /// build reads from or publishes to.
    OverlappingDirectories {
        kind: &'static str,
        path: PathBuf,
        build_directory: PathBuf,
    },

    /// Returned for glob patterns that don't parse.
    InvalidPattern {
        pattern: String,
        err: glob::PatternError,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { kind, path, err } => {
                write!(f, "Opening {} file `{}`: {}", kind, path.display(), err)
            }
            Error::DeserializeYaml { path, err } => {
                write!(f, "Loading project file `{}`: {}", path.display(), err)
            }
            Error::DeserializeJson { kind, path, err } => {
                write!(f, "Loading {} file `{}`: {}", kind, path.display(), err)
            }
            Error::OverlappingDirectories {
                kind,
                path,
                build_directory,
            } => write!(
                f,
                "Build directory `{}` would delete the {} directory `{}`",
                build_directory.display(),
                kind,
                path.display()
            ),
            Error::InvalidPattern { pattern, err } => {
                write!(f, "Invalid pattern `{}`: {}", pattern, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { err, .. } => Some(err),
            Error::DeserializeYaml { err, .. } => Some(err),
            Error::DeserializeJson { err, .. } => Some(err),
            Error::OverlappingDirectories { .. } => None,
            Error::InvalidPattern { err, .. } => Some(err),
        }
    }
}
