//! Groups source files into named collections and orders them. A file is a
//! member of a collection when its path matches one of the collection's
//! patterns or when its front-matter names the collection:
//!
//! ```yaml
//! collection: api        # or a list: [api, guide]
//! ```
//!
//! Collections are computed once per build. Their members are indices into
//! the build's file list, so the template values built from them always
//! reflect the files' current contents.

use crate::config::{CollectionConfig, Sort, Toc};
use crate::source::{Contents, SourceFile};
use crate::value::from_json;
use gtmpl::Value;
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::collections::HashMap;

/// One named, ordered group of files.
#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    pub name: String,

    /// Indices into the file list, in navigation order.
    pub members: Vec<usize>,

    /// Whether members link to their neighbors via `previous`/`next`.
    pub refer: bool,
}

/// Every collection of a build, in TOC order followed by collections only
/// named in front-matter, in the order they were first seen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collections {
    collections: Vec<Collection>,
}

impl Collections {
    pub fn build(toc: &Toc, files: &[SourceFile]) -> Collections {
        let default_config = CollectionConfig {
            patterns: Vec::new(),
            sort: Sort::default(),
            reverse: false,
            limit: None,
            refer: true,
        };

        let mut names: Vec<&str> = toc.keys().map(String::as_str).collect();
        for file in files {
            for name in file.declared_collections() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        let collections = names
            .into_iter()
            .map(|name| {
                let config = toc.get(name).unwrap_or(&default_config);
                let mut members: Vec<usize> = files
                    .iter()
                    .enumerate()
                    .filter(|(_, file)| is_member(name, config, file))
                    .map(|(i, _)| i)
                    .collect();
                sort_members(&mut members, &config.sort, files);
                if config.reverse {
                    members.reverse();
                }
                if let Some(limit) = config.limit {
                    members.truncate(limit);
                }
                tracing::debug!(collection = name, members = members.len(), "Built collection");
                Collection {
                    name: name.to_owned(),
                    members,
                    refer: config.refer,
                }
            })
            .collect();
        Collections { collections }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.collections.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// The names of the collections file `index` belongs to.
    pub fn memberships(&self, index: usize) -> Vec<&str> {
        self.collections
            .iter()
            .filter(|c| c.members.contains(&index))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// The previous and next files of file `index`. When a file is in several
    /// referring collections, the last one wins.
    pub fn neighbors(&self, index: usize) -> (Option<usize>, Option<usize>) {
        self.collections
            .iter()
            .filter(|c| c.refer)
            .filter_map(|c| {
                let at = c.members.iter().position(|&m| m == index)?;
                let previous = at.checked_sub(1).map(|p| c.members[p]);
                let next = c.members.get(at + 1).copied();
                Some((previous, next))
            })
            .last()
            .unwrap_or((None, None))
    }

    /// The template value of every collection: name to a list of entries
    /// (see [`entry_value`]).
    pub fn to_values(&self, files: &[SourceFile]) -> HashMap<String, Value> {
        self.collections
            .iter()
            .map(|c| {
                let entries = c
                    .members
                    .iter()
                    .map(|&i| entry_value(files, i, self))
                    .collect();
                (c.name.clone(), Value::Array(entries))
            })
            .collect()
    }
}

fn is_member(name: &str, config: &CollectionConfig, file: &SourceFile) -> bool {
    if let Contents::Binary(_) = file.contents {
        return false;
    }
    if file.declared_collections().contains(&name) {
        return true;
    }
    let path = file.url_path();
    config.patterns.iter().any(|p| p.matches(&path))
}

fn sort_members(members: &mut Vec<usize>, sort: &Sort, files: &[SourceFile]) {
    match sort {
        Sort::Titles(sorter) => members.sort_by(|&a, &b| sorter.compare(&files[a], &files[b])),
        Sort::Field(key) => {
            members.sort_by(|&a, &b| compare_field(files[a].field(key), files[b].field(key)))
        }
    }
}

fn is_truthy(value: Option<&Json>) -> bool {
    match value {
        None | Some(Json::Null) => false,
        Some(Json::Bool(b)) => *b,
        Some(Json::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Some(Json::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

// Members without a value come first; values of different kinds are ties.
fn compare_field(a: Option<&Json>, b: Option<&Json>) -> Ordering {
    match (is_truthy(a), is_truthy(b)) {
        (false, false) => return Ordering::Equal,
        (false, true) => return Ordering::Less,
        (true, false) => return Ordering::Greater,
        (true, true) => {}
    }
    match (a, b) {
        (Some(Json::String(a)), Some(Json::String(b))) => a.cmp(b),
        (Some(Json::Number(a)), Some(Json::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

/// The template value of a file as seen from a navigation list: its
/// front-matter, `path`, and `contents` (when the file is text).
pub fn summary_value(file: &SourceFile) -> HashMap<String, Value> {
    let mut m: HashMap<String, Value> = file
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), from_json(v)))
        .collect();
    m.insert("path".to_owned(), Value::String(file.url_path()));
    if let Contents::Text(text) = &file.contents {
        m.insert("contents".to_owned(), Value::String(text.clone()));
    }
    m
}

/// The template value of file `index`: its summary plus `collection` (the
/// names of its collections) and `previous`/`next` summaries of its
/// neighbors.
pub fn entry_value(files: &[SourceFile], index: usize, collections: &Collections) -> Value {
    let mut m = summary_value(&files[index]);
    let names = collections.memberships(index);
    if !names.is_empty() {
        m.insert(
            "collection".to_owned(),
            Value::Array(names.into_iter().map(|n| Value::String(n.to_owned())).collect()),
        );
    }

    let (previous, next) = collections.neighbors(index);
    if let Some(previous) = previous {
        m.insert("previous".to_owned(), Value::Map(summary_value(&files[previous])));
    }
    if let Some(next) = next {
        m.insert("next".to_owned(), Value::Map(summary_value(&files[next])));
    }
    Value::Map(m)
}
