//! Moves a finished build from the scratch directory into the publish
//! directory. Rendering any source file also renders the files it includes,
//! and those land in subdirectories of the scratch directory; they are not
//! pages of their own, so every subdirectory is dropped before publishing.

use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What [`publish`] did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Published {
    /// Files copied into the publish directory, relative to it.
    pub files: Vec<PathBuf>,

    /// Include artifacts removed from the scratch directory.
    pub removed: Vec<PathBuf>,
}

/// Removes the include artifacts from `build_directory`, copies what is left
/// into `target_directory` (overwriting existing files), and deletes
/// `build_directory`. The target must not lie inside the build directory.
pub fn publish(build_directory: &Path, target_directory: &Path) -> Result<Published> {
    if target_directory.starts_with(build_directory) {
        return Err(Error::TargetInsideBuild {
            build: build_directory.to_owned(),
            target: target_directory.to_owned(),
        });
    }
    let removed = remove_includes(build_directory)?;
    let files = copy_dir(build_directory, target_directory)?;
    rmdir(build_directory)?;
    tracing::info!(
        published = files.len(),
        removed = removed.len(),
        target = %target_directory.display(),
        "Published build"
    );
    Ok(Published { files, removed })
}

fn remove_includes(build_directory: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for entry in std::fs::read_dir(build_directory).map_err(|err| Error::Read {
        path: build_directory.to_owned(),
        err,
    })? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            let path = entry.path();
            tracing::debug!(path = %path.display(), "Removing include artifacts");
            rmdir(&path)?;
            removed.push(PathBuf::from(entry.file_name()));
        }
    }
    Ok(removed)
}

/// Copies the tree under `src` into `dst`, creating directories as needed
/// and overwriting files that exist. Returns the copied files relative to
/// `dst`.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();
    for result in WalkDir::new(src).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = result?;
        // strip_prefix() should never fail since `src` is an ancestor of
        // every entry
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative.to_owned(),
            Err(_) => continue,
        };
        let target = dst.join(&relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|err| Error::Copy {
                path: target.clone(),
                err,
            })?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|err| Error::Copy {
                path: target.clone(),
                err,
            })?;
            copied.push(relative);
        }
    }
    Ok(copied)
}

/// Removes `dir` and everything under it. A directory that doesn't exist is
/// already clean.
pub fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for publishing a build.
#[derive(Debug)]
pub enum Error {
    /// Returned when the publish directory is, or is under, the scratch
    /// directory.
    TargetInsideBuild { build: PathBuf, target: PathBuf },

    /// Returned when the scratch directory can't be listed.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while copying into the publish directory.
    Copy { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while removing directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::TargetInsideBuild { build, target } => write!(
                f,
                "Publish directory '{}' is inside build directory '{}'",
                target.display(),
                build.display()
            ),
            Error::Read { path, err } => {
                write!(f, "Reading build directory '{}': {}", path.display(), err)
            }
            Error::Copy { path, err } => {
                write!(f, "Copying to '{}': {}", path.display(), err)
            }
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
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
            Error::TargetInsideBuild { .. } => None,
            Error::Read { path: _, err } => Some(err),
            Error::Copy { path: _, err } => Some(err),
            Error::Clean { path: _, err } => Some(err),
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
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_publish() -> Result<()> {
        let dir = TempDir::new()?;
        let build = dir.path().join("build/tmp");
        let target = dir.path().join("public");
        fs::create_dir_all(build.join("includes/deep"))?;
        fs::create_dir_all(&target)?;
        fs::write(build.join("index.html"), "new index")?;
        fs::write(build.join("usage.html"), "usage")?;
        fs::write(build.join("includes/part.html"), "part")?;
        fs::write(build.join("includes/deep/x.html"), "x")?;
        fs::write(target.join("index.html"), "old index")?;
        fs::write(target.join("keep.css"), "css")?;

        let published = publish(&build, &target)?;
        assert_eq!(
            published.files,
            vec![PathBuf::from("index.html"), PathBuf::from("usage.html")]
        );
        assert_eq!(published.removed, vec![PathBuf::from("includes")]);

        assert_eq!(fs::read_to_string(target.join("index.html"))?, "new index");
        assert_eq!(fs::read_to_string(target.join("usage.html"))?, "usage");
        assert_eq!(fs::read_to_string(target.join("keep.css"))?, "css");
        assert!(!target.join("includes").exists());
        assert!(!build.exists());
        assert!(dir.path().join("build").exists());
        Ok(())
    }

    #[test]
    fn test_publish_missing_build_directory() {
        let dir = TempDir::new().expect("tempdir");
        match publish(&dir.path().join("missing"), dir.path()) {
            Err(Error::Read { .. }) => {}
            other => panic!("wanted a read error, got {:?}", other),
        }
    }

    #[test]
    fn test_publish_into_build_directory_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let public = dir.path().join("public");
        fs::create_dir_all(public.join("css"))?;
        fs::write(public.join("index.html"), "index")?;
        fs::write(public.join("css/site.css"), "css")?;

        for target in [public.clone(), public.join("css")].iter() {
            match publish(&public, target) {
                Err(Error::TargetInsideBuild { .. }) => {}
                other => panic!("wanted an overlap error, got {:?}", other),
            }
        }
        assert_eq!(fs::read_to_string(public.join("index.html"))?, "index");
        assert_eq!(fs::read_to_string(public.join("css/site.css"))?, "css");
        Ok(())
    }

    #[test]
    fn test_rmdir_missing_is_ok() -> Result<()> {
        let dir = TempDir::new()?;
        rmdir(&dir.path().join("missing"))
    }
}
