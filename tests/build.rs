use docsmith::build::{build_site, Error};
use docsmith::config::Config;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, contents).expect("write");
}

fn project() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path();
    write(root, "package.json", r#"{"name": "mark.js", "version": "8.11.1"}"#);
    write(root, "src/docs/metadata.json", r#"{"title": "mark.js docs"}"#);
    write(
        root,
        "src/docs/toc.json",
        r#"{"api": {"sortBy": ["Usage", "Options"]}}"#,
    );
    write(
        root,
        "src/docs/options.md",
        "---\ntitle: Options\ncollection: api\nlayout: page.html\n---\n| Option | Type |\n|---|---|\n| element | string |\n",
    );
    write(
        root,
        "src/docs/usage.md",
        "---\ntitle: Usage\ncollection: api\nlayout: page.html\n---\n## Usage {{inc 1}}\n",
    );
    write(
        root,
        "src/docs/changelog.md",
        "---\ntitle: Changelog\ncollection: api\nlayout: page.html\n---\nNothing yet.\n",
    );
    write(root, "src/docs/logo.svg", "<svg/>");
    write(root, "src/docs/snippets/install.md", "npm install mark.js\n");
    write(
        root,
        "src/templates/page.html",
        "<title>{{.title}} - {{.defaults.title}} {{.pkg.version}}</title>\
         <nav>{{range .api}}{{template \"nav\" .}}{{end}}</nav>{{.contents}}",
    );
    write(
        root,
        "src/templates/partials/nav.html",
        "<a href=\"{{.path}}\">{{.title}}</a>",
    );
    dir
}

#[test]
fn test_build_site() -> Result<(), Error> {
    let dir = project();
    let root = dir.path();
    let config = Config::from_directory(root)?;
    let published = build_site(&config)?;

    let nav = concat!(
        "<nav>",
        "<a href=\"usage.html\">Usage</a>",
        "<a href=\"options.html\">Options</a>",
        "<a href=\"changelog.html\">Changelog</a>",
        "</nav>",
    );

    let usage = fs::read_to_string(root.join("usage.html")).expect("usage published");
    assert_eq!(
        usage,
        format!(
            "<title>Usage - mark.js docs 8.11.1</title>{}<h2 id=\"usage-2\">Usage 2</h2>\n",
            nav
        )
    );

    let options = fs::read_to_string(root.join("options.html")).expect("options published");
    assert!(options.starts_with("<title>Options - mark.js docs 8.11.1</title>"));
    assert!(options.contains(nav));
    assert!(options.contains(
        "<div class=\"table-responsive\"><table class=\"table table-bordered table-striped\">"
    ));

    assert_eq!(
        fs::read_to_string(root.join("logo.svg")).expect("asset published"),
        "<svg/>"
    );
    assert!(!root.join("usage.md").exists());
    assert!(!root.join("snippets").exists());
    assert!(!root.join("toc.json").exists());
    assert!(!config.build_directory.exists());
    assert!(published.files.contains(&Path::new("logo.svg").to_owned()));
    assert_eq!(published.removed, vec![Path::new("snippets").to_owned()]);
    Ok(())
}

#[test]
fn test_failed_build_publishes_nothing() -> Result<(), Error> {
    let dir = project();
    let root = dir.path();
    write(root, "src/docs/broken.md", "---\ntitle: Broken\n---\n{{if .title}}\n");

    let config = Config::from_directory(root)?;
    match build_site(&config) {
        Err(Error::Template { path, .. }) => {
            assert_eq!(path, Path::new("broken.md"));
        }
        other => panic!("wanted a template error, got {:?}", other.map(|_| ())),
    }
    assert!(!root.join("usage.html").exists());
    assert!(!config.build_directory.exists());
    Ok(())
}

#[test]
fn test_missing_toc_fails() -> Result<(), Error> {
    let dir = project();
    fs::remove_file(dir.path().join("src/docs/toc.json")).expect("remove toc");
    let config = Config::from_directory(dir.path())?;
    match build_site(&config) {
        Err(Error::Config(_)) => Ok(()),
        other => panic!("wanted a config error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_stale_scratch_directory_is_cleared() -> Result<(), Error> {
    let dir = project();
    let root = dir.path();
    write(root, "build/tmp/stale.html", "left over");
    write(root, "build/tmp/old/x.html", "left over");

    let config = Config::from_directory(root)?;
    let published = build_site(&config)?;

    assert!(!published.files.contains(&Path::new("stale.html").to_owned()));
    assert_eq!(published.removed, vec![Path::new("snippets").to_owned()]);
    assert!(!root.join("stale.html").exists());
    assert!(!root.join("old").exists());
    assert!(root.join("usage.html").exists());
    assert!(!config.build_directory.exists());
    Ok(())
}
