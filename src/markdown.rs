use crate::htmlrenderer::push_html;
use pulldown_cmark::{Options, Parser};
use std::fmt;
use std::io;

/// Converts GitHub-flavored markdown to HTML. See [`crate::htmlrenderer`]
/// for how the output differs from pulldown-cmark's stock renderer.
pub fn to_html(markdown: &str) -> Result<String, Error> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    push_html(&mut html, Parser::new_ext(markdown, options))?;
    Ok(html)
}

/// Represents an error converting markdown to HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O errors from the HTML writer.
    Io(io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for Error {
    /// Converts a [`io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for IO operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_table_is_wrapped() -> Result<(), Error> {
        let html = to_html("| Option | Default |\n|:--|--:|\n| `accuracy` | partially |\n")?;
        assert_eq!(
            html,
            concat!(
                r#"<div class="table-responsive"><table class="table table-bordered table-striped">"#,
                r#"<thead><tr><th style="text-align:left">Option</th><th style="text-align:right">Default</th></tr></thead>"#,
                r#"<tbody><tr><td style="text-align:left"><code>accuracy</code></td><td style="text-align:right">partially</td></tr></tbody>"#,
                "</table></div>\n",
            )
        );
        Ok(())
    }

    #[test]
    fn test_headings_get_ids() -> Result<(), Error> {
        let html = to_html("## Getting *started*\n\ntext")?;
        assert_eq!(
            html,
            "<h2 id=\"getting-started\">Getting <em>started</em></h2>\n<p>text</p>\n"
        );
        Ok(())
    }

    #[test]
    fn test_code_block_language() -> Result<(), Error> {
        let html = to_html("```js\nvar a = 1 < 2;\n```\n")?;
        assert_eq!(
            html,
            "<pre><code class=\"lang-js\">var a = 1 &lt; 2;\n</code></pre>\n"
        );
        Ok(())
    }

    #[test]
    fn test_image_alt_text() -> Result<(), Error> {
        let html = to_html("![The *logo*](logo.png \"Logo\")")?;
        assert_eq!(
            html,
            "<p><img src=\"logo.png\" alt=\"The logo\" title=\"Logo\"></p>\n"
        );
        Ok(())
    }

    #[test]
    fn test_link() -> Result<(), Error> {
        let html = to_html("[docs](usage.html)")?;
        assert_eq!(html, "<p><a href=\"usage.html\">docs</a></p>\n");
        Ok(())
    }
}
