//! The library code for the `docsmith` documentation site builder. A build
//! runs these stages in order, entirely in memory:
//!
//! 1. Loading the project's configuration, site metadata, and table of
//!    contents ([`crate::config`])
//! 2. Reading source files and their front-matter ([`crate::source`])
//! 3. Grouping files into ordered collections ([`crate::collections`], with
//!    title ordering from [`crate::toc`])
//! 4. Rendering the templates embedded in each file, with the helpers from
//!    [`crate::helpers`] and the partials from [`crate::template`]
//! 5. Converting Markdown to HTML ([`crate::markdown`])
//! 6. Wrapping each file in its layout ([`crate::template`])
//!
//! Only once every stage has succeeded is the result written to the scratch
//! directory, which [`crate::publish`] then moves into the publish directory.
//! [`crate::build`] ties the stages together.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod collections;
pub mod config;
pub mod helpers;
pub mod htmlrenderer;
pub mod markdown;
pub mod publish;
pub mod source;
pub mod template;
pub mod toc;
pub mod value;
