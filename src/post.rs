//! Post discovery and front-matter parsing.
//!
//! Stage 1 of the build pipeline. Enumerates the posts directory and turns
//! every markdown file into a [`Post`], producing the inventory that the
//! page, image, and SEO stages consume.
//!
//! ## Content Structure
//!
//! ```text
//! posts/                           # Content root
//! ├── config.toml                  # Site configuration (optional)
//! ├── hello-world.md               # Post (front-matter + markdown body)
//! ├── hello-world/                 # Sibling image directory (optional)
//! │   ├── sunrise.jpg
//! │   └── diagram.svg
//! └── rust-notes.md
//! ```
//!
//! ## Slugs
//!
//! A post's slug is its filename minus the `.md` extension, nothing more.
//! Slugs that collide case-insensitively are rejected at scan time: the
//! outputs would overwrite each other on case-insensitive filesystems, and
//! silently publishing one post's HTML under another's URL is worse than
//! failing the build.
//!
//! ## Dates
//!
//! The `date` front-matter field accepts the forms listed in [`crate::dates`]
//! and is normalized to `YYYY-MM-DD` here. A missing or unparseable date
//! falls back to today with a warning, so undated drafts still build.

use crate::{dates, output};
use gray_matter::engine::YAML;
use gray_matter::Matter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Front-matter error in {path}: {message}")]
    FrontMatter { path: PathBuf, message: String },
    #[error("Duplicate slug '{0}' — two markdown files normalize to the same URL")]
    DuplicateSlug(String),
}

/// A single blog post, parsed and normalized.
///
/// `body` is raw markdown; HTML is produced later by the render stage so the
/// image rewriter can run against the published assets of the same build.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// URL identifier: filename minus `.md`.
    pub slug: String,
    /// From front-matter `title`, falling back to the slug.
    pub title: String,
    /// Normalized publish date, `YYYY-MM-DD`.
    pub date: String,
    /// Optional front-matter `excerpt`, shown on the home listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// Markdown body with the front-matter block stripped.
    pub body: String,
}

/// Raw front-matter fields as they appear in the file.
#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    title: Option<String>,
    date: Option<String>,
    excerpt: Option<String>,
}

/// Load a single post from a markdown file.
pub fn load_post(path: &Path) -> Result<Post, ScanError> {
    let content = fs::read_to_string(path)?;
    let slug = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let matter = Matter::<YAML>::new();
    let parsed = matter
        .parse::<FrontMatter>(&content)
        .map_err(|e| ScanError::FrontMatter {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let fm = parsed.data.unwrap_or_default();

    let date = match fm.date.as_deref() {
        Some(raw) => dates::normalize(raw).unwrap_or_else(|| {
            output::warn(&format!(
                "{}: unrecognized date '{}', using today",
                path.display(),
                raw
            ));
            dates::today()
        }),
        None => dates::today(),
    };

    Ok(Post {
        title: fm.title.unwrap_or_else(|| slug.clone()),
        slug,
        date,
        excerpt: fm.excerpt,
        body: parsed.content,
    })
}

/// Load all posts from a directory, newest first.
///
/// Only `*.md` files in the directory itself are considered — subdirectories
/// hold post images, not content. An unreadable directory is fatal.
pub fn load_posts(dir: &Path) -> Result<Vec<Post>, ScanError> {
    let mut md_files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e.eq_ignore_ascii_case("md"))
                    .unwrap_or(false)
        })
        .collect();
    md_files.sort();

    let mut seen = HashSet::new();
    let mut posts = Vec::with_capacity(md_files.len());
    for path in &md_files {
        let post = load_post(path)?;
        if !seen.insert(post.slug.to_lowercase()) {
            return Err(ScanError::DuplicateSlug(post.slug));
        }
        posts.push(post);
    }

    // Newest first; slug breaks ties so the order is stable across runs.
    posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
    Ok(posts)
}

/// The sibling directory holding a post's source images, if it exists.
pub fn image_dir(posts_dir: &Path, slug: &str) -> Option<PathBuf> {
    let dir = posts_dir.join(slug);
    dir.is_dir().then_some(dir)
}
