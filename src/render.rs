//! HTML page generation.
//!
//! Stage 3 of the build pipeline. Renders the home listing and one page per
//! post from the inventory, embedding each post's markdown body as HTML with
//! image references rewritten against the published assets of this build.
//!
//! ## Output Structure
//!
//! ```text
//! public/
//! ├── index.html                 # Home listing
//! └── posts/
//!     └── hello-world/
//!         ├── index.html         # Post page (trailing-slash URL)
//!         └── sunrise.webp       # Published by the image stage
//! ```
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating —
//! type-safe templates with automatic XSS escaping. The stylesheet is
//! embedded at compile time and inlined into every page; the whole site
//! ships without a single runtime asset beyond the images.

use crate::config::SiteConfig;
use crate::dates;
use crate::post::Post;
use crate::rewrite::{self, RewriteContext};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;
use thiserror::Error;

const CSS: &str = include_str!("../static/style.css");

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One generated page, for build reporting.
#[derive(Debug)]
pub struct PageEntry {
    pub title: String,
    /// Output path relative to the public root.
    pub path: String,
}

#[derive(Debug, Default)]
pub struct RenderReport {
    pub pages: Vec<PageEntry>,
}

/// Render the whole site into the public root.
pub fn render_site(
    posts: &[Post],
    config: &SiteConfig,
    posts_dir: &Path,
    public_dir: &Path,
) -> Result<RenderReport, RenderError> {
    fs::create_dir_all(public_dir)?;

    let mut report = RenderReport::default();

    let home = home_page(posts, config);
    fs::write(public_dir.join("index.html"), home.into_string())?;
    report.pages.push(PageEntry {
        title: "Home".to_string(),
        path: "index.html".to_string(),
    });

    for post in posts {
        let ctx = RewriteContext::new(&post.slug, &config.base_path, public_dir, posts_dir);
        let body_html = rewrite::render_markdown(&post.body, &ctx);

        let page_dir = public_dir.join("posts").join(&post.slug);
        fs::create_dir_all(&page_dir)?;
        fs::write(
            page_dir.join("index.html"),
            post_page(post, &body_html, config).into_string(),
        )?;
        report.pages.push(PageEntry {
            title: post.title.clone(),
            path: format!("posts/{}/index.html", post.slug),
        });
    }

    Ok(report)
}

/// Head metadata for one page.
struct PageMeta<'a> {
    /// Full `<title>` text.
    title: String,
    description: &'a str,
    /// Canonical absolute URL.
    url: String,
    /// Open Graph type: `website` or `article`.
    kind: &'static str,
    /// Publish date for article pages.
    published: Option<&'a str>,
}

fn base_document(meta: &PageMeta, config: &SiteConfig, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (meta.title) }
                meta name="description" content=(meta.description);
                link rel="canonical" href=(meta.url);
                meta property="og:type" content=(meta.kind);
                meta property="og:url" content=(meta.url);
                meta property="og:title" content=(meta.title);
                meta property="og:description" content=(meta.description);
                meta property="og:site_name" content=(config.title);
                meta name="twitter:card" content="summary_large_image";
                meta name="twitter:title" content=(meta.title);
                meta name="twitter:description" content=(meta.description);
                @if let Some(published) = meta.published {
                    meta property="article:published_time" content=(published);
                }
                @if meta.kind == "article" && !config.author.is_empty() {
                    meta property="article:author" content=(config.author);
                }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

/// The home listing: newest posts first, excerpt when available.
fn home_page(posts: &[Post], config: &SiteConfig) -> Markup {
    let meta = PageMeta {
        title: config.title.clone(),
        description: &config.description,
        url: format!("{}/", config.site_root()),
        kind: "website",
        published: None,
    };

    base_document(
        &meta,
        config,
        html! {
            div.container {
                header.site-header {
                    h1 { (config.title) }
                    p { (config.description) }
                }
                section.posts {
                    h2 { "Latest Posts" }
                    @if posts.is_empty() {
                        p {
                            "No posts yet. Create your first post in the "
                            code { "posts/" }
                            " directory!"
                        }
                    } @else {
                        ul.post-list {
                            @for post in posts {
                                li.post-item {
                                    a href=(format!("{}/posts/{}/", config.base_path, post.slug)) {
                                        h3 { (post.title) }
                                        time datetime=(post.date) { (dates::display(&post.date)) }
                                        @if let Some(excerpt) = &post.excerpt {
                                            p.excerpt { (excerpt) }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

/// A single post page with its rendered body.
fn post_page(post: &Post, body_html: &str, config: &SiteConfig) -> Markup {
    let meta = PageMeta {
        title: format!("{} | {}", post.title, config.title),
        description: post.excerpt.as_deref().unwrap_or(&config.description),
        url: format!("{}/posts/{}/", config.site_root(), post.slug),
        kind: "article",
        published: Some(&post.date),
    };

    base_document(
        &meta,
        config,
        html! {
            article.post {
                a.back-link href=(format!("{}/", config.base_path)) { "← Back to home" }
                header.post-header {
                    h1 { (post.title) }
                    time datetime=(post.date) { (dates::display(&post.date)) }
                }
                div.post-content {
                    (PreEscaped(body_html))
                }
            }
        },
    )
}
