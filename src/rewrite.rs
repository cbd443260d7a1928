//! Image reference rewriting during markdown → HTML conversion.
//!
//! Markdown posts reference images relative to their own directory
//! (`![dawn](./dawn.jpg)`). The published site serves them from
//! `/posts/{slug}/`, preferably as the pre-optimized WebP variant. This module
//! walks the markdown event stream and, for every image:
//!
//! 1. Rewrites a relative `src` to `{base_path}/posts/{slug}/{file}`;
//!    absolute and remote URLs are left untouched, so re-running the rewrite
//!    on its own output is a no-op.
//! 2. Substitutes the `.webp` sibling when one exists under the published
//!    assets directory.
//! 3. Resolves the on-disk file through an ordered candidate list
//!    ([`SourceResolver`]: published assets first, then the raw post
//!    directory) and attaches `width`/`height` plus fixed performance hints.
//! 4. Backfills missing alt text from the final filename.
//!
//! Dimension probes are independent per image; the document collects its
//! references first and probes them as one rayon batch joined at `collect()`.
//! A failed probe logs a warning and leaves that image unenriched — it never
//! fails the document.

use crate::{imaging, output};
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Responsive hint tuned to the ~800px content column.
const SIZES_ATTR: &str = "(max-width: 800px) 100vw, 800px";

/// Alt text of last resort, when no filename can be derived.
const ALT_FALLBACK: &str = "Blog post image";

/// Ordered on-disk locations where a post's images may live.
///
/// The first candidate holding the file wins. For a normal build that is the
/// published assets directory (optimized output), then the raw post source
/// directory — images referenced before optimization ran still resolve.
#[derive(Debug)]
pub struct SourceResolver {
    candidates: Vec<PathBuf>,
}

impl SourceResolver {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Resolve a path relative to the post's image directories.
    pub fn resolve(&self, rel: &str) -> Option<PathBuf> {
        self.candidates
            .iter()
            .map(|dir| dir.join(rel))
            .find(|p| p.is_file())
    }
}

/// Everything the rewriter needs to know about one post.
pub struct RewriteContext<'a> {
    slug: &'a str,
    base_path: &'a str,
    /// Published assets directory for this post (`public/posts/{slug}`).
    assets_dir: PathBuf,
    resolver: SourceResolver,
}

impl<'a> RewriteContext<'a> {
    pub fn new(slug: &'a str, base_path: &'a str, public_dir: &Path, posts_dir: &Path) -> Self {
        let assets_dir = public_dir.join("posts").join(slug);
        let resolver = SourceResolver::new(vec![assets_dir.clone(), posts_dir.join(slug)]);
        Self {
            slug,
            base_path,
            assets_dir,
            resolver,
        }
    }
}

/// One image reference, planned before any pixel I/O happens.
struct ImagePlan {
    /// Final `src` attribute value.
    src: String,
    /// On-disk location, when the reference is local and found.
    resolved: Option<PathBuf>,
    /// Intrinsic dimensions, filled in by the probe batch.
    dims: Option<(u32, u32)>,
}

/// Convert a post body to HTML with all image references rewritten.
pub fn render_markdown(body: &str, ctx: &RewriteContext) -> String {
    let events: Vec<Event> = Parser::new_ext(body, markdown_options()).collect();

    // Plan every distinct reference up front...
    let mut plans: HashMap<String, ImagePlan> = HashMap::new();
    for event in &events {
        if let Event::Start(Tag::Image { dest_url, .. }) = event {
            plans
                .entry(dest_url.to_string())
                .or_insert_with(|| plan_image(ctx, dest_url));
        }
    }

    // ...then probe dimensions as one batch. collect() is the document-level
    // join: every probe has settled (success or logged failure) before any
    // HTML is emitted.
    let jobs: Vec<(String, PathBuf)> = plans
        .iter()
        .filter_map(|(original, plan)| plan.resolved.clone().map(|p| (original.clone(), p)))
        .collect();
    let probed: Vec<(String, Option<(u32, u32)>)> = jobs
        .into_par_iter()
        .map(|(original, path)| match imaging::probe_dimensions(&path) {
            Ok(dims) => (original, Some(dims)),
            Err(e) => {
                output::warn(&format!("could not read dimensions of {}: {e}", path.display()));
                (original, None)
            }
        })
        .collect();
    for (original, dims) in probed {
        if let Some(plan) = plans.get_mut(&original) {
            plan.dims = dims;
        }
    }

    let mut out = String::with_capacity(body.len() * 2);
    html::push_html(&mut out, rewrite_events(events, &plans).into_iter());
    out
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Decide the final `src` and on-disk location for one reference.
fn plan_image(ctx: &RewriteContext, original: &str) -> ImagePlan {
    let (src, rel) = site_path(ctx, original);
    let (src, rel) = match rel {
        Some(rel) => {
            let (src, rel) = substitute_webp(ctx, src, rel);
            (src, Some(rel))
        }
        None => (src, None),
    };

    let resolved = rel.as_deref().and_then(|r| ctx.resolver.resolve(r));
    if let Some(rel) = &rel
        && resolved.is_none()
    {
        output::warn(&format!(
            "post '{}': image '{rel}' not found in assets or source directory",
            ctx.slug
        ));
    }

    ImagePlan {
        src,
        resolved,
        dims: None,
    }
}

/// Normalize a reference to its site-absolute form.
///
/// Returns the `src` to publish plus, for local references, the path relative
/// to the post's image directories. Remote URLs and absolute paths outside
/// this post pass through untouched.
fn site_path(ctx: &RewriteContext, src: &str) -> (String, Option<String>) {
    if is_remote(src) {
        return (src.to_string(), None);
    }

    if src.starts_with('/') {
        // Already absolute — idempotence. Still enrich when it points into
        // this post's own assets.
        let prefix = format!("{}/posts/{}/", ctx.base_path, ctx.slug);
        let rel = src.strip_prefix(&prefix).filter(|r| !r.is_empty());
        return (src.to_string(), rel.map(str::to_string));
    }

    let rel = src.strip_prefix("./").unwrap_or(src);
    (
        format!("{}/posts/{}/{rel}", ctx.base_path, ctx.slug),
        Some(rel.to_string()),
    )
}

fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://") || src.starts_with("//")
}

/// Swap in the `.webp` sibling when the published assets directory has one.
fn substitute_webp(ctx: &RewriteContext, src: String, rel: String) -> (String, String) {
    let Some((stem, ext)) = rel.rsplit_once('.') else {
        return (src, rel);
    };
    if ext.eq_ignore_ascii_case("webp") {
        return (src, rel);
    }

    let webp_rel = format!("{stem}.webp");
    if !ctx.assets_dir.join(&webp_rel).is_file() {
        return (src, rel);
    }

    // src always ends with rel — swap the tail.
    let src = format!("{}{webp_rel}", &src[..src.len() - rel.len()]);
    (src, webp_rel)
}

/// Replace each image event span with a single rewritten `<img>` tag.
fn rewrite_events<'a>(
    events: Vec<Event<'a>>,
    plans: &HashMap<String, ImagePlan>,
) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut iter = events.into_iter();

    while let Some(event) = iter.next() {
        match event {
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => {
                // Collect the alt-text events up to the matching end tag.
                let mut alt_text = String::new();
                let mut nesting = 0;
                for inner in iter.by_ref() {
                    match inner {
                        Event::End(TagEnd::Image) if nesting == 0 => break,
                        Event::Start(Tag::Image { .. }) => nesting += 1,
                        Event::End(TagEnd::Image) => nesting -= 1,
                        Event::Text(t) | Event::Code(t) => alt_text.push_str(&t),
                        _ => {}
                    }
                }

                let plan = &plans[dest_url.as_ref()];
                out.push(Event::Html(CowStr::from(img_tag(plan, &alt_text, &title))));
            }
            other => out.push(other),
        }
    }

    out
}

fn img_tag(plan: &ImagePlan, alt_text: &str, title: &str) -> String {
    let alt = if alt_text.trim().is_empty() {
        alt_from_filename(&plan.src)
    } else {
        alt_text.to_string()
    };

    let mut tag = String::new();
    let _ = write!(
        tag,
        r#"<img src="{}" alt="{}""#,
        escape_attr(&plan.src),
        escape_attr(&alt)
    );
    if !title.is_empty() {
        let _ = write!(tag, r#" title="{}""#, escape_attr(title));
    }
    if let Some((w, h)) = plan.dims {
        let _ = write!(
            tag,
            r#" width="{w}" height="{h}" loading="lazy" decoding="async" sizes="{SIZES_ATTR}""#
        );
    }
    tag.push_str(" />");
    tag
}

/// Synthesize alt text from the final filename, extension stripped.
fn alt_from_filename(src: &str) -> String {
    let filename = src.rsplit('/').next().unwrap_or("");
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);
    if stem.is_empty() {
        ALT_FALLBACK.to_string()
    } else {
        stem.to_string()
    }
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// A context over two temp directories, with no images on disk yet.
    fn fixture() -> (TempDir, TempDir) {
        (TempDir::new().unwrap(), TempDir::new().unwrap())
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        crate::test_helpers::write_test_png(path, width, height);
    }

    #[test]
    fn relative_src_rewritten_to_absolute() {
        let (public, posts) = fixture();
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![dawn](./dawn.jpg)", &ctx);
        assert!(html.contains(r#"src="/posts/trip/dawn.jpg""#), "{html}");
    }

    #[test]
    fn bare_src_rewritten_like_dot_slash() {
        let (public, posts) = fixture();
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![dawn](dawn.jpg)", &ctx);
        assert!(html.contains(r#"src="/posts/trip/dawn.jpg""#));
    }

    #[test]
    fn absolute_and_remote_srcs_untouched() {
        let (public, posts) = fixture();
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown(
            "![a](/posts/other/x.png)\n\n![b](https://cdn.example.com/y.png)",
            &ctx,
        );
        assert!(html.contains(r#"src="/posts/other/x.png""#));
        assert!(html.contains(r#"src="https://cdn.example.com/y.png""#));
    }

    #[test]
    fn rewrite_is_idempotent_on_own_output() {
        let (public, posts) = fixture();
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let first = render_markdown("![dawn](./dawn.jpg)", &ctx);
        // The rewritten form is absolute; rewriting it again changes nothing.
        let again = render_markdown("![dawn](/posts/trip/dawn.jpg)", &ctx);
        assert_eq!(first, again);
    }

    #[test]
    fn base_path_prefixes_rewritten_src() {
        let (public, posts) = fixture();
        let ctx = RewriteContext::new("trip", "/blog", public.path(), posts.path());

        let html = render_markdown("![dawn](./dawn.jpg)", &ctx);
        assert!(html.contains(r#"src="/blog/posts/trip/dawn.jpg""#));
    }

    // =========================================================================
    // WebP substitution
    // =========================================================================

    #[test]
    fn webp_sibling_substituted() {
        let (public, posts) = fixture();
        write_png(&public.path().join("posts/trip/dawn.webp"), 40, 30);
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![dawn](./dawn.jpg)", &ctx);
        assert!(html.contains(r#"src="/posts/trip/dawn.webp""#), "{html}");
    }

    #[test]
    fn no_webp_sibling_keeps_original_extension() {
        let (public, posts) = fixture();
        write_png(&posts.path().join("trip/dawn.png"), 40, 30);
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![dawn](./dawn.png)", &ctx);
        assert!(html.contains(r#"src="/posts/trip/dawn.png""#));
    }

    #[test]
    fn webp_substitution_idempotent() {
        let (public, posts) = fixture();
        write_png(&public.path().join("posts/trip/dawn.webp"), 40, 30);
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![dawn](/posts/trip/dawn.webp)", &ctx);
        assert!(html.contains(r#"src="/posts/trip/dawn.webp""#));
        assert_eq!(html.matches(".webp").count(), 1);
    }

    // =========================================================================
    // Dimension probing
    // =========================================================================

    #[test]
    fn resolved_image_gets_dimensions_and_hints() {
        let (public, posts) = fixture();
        write_png(&posts.path().join("trip/dawn.png"), 320, 200);
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![dawn](./dawn.png)", &ctx);
        assert!(html.contains(r#"width="320" height="200""#), "{html}");
        assert!(html.contains(r#"loading="lazy""#));
        assert!(html.contains(r#"decoding="async""#));
        assert!(html.contains(r#"sizes="(max-width: 800px) 100vw, 800px""#));
    }

    #[test]
    fn unresolvable_image_degrades_without_failing() {
        let (public, posts) = fixture();
        write_png(&posts.path().join("trip/real.png"), 64, 48);
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![a](./real.png)\n\n![b](./missing.png)", &ctx);
        // The resolvable node is enriched, the missing one published bare.
        assert!(html.contains(r#"src="/posts/trip/real.png" alt="a" width="64" height="48""#));
        assert!(html.contains(r#"src="/posts/trip/missing.png" alt="b" />"#));
    }

    #[test]
    fn unreadable_image_degrades_without_failing() {
        let (public, posts) = fixture();
        let bogus = posts.path().join("trip/broken.png");
        fs::create_dir_all(bogus.parent().unwrap()).unwrap();
        fs::write(&bogus, b"not a png at all").unwrap();
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![b](./broken.png)", &ctx);
        assert!(html.contains(r#"src="/posts/trip/broken.png""#));
        assert!(!html.contains("width="));
    }

    #[test]
    fn assets_directory_wins_over_source() {
        let (public, posts) = fixture();
        // Same name, different dimensions — the published copy must be probed.
        write_png(&public.path().join("posts/trip/dawn.png"), 100, 75);
        write_png(&posts.path().join("trip/dawn.png"), 400, 300);
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![dawn](./dawn.png)", &ctx);
        assert!(html.contains(r#"width="100" height="75""#), "{html}");
    }

    #[test]
    fn resolver_precedence_is_first_existing() {
        let (a, b) = fixture();
        fs::write(b.path().join("only-second.txt"), "x").unwrap();
        let resolver =
            SourceResolver::new(vec![a.path().to_path_buf(), b.path().to_path_buf()]);

        assert_eq!(
            resolver.resolve("only-second.txt"),
            Some(b.path().join("only-second.txt"))
        );
        assert_eq!(resolver.resolve("nowhere.txt"), None);
    }

    // =========================================================================
    // Alt text
    // =========================================================================

    #[test]
    fn missing_alt_synthesized_from_filename() {
        let (public, posts) = fixture();
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![](./winter-sunrise.jpg)", &ctx);
        assert!(html.contains(r#"alt="winter-sunrise""#), "{html}");
    }

    #[test]
    fn present_alt_left_untouched() {
        let (public, posts) = fixture();
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![A frosty morning](./winter-sunrise.jpg)", &ctx);
        assert!(html.contains(r#"alt="A frosty morning""#));
    }

    #[test]
    fn alt_falls_back_when_no_filename_derivable() {
        let (public, posts) = fixture();
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("![](https://cdn.example.com/)", &ctx);
        assert!(html.contains(r#"alt="Blog post image""#), "{html}");
    }

    #[test]
    fn attribute_values_escaped() {
        let (public, posts) = fixture();
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown(r#"![a "quoted" alt](./x.png)"#, &ctx);
        assert!(html.contains("alt=\"a &quot;quoted&quot; alt\""), "{html}");
    }

    #[test]
    fn non_image_markdown_unaffected() {
        let (public, posts) = fixture();
        let ctx = RewriteContext::new("trip", "", public.path(), posts.path());

        let html = render_markdown("# Title\n\nSome *emphasis* and `code`.", &ctx);
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
        assert!(html.contains("<code>code</code>"));
    }
}
