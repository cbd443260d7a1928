//! SEO file generation: `sitemap.xml` and `robots.txt`.
//!
//! Pure string formatting over the post inventory — the only logic is date
//! ordering. Entry fields are fixed: the home page claims `weekly`/`1.0`,
//! posts `monthly`/`0.8`, with `lastmod` taken from the normalized publish
//! date (the home page uses the build date).
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/</loc>
//!     <lastmod>2026-08-06</lastmod>
//!     <changefreq>weekly</changefreq>
//!     <priority>1.0</priority>
//!   </url>
//! </urlset>
//! ```

use crate::config::SiteConfig;
use crate::dates;
use crate::post::Post;
use std::fmt::Write;
use std::fs;
use std::path::Path;
use thiserror::Error;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Error, Debug)]
pub enum SeoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `sitemap.xml` and `robots.txt` into the public root.
pub fn generate(posts: &[Post], config: &SiteConfig, public_dir: &Path) -> Result<(), SeoError> {
    fs::create_dir_all(public_dir)?;
    fs::write(
        public_dir.join("sitemap.xml"),
        sitemap_xml(posts, config, &dates::today()),
    )?;
    fs::write(public_dir.join("robots.txt"), robots_txt(config))?;
    Ok(())
}

/// Render the sitemap: home page first, then posts by descending date.
pub fn sitemap_xml(posts: &[Post], config: &SiteConfig, today: &str) -> String {
    let root = config.site_root();

    let mut entries: Vec<(&str, &str)> = posts
        .iter()
        .map(|p| (p.slug.as_str(), p.date.as_str()))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut xml = String::with_capacity(4096);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    let _ = writeln!(xml, r#"<urlset xmlns="{SITEMAP_NS}">"#);

    push_url(&mut xml, &format!("{root}/"), today, "weekly", "1.0");
    for (slug, date) in entries {
        push_url(
            &mut xml,
            &format!("{root}/posts/{slug}/"),
            date,
            "monthly",
            "0.8",
        );
    }

    xml.push_str("</urlset>\n");
    xml
}

fn push_url(xml: &mut String, loc: &str, lastmod: &str, changefreq: &str, priority: &str) {
    xml.push_str("  <url>\n");
    let _ = writeln!(xml, "    <loc>{}</loc>", escape_xml(loc));
    let _ = writeln!(xml, "    <lastmod>{lastmod}</lastmod>");
    let _ = writeln!(xml, "    <changefreq>{changefreq}</changefreq>");
    let _ = writeln!(xml, "    <priority>{priority}</priority>");
    xml.push_str("  </url>\n");
}

/// Render the allow-all robots file pointing at the sitemap.
pub fn robots_txt(config: &SiteConfig) -> String {
    format!(
        "User-agent: *\nAllow: /\n\nSitemap: {}/sitemap.xml\n",
        config.site_root()
    )
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_post(slug: &str, date: &str) -> Post {
        Post {
            slug: slug.to_string(),
            title: slug.to_string(),
            date: date.to_string(),
            excerpt: None,
            body: String::new(),
        }
    }

    fn test_config() -> SiteConfig {
        SiteConfig {
            base_url: "https://example.com".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn entries_sorted_by_descending_date() {
        let posts = vec![
            make_post("january", "2024-01-01"),
            make_post("june", "2024-06-01"),
        ];
        let xml = sitemap_xml(&posts, &test_config(), "2024-07-01");

        let june = xml.find("/posts/june/").unwrap();
        let january = xml.find("/posts/january/").unwrap();
        assert!(june < january, "newer post must precede older:\n{xml}");
    }

    #[test]
    fn home_entry_always_first_with_fixed_fields() {
        let posts = vec![make_post("post", "2024-06-01")];
        let xml = sitemap_xml(&posts, &test_config(), "2024-07-01");

        let home = xml.find("<loc>https://example.com/</loc>").unwrap();
        let post = xml.find("<loc>https://example.com/posts/post/</loc>").unwrap();
        assert!(home < post);
        assert!(xml.contains("<lastmod>2024-07-01</lastmod>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert!(xml.contains("<priority>1.0</priority>"));
    }

    #[test]
    fn post_entries_carry_their_dates() {
        let posts = vec![make_post("post", "2024-06-01")];
        let xml = sitemap_xml(&posts, &test_config(), "2024-07-01");

        assert!(xml.contains("<lastmod>2024-06-01</lastmod>"));
        assert!(xml.contains("<changefreq>monthly</changefreq>"));
        assert!(xml.contains("<priority>0.8</priority>"));
    }

    #[test]
    fn empty_posts_still_lists_site_root() {
        let xml = sitemap_xml(&[], &test_config(), "2024-07-01");

        assert_eq!(xml.matches("<url>").count(), 1);
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }

    #[test]
    fn base_path_included_in_urls() {
        let config = SiteConfig {
            base_path: "/blog".to_string(),
            ..test_config()
        };
        let xml = sitemap_xml(&[make_post("post", "2024-06-01")], &config, "2024-07-01");

        assert!(xml.contains("<loc>https://example.com/blog/</loc>"));
        assert!(xml.contains("<loc>https://example.com/blog/posts/post/</loc>"));
    }

    #[test]
    fn loc_values_escaped() {
        let xml = sitemap_xml(&[make_post("a&b", "2024-06-01")], &test_config(), "2024-07-01");
        assert!(xml.contains("<loc>https://example.com/posts/a&amp;b/</loc>"));
    }

    #[test]
    fn robots_allows_everything_and_points_at_sitemap() {
        let robots = robots_txt(&test_config());
        assert_eq!(
            robots,
            "User-agent: *\nAllow: /\n\nSitemap: https://example.com/sitemap.xml\n"
        );
    }

    #[test]
    fn generate_writes_both_files() {
        let tmp = TempDir::new().unwrap();
        let public = tmp.path().join("public");
        generate(&[make_post("post", "2024-06-01")], &test_config(), &public).unwrap();

        assert!(public.join("sitemap.xml").exists());
        assert!(public.join("robots.txt").exists());
    }
}
