//! Shared test utilities for the vellum test suite.

use std::path::Path;

/// Write a small valid PNG with the given dimensions.
///
/// Parent directories are created as needed, so tests can lay out whole
/// post/asset trees in one call per file.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save(path).unwrap();
}

/// Write a markdown post with front-matter into `dir`.
pub fn write_post(dir: &Path, slug: &str, date: &str, body: &str) {
    let content = format!("---\ntitle: {slug}\ndate: {date}\n---\n\n{body}\n");
    std::fs::write(dir.join(format!("{slug}.md")), content).unwrap();
}
