//! Image optimization for post assets.
//!
//! Stage 2 of the build pipeline. Takes each post's sibling image directory
//! and publishes its contents under `public/posts/{slug}/`:
//!
//! - **Rasters** (jpg, png, gif, webp) are decoded, downscaled to the
//!   configured width cap when wider (never upscaled), and re-encoded as
//!   lossy WebP with the extension swapped to `.webp`.
//! - **Vectors** (svg) are copied verbatim — already resolution independent.
//! - Anything else in the directory is not an image and is ignored.
//!
//! ## Freshness
//!
//! A source is skipped when its published counterpart exists and is not older
//! than it. The comparison is modification time only, no content hashing —
//! touching a source re-publishes it, renaming does not clean up old output.
//!
//! ## Failure Isolation
//!
//! A source that cannot be decoded or encoded is copied verbatim instead, so
//! a single bad file degrades that one image rather than failing the run.
//! Only an unreadable posts directory aborts the batch.
//!
//! Images are independent of one another and run through rayon; the report
//! is assembled after the whole batch has settled.

use crate::config::SiteConfig;
use crate::imaging::{self, Quality};
use crate::output;
use crate::post::{self, Post};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to a single source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Re-encoded as WebP (downscaled if over the cap).
    Optimized,
    /// Vector format, copied verbatim.
    Copied,
    /// Optimization failed; original copied verbatim instead.
    Fallback,
    /// Published counterpart already fresh.
    Skipped,
    /// Even the verbatim copy failed.
    Failed,
}

/// Per-image result, in input order.
#[derive(Debug)]
pub struct ImageEntry {
    pub slug: String,
    pub file: String,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
pub struct OptimizeReport {
    pub entries: Vec<ImageEntry>,
}

impl OptimizeReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }
}

struct Job {
    slug: String,
    source: PathBuf,
    /// Path relative to the post's image directory (may be nested).
    rel: String,
}

/// Optimize every post's images into the published assets directory.
pub fn optimize_images(
    posts: &[Post],
    posts_dir: &Path,
    public_dir: &Path,
    config: &SiteConfig,
) -> Result<OptimizeReport, OptimizeError> {
    let mut jobs = Vec::new();
    for p in posts {
        let Some(dir) = post::image_dir(posts_dir, &p.slug) else {
            continue;
        };
        for entry in WalkDir::new(&dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| OptimizeError::Io(e.into()))?;
            if !entry.file_type().is_file() || !imaging::is_image(entry.path()) {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&dir)
                .expect("walkdir yields paths under its root")
                .to_string_lossy()
                .replace('\\', "/");
            jobs.push(Job {
                slug: p.slug.clone(),
                source: entry.path().to_path_buf(),
                rel,
            });
        }
    }

    let entries: Vec<ImageEntry> = jobs
        .into_par_iter()
        .map(|job| {
            let outcome = publish_image(&job, public_dir, config);
            ImageEntry {
                slug: job.slug,
                file: job.rel,
                outcome,
            }
        })
        .collect();

    Ok(OptimizeReport { entries })
}

/// Publish one source image, never propagating per-image failures.
fn publish_image(job: &Job, public_dir: &Path, config: &SiteConfig) -> Outcome {
    let dest_dir = public_dir.join("posts").join(&job.slug);
    let vector = imaging::is_vector(&job.source);
    let dest = if vector {
        dest_dir.join(&job.rel)
    } else {
        dest_dir.join(webp_name(&job.rel))
    };

    if !needs_refresh(&job.source, &dest) {
        return Outcome::Skipped;
    }

    if let Some(parent) = dest.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        output::warn(&format!("could not create {}: {e}", parent.display()));
        return Outcome::Failed;
    }

    if vector {
        return match fs::copy(&job.source, &dest) {
            Ok(_) => Outcome::Copied,
            Err(e) => {
                output::warn(&format!("could not copy {}: {e}", job.source.display()));
                Outcome::Failed
            }
        };
    }

    match encode_to(&job.source, &dest, config) {
        Ok(()) => Outcome::Optimized,
        Err(e) => {
            output::warn(&format!(
                "could not optimize {}: {e} — copying original",
                job.source.display()
            ));
            // Fall back to the untouched original under its own name.
            match fs::copy(&job.source, dest_dir.join(&job.rel)) {
                Ok(_) => Outcome::Fallback,
                Err(e) => {
                    output::warn(&format!("could not copy {}: {e}", job.source.display()));
                    Outcome::Failed
                }
            }
        }
    }
}

fn encode_to(source: &Path, dest: &Path, config: &SiteConfig) -> Result<(), imaging::ImagingError> {
    let img = imaging::load_image(source)?;
    let (bytes, _) = imaging::encode_webp(
        &img,
        config.images.max_width,
        Quality::new(config.images.quality),
    )?;
    fs::write(dest, bytes)?;
    Ok(())
}

/// Swap the extension to `.webp`, keeping any subdirectory prefix.
fn webp_name(rel: &str) -> String {
    match rel.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.webp"),
        None => format!("{rel}.webp"),
    }
}

/// True when `dest` is missing or strictly older than `source`.
fn needs_refresh(source: &Path, dest: &Path) -> bool {
    let Ok(dest_mtime) = fs::metadata(dest).and_then(|m| m.modified()) else {
        return true;
    };
    match fs::metadata(source).and_then(|m| m.modified()) {
        Ok(src_mtime) => src_mtime > dest_mtime,
        Err(_) => true,
    }
}
