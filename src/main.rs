use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use vellum::{config, optimize, output, post, render, seo};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "vellum")]
#[command(about = "Static site generator for markdown blogs")]
#[command(long_about = "\
Static site generator for markdown blogs

Your filesystem is the data source. Every markdown file under posts/ becomes
a page; a sibling directory of the same name holds that post's images.

Content structure:

  posts/
  ├── config.toml                  # Site config (optional)
  ├── hello-world.md               # Post with YAML front-matter
  ├── hello-world/                 # Images for hello-world.md
  │   ├── sunrise.jpg              # → published as sunrise.webp
  │   └── diagram.svg              # → copied verbatim
  └── rust-notes.md                # A post without images

Front-matter fields: title, date (YYYY-MM-DD, with optional time), excerpt.

The deployment path prefix may be set via BLOG_BASE_PATH, or is derived from
GITHUB_REPOSITORY for project-site deploys.")]
#[command(version = version_string())]
struct Cli {
    /// Posts directory
    #[arg(long, default_value = "posts", global = true)]
    posts: PathBuf,

    /// Output directory
    #[arg(long, default_value = "public", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the post inventory as JSON
    Scan,
    /// Optimize post images into the output directory
    Images,
    /// Render the home and post pages
    Pages,
    /// Generate sitemap.xml and robots.txt
    Seo,
    /// Run the full pipeline: scan → images → pages → seo
    Build,
    /// Validate posts and config without writing output
    Check,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_site_config(&cli.posts)?;

    match cli.command {
        Command::Scan => {
            let posts = post::load_posts(&cli.posts)?;
            println!("{}", serde_json::to_string_pretty(&posts)?);
        }
        Command::Images => {
            let posts = post::load_posts(&cli.posts)?;
            init_thread_pool(&config.processing);
            let report = optimize::optimize_images(&posts, &cli.posts, &cli.output, &config)?;
            output::print_optimize(&report);
        }
        Command::Pages => {
            let posts = post::load_posts(&cli.posts)?;
            init_thread_pool(&config.processing);
            let report = render::render_site(&posts, &config, &cli.posts, &cli.output)?;
            output::print_pages(&report);
        }
        Command::Seo => {
            let posts = post::load_posts(&cli.posts)?;
            seo::generate(&posts, &config, &cli.output)?;
            println!("Generated sitemap.xml and robots.txt");
        }
        Command::Build => {
            println!("==> Stage 1: Scanning {}", cli.posts.display());
            let posts = post::load_posts(&cli.posts)?;
            output::print_scan(&posts);

            println!("==> Stage 2: Optimizing images");
            init_thread_pool(&config.processing);
            let report = optimize::optimize_images(&posts, &cli.posts, &cli.output, &config)?;
            output::print_optimize(&report);

            println!("==> Stage 3: Generating HTML → {}", cli.output.display());
            let report = render::render_site(&posts, &config, &cli.posts, &cli.output)?;
            output::print_pages(&report);

            println!("==> Stage 4: SEO files");
            seo::generate(&posts, &config, &cli.output)?;
            println!("Generated sitemap.xml and robots.txt");

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.posts.display());
            let posts = post::load_posts(&cli.posts)?;
            output::print_scan(&posts);
            println!("==> Content is valid");
        }
    }

    Ok(())
}

/// Load `config.toml` and apply the one-time environment override.
///
/// This is the only place the process environment is read; every stage
/// receives the resolved [`config::SiteConfig`] explicitly.
fn load_site_config(posts_dir: &Path) -> Result<config::SiteConfig, config::ConfigError> {
    let mut site = config::load_config(posts_dir)?;
    let explicit = std::env::var("BLOG_BASE_PATH").ok();
    let repository = std::env::var("GITHUB_REPOSITORY").ok();
    if let Some(base_path) = config::resolve_base_path(explicit.as_deref(), repository.as_deref())
    {
        site.base_path = base_path;
    }
    Ok(site)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
