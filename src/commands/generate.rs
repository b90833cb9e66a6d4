//! Generate static files

use anyhow::Result;

use crate::cms::ContentSource;
use crate::generator::{GenerateReport, Generator};
use crate::Blog;

/// Generate the static site from the configured repository
pub async fn run(blog: &Blog) -> Result<()> {
    let client = blog.client()?;
    run_with_source(blog, client).await?;
    Ok(())
}

/// Generate the static site from any content source
pub async fn run_with_source<S: ContentSource>(blog: &Blog, source: S) -> Result<GenerateReport> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog, source)?;
    let report = generator.generate().await?;

    tracing::info!(
        "Home page lists {} posts{}",
        report.home_posts,
        if report.has_more { " (more available)" } else { "" }
    );
    tracing::info!("Pre-rendered {} post pages", report.prerendered.len());

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(report)
}
