//! Generator module - fetches posts and writes the static site

use anyhow::{Context as _, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::cms::ContentSource;
use crate::content::{PostDetail, PostPagination};
use crate::helpers::{is_valid_slug, DateFormatter};
use crate::templates::{SiteContext, TemplateRenderer, LOAD_MORE_SCRIPT, STYLESHEET};
use crate::Blog;

/// What a full generation produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub home_posts: usize,
    pub has_more: bool,
    pub prerendered: Vec<String>,
}

/// Static site generator using Tera templates
pub struct Generator<S> {
    blog: Blog,
    source: S,
    renderer: TemplateRenderer,
    formatter: DateFormatter,
}

impl<S: ContentSource> Generator<S> {
    /// Create a new generator reading from `source`
    pub fn new(blog: &Blog, source: S) -> Result<Self> {
        let renderer = TemplateRenderer::new(SiteContext::from_config(&blog.config))?;
        let formatter = blog.date_formatter();

        Ok(Self {
            blog: blog.clone(),
            source,
            renderer,
            formatter,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    pub fn formatter(&self) -> &DateFormatter {
        &self.formatter
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<GenerateReport> {
        fs::create_dir_all(&self.blog.public_dir)?;

        self.copy_static_assets()?;
        self.write_theme_assets()?;

        let home = self.generate_home().await?;
        let prerendered = self.generate_post_pages().await?;
        self.generate_not_found()?;

        Ok(GenerateReport {
            home_posts: home.results.len(),
            has_more: home.next_page.is_some(),
            prerendered,
        })
    }

    /// Generate `index.html` from the first page of posts
    pub async fn generate_home(&self) -> Result<PostPagination> {
        let config = &self.blog.config;
        let response = self
            .source
            .get_by_type(&config.prismic.document_type, config.per_page)
            .await?;
        let page = PostPagination::from_response(response, &self.formatter)?;

        let html = self.renderer.render_home(&page)?;
        write_file(&self.blog.public_dir.join("index.html"), &html)?;
        tracing::debug!("Generated home page with {} posts", page.results.len());

        Ok(page)
    }

    /// Pre-render the most recent posts; the rest are rendered on first request
    async fn generate_post_pages(&self) -> Result<Vec<String>> {
        let config = &self.blog.config;
        if config.prerender == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .source
            .get_by_type(&config.prismic.document_type, config.prerender)
            .await?;

        let mut generated = Vec::with_capacity(response.results.len());
        for doc in &response.results {
            let post = PostDetail::from_document(doc, &self.formatter, config.words_per_minute)?;
            self.write_post(&post)?;
            generated.push(post.uid);
        }

        Ok(generated)
    }

    /// Fetch a single post by uid, write its page and return the HTML
    pub async fn generate_post(&self, uid: &str) -> Result<String> {
        let config = &self.blog.config;
        let doc = self
            .source
            .get_by_uid(&config.prismic.document_type, uid)
            .await?;
        let post = PostDetail::from_document(&doc, &self.formatter, config.words_per_minute)?;
        self.write_post(&post)
    }

    fn write_post(&self, post: &PostDetail) -> Result<String> {
        if !is_valid_slug(&post.uid) {
            anyhow::bail!("Refusing to write post with unsafe uid {:?}", post.uid);
        }

        let html = self.renderer.render_post(post)?;
        let output_path = self.post_output_path(&post.uid);
        write_file(&output_path, &html)?;
        tracing::debug!("Generated post: {:?}", output_path);
        Ok(html)
    }

    /// Where the page for `uid` lives in the public directory
    pub fn post_output_path(&self, uid: &str) -> PathBuf {
        self.blog
            .public_dir
            .join("posts")
            .join(uid)
            .join("index.html")
    }

    /// Generate `404.html`
    pub fn generate_not_found(&self) -> Result<()> {
        let html = self.renderer.render_not_found()?;
        write_file(&self.blog.public_dir.join("404.html"), &html)
    }

    /// Write the embedded stylesheet and script
    fn write_theme_assets(&self) -> Result<()> {
        let assets = self.blog.public_dir.join("assets");
        write_file(&assets.join("style.css"), STYLESHEET)?;
        write_file(&assets.join("load-more.js"), LOAD_MORE_SCRIPT)?;
        Ok(())
    }

    /// Copy the site's static directory (logo, images, etc.) to the public directory
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.blog.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            tracing::debug!("Copied: {:?}", relative);
        }

        Ok(())
    }
}

/// Write through a temporary file in the same directory, then rename it into
/// place; a concurrent reader sees the old page or the new one, never a
/// partial write.
fn write_file(path: &Path, contents: &str) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("Failed to create dir {:?}", parent))?;

    let mut file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {:?}", parent))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {:?}", path))?;

    // Temp files are created 0600
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }

    file.persist(path)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
