//! Built-in theme templates using Tera template engine
//!
//! Templates, the stylesheet and the load-more script are embedded directly
//! in the binary. Values are HTML-escaped by Tera; rich-text bodies are the
//! only values written with `| safe`.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{PostDetail, PostPagination, PostSummary};
use crate::helpers::{html_escape, url_for};

/// Stylesheet written to `assets/style.css`
pub const STYLESHEET: &str = include_str!("theme/style.css");

/// Browser side of "load more", written to `assets/load-more.js`
pub const LOAD_MORE_SCRIPT: &str = include_str!("theme/load-more.js");

/// Path of the JSON endpoint backing "load more"
pub const LOAD_MORE_API: &str = "api/posts";

/// Site-wide values available to every template as `site`
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub title: String,
    pub language: String,
    /// Always ends with `/`
    pub root: String,
    pub logo: String,
    pub load_more_label: String,
    pub load_more_error: String,
    pub api_url: String,
}

impl SiteContext {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            language: config.language.clone(),
            root: url_for(&config.root, ""),
            logo: url_for(&config.root, &config.logo),
            load_more_label: config.load_more_label.clone(),
            load_more_error: config.load_more_error.clone(),
            api_url: url_for(&config.root, LOAD_MORE_API),
        }
    }
}

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
    site: SiteContext,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(site: SiteContext) -> Result<Self> {
        let mut tera = Tera::default();

        // Escape markup characters but leave `/` alone so paths and URLs stay readable
        tera.set_escape_fn(html_escape);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("404.html", include_str!("theme/404.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
            (
                "partials/post_list.html",
                include_str!("theme/partials/post_list.html"),
            ),
            (
                "partials/icon_calendar.html",
                include_str!("theme/partials/icon_calendar.html"),
            ),
            (
                "partials/icon_user.html",
                include_str!("theme/partials/icon_user.html"),
            ),
            (
                "partials/icon_clock.html",
                include_str!("theme/partials/icon_clock.html"),
            ),
        ])?;

        Ok(Self { tera, site })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context
    }

    /// Home page: first page of posts plus the load-more button
    pub fn render_home(&self, page: &PostPagination) -> Result<String> {
        let mut context = self.base_context();
        context.insert("posts", &page.results);
        context.insert("next_page", &page.next_page);
        self.render("index.html", &context)
    }

    /// Only the post items, for appending to an already rendered home page
    pub fn render_post_list(&self, posts: &[PostSummary]) -> Result<String> {
        let mut context = self.base_context();
        context.insert("posts", posts);
        self.render("partials/post_list.html", &context)
    }

    pub fn render_post(&self, post: &PostDetail) -> Result<String> {
        let mut context = self.base_context();
        context.insert("post", post);
        self.render("post.html", &context)
    }

    pub fn render_not_found(&self) -> Result<String> {
        self.render("404.html", &self.base_context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentBlock, TrustedHtml};

    fn renderer() -> TemplateRenderer {
        TemplateRenderer::new(SiteContext::from_config(&SiteConfig::default())).unwrap()
    }

    fn summary(uid: &str, title: &str) -> PostSummary {
        PostSummary {
            uid: uid.to_string(),
            first_publication_date: "15 mar 2021".to_string(),
            title: title.to_string(),
            subtitle: "Tudo sobre como criar a sua primeira aplicação".to_string(),
            author: "Danilo Vieira".to_string(),
        }
    }

    #[test]
    fn test_site_context() {
        let mut config = SiteConfig::default();
        config.root = "/blog".to_string();
        let site = SiteContext::from_config(&config);
        assert_eq!(site.root, "/blog/");
        assert_eq!(site.logo, "/blog/assets/Logo.svg");
        assert_eq!(site.api_url, "/blog/api/posts");
    }

    #[test]
    fn test_render_home_with_more() {
        let page = PostPagination {
            next_page: Some(
                "https://blog.cdn.prismic.io/api/v2/documents/search?page=2&pageSize=1".to_string(),
            ),
            results: vec![summary("como-utilizar-hooks", "Como utilizar Hooks")],
        };
        let html = renderer().render_home(&page).unwrap();

        assert!(html.contains("<title>Home | spacetraveling</title>"));
        assert!(html.contains(r#"href="/posts/como-utilizar-hooks""#));
        assert!(html.contains("Como utilizar Hooks"));
        assert!(html.contains("15 mar 2021"));
        assert!(html.contains("Carregar mais posts"));
        assert!(html.contains("page=2&amp;pageSize=1"));
        assert!(html.contains("assets/load-more.js"));
        assert!(html.contains(
            r#"role="alert" hidden>Não foi possível carregar mais posts. Tente novamente.</p>"#
        ));
    }

    #[test]
    fn test_load_more_script_reports_failure() {
        assert!(LOAD_MORE_SCRIPT.contains("getElementById('load-more-error')"));
        assert!(LOAD_MORE_SCRIPT.contains("error.hidden = false"));
    }

    #[test]
    fn test_render_home_last_page() {
        let page = PostPagination {
            next_page: None,
            results: vec![summary("a", "A")],
        };
        let html = renderer().render_home(&page).unwrap();
        assert!(!html.contains("load-more"));
    }

    #[test]
    fn test_render_post_list_escapes() {
        let html = renderer()
            .render_post_list(&[summary("a", "<script>alert(1)</script>"), summary("b", "B")])
            .unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        let first = html.find(r#"href="/posts/a""#).unwrap();
        let second = html.find(r#"href="/posts/b""#).unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_render_post_trusts_body_only() {
        let post = PostDetail {
            uid: "criando-um-app".to_string(),
            title: "Criando um app <CRA>".to_string(),
            subtitle: String::new(),
            author: "Joseph Oliveira".to_string(),
            banner_url: "https://images.prismic.io/banner.png".to_string(),
            first_publication_date: "25 mar 2021".to_string(),
            content: vec![ContentBlock {
                heading: "Proin et varius".to_string(),
                body: TrustedHtml::new("<p><strong>Nullam</strong> dolor</p>"),
            }],
            read_minutes: 4,
        };
        let html = renderer().render_post(&post).unwrap();

        assert!(html.contains("Criando um app &lt;CRA&gt;"));
        assert!(html.contains("<p><strong>Nullam</strong> dolor</p>"));
        assert!(html.contains("Proin et varius"));
        assert!(html.contains("4 min"));
        assert!(html.contains(r#"src="https://images.prismic.io/banner.png""#));
    }

    #[test]
    fn test_render_not_found() {
        let html = renderer().render_not_found().unwrap();
        assert!(html.contains("404"));
        assert!(html.contains(r#"href="/""#));
    }
}
