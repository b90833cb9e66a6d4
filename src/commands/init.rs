//! Initialize a new blog site

use anyhow::Result;
use std::fs;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# Site
title: spacetraveling
language: pt-BR
timezone: UTC
logo: /assets/Logo.svg

# URL
root: /

# Directory
public_dir: public
static_dir: static

# Home page
per_page: 1
load_more_label: Carregar mais posts
load_more_error: Não foi possível carregar mais posts. Tente novamente.

# Post pages
prerender: 5
words_per_minute: 200

# Content repository
# PRISMIC_API_ENDPOINT and PRISMIC_ACCESS_TOKEN override these values
prismic:
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  document_type: posts
  timeout_secs: 10
"#;

const LOGO_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="240" height="26" viewBox="0 0 240 26"><text x="0" y="21" fill="#ff57b2" font-family="sans-serif" font-size="24" font-weight="700">spacetraveling<tspan fill="#f8f8f8">.</tspan></text></svg>
"##;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists, refusing to overwrite it", config_path);
    }

    fs::create_dir_all(target_dir.join("static/assets"))?;
    fs::write(&config_path, CONFIG_TEMPLATE)?;

    let logo_path = target_dir.join("static/assets/Logo.svg");
    if !logo_path.exists() {
        fs::write(&logo_path, LOGO_SVG)?;
    }

    Ok(())
}
