//! List posts from the content repository

use anyhow::Result;

use crate::cms::ContentSource;
use crate::feed::PostFeed;
use crate::Blog;

/// Walk every page of posts and print one line per post
pub async fn run(blog: &Blog, limit: Option<usize>) -> Result<()> {
    let client = blog.client()?;
    let lines = collect(blog, client, limit).await?;

    println!("Posts ({}):", lines.len());
    for line in lines {
        println!("  {}", line);
    }

    Ok(())
}

/// Follow "load more" until the feed runs out or `limit` posts are loaded
pub async fn collect<S: ContentSource>(
    blog: &Blog,
    source: S,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let feed = PostFeed::first_page(
        source,
        blog.date_formatter(),
        &blog.config.prismic.document_type,
        blog.config.per_page,
    )
    .await?;

    let limit = limit.unwrap_or(usize::MAX);
    while feed.can_load_more().await && feed.results().await.len() < limit {
        feed.load_more().await?;
    }

    let posts = feed.results().await;
    Ok(posts
        .iter()
        .take(limit)
        .map(|post| {
            let date = if post.first_publication_date.is_empty() {
                "unpublished"
            } else {
                post.first_publication_date.as_str()
            };
            format!("{} - {} [{}]", date, post.title, post.uid)
        })
        .collect())
}
