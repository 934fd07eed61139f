use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::config::SiteConfig;
use crate::db::models::{BlogPost, PostFilters};
use crate::error::ApiError;
use crate::state::AppState;

const FEED_LIMIT: usize = 50;

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn rfc822(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

fn render_item(site: &SiteConfig, post: &BlogPost, category: Option<&str>) -> String {
    let post_url = format!("{}/blog/{}", site.url, post.slug);
    let category = category
        .map(|name| format!("      <category>{}</category>\n", escape_xml(name)))
        .unwrap_or_default();

    format!(
        "    <item>\n\
               <title>{}</title>\n\
               <link>{}</link>\n\
               <description>{}</description>\n\
         {}\
               <pubDate>{}</pubDate>\n\
               <guid isPermaLink=\"true\">{}</guid>\n\
             </item>\n",
        escape_xml(&post.title),
        escape_xml(&post_url),
        escape_xml(&post.excerpt),
        category,
        rfc822(&post.published_at.unwrap_or(post.created_at)),
        escape_xml(&post_url),
    )
}

fn render_feed(site: &SiteConfig, posts: &[BlogPost], category_names: &HashMap<i32, String>) -> String {
    let items: String = posts
        .iter()
        .map(|post| {
            let category = post
                .category_id
                .and_then(|id| category_names.get(&id))
                .map(String::as_str);
            render_item(site, post, category)
        })
        .collect();

    let feed_url = format!("{}/api/blog/rss.xml", site.url);
    let blog_url = format!("{}/blog", site.url);
    let last_build = posts
        .first()
        .map(|p| rfc822(&p.published_at.unwrap_or(p.created_at)))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{}</title>
    <link>{}</link>
    <description>{}</description>
    <language>en-us</language>
    <atom:link href="{}" rel="self" type="application/rss+xml"/>
    <lastBuildDate>{}</lastBuildDate>
{}  </channel>
</rss>"#,
        escape_xml(&site.title),
        escape_xml(&blog_url),
        escape_xml(&site.description),
        escape_xml(&feed_url),
        last_build,
        items,
    )
}

/// GET /api/blog/rss.xml - latest published posts
pub async fn rss_feed(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut posts = state
        .store
        .list_posts(PostFilters {
            published: Some(true),
            ..Default::default()
        })
        .await?;
    posts.truncate(FEED_LIMIT);

    let category_names: HashMap<i32, String> = state
        .store
        .list_categories()
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let xml = render_feed(&state.site, &posts, &category_names);

    Ok((
        [
            (header::CONTENT_TYPE, "application/rss+xml; charset=utf-8"),
            (
                header::CACHE_CONTROL,
                "public, max-age=3600, stale-while-revalidate=600",
            ),
        ],
        xml,
    )
        .into_response())
}
