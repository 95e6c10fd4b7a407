//! Internal posts reader.

use crate::feed::text::truncate_chars;
use crate::feed::NewFeedItem;
use crate::post::Post;

/// Characters of the body used as a title for untitled posts.
const FALLBACK_TITLE_LENGTH: usize = 80;

/// External id of an internal post.
pub fn post_external_id(post_id: i64) -> String {
    format!("post-{post_id}")
}

/// Map verified posts onto article candidates.
///
/// Posts with neither a title nor a body are skipped. Input order is kept,
/// so pass posts newest first.
pub fn parse_posts(source_id: i64, posts: &[Post], link_base_path: &str) -> Vec<NewFeedItem> {
    posts
        .iter()
        .filter_map(|post| {
            let content = post.content.trim();
            let title = match post.title.trim() {
                "" if content.is_empty() => return None,
                "" => truncate_chars(content, FALLBACK_TITLE_LENGTH),
                title => title.to_string(),
            };
            let link = format!("{link_base_path}{}", post.id);

            Some(
                NewFeedItem::article(
                    source_id,
                    &post_external_id(post.id),
                    &title,
                    &link,
                    post.created_at,
                )
                .with_summary(Some(content))
                .with_image_url(post.image_url.as_deref())
                .with_author(post.author_name.as_deref()),
            )
        })
        .collect()
}
