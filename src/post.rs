//! Liking and commenting on feed posts.
//!
//! The mock feed renders posts with inline onclick handlers, so controls are
//! located through fallback chains: a class selector first, then a scan of
//! buttons by handler name. Missing controls skip the interaction rather
//! than failing the sweep.

use rand::Rng;
use tracing::{debug, info, warn};

use crate::behavior::{self, Pacing};
use crate::error::Result;
use crate::page::{Element, PageDriver};

pub const POST_SELECTOR: &str = ".post";
pub const LIKE_BUTTON: &str = ".like-btn";
pub const POST_ACTION: &str = ".post-action";
pub const POST_ID_ATTRIBUTE: &str = "data-post-id";

/// Canned comments for the interaction sweep.
const COMMENTS: &[&str] = &[
    "Great insights!",
    "Thanks for sharing this.",
    "Very informative post.",
    "This is helpful, thank you!",
    "Interesting perspective!",
    "Appreciate the update.",
    "Good to know!",
    "Thanks for the information.",
];

/// Find a button inside `scope` whose onclick handler contains `handler`.
async fn find_button_by_handler(
    page: &dyn PageDriver,
    scope: Element,
    handler: &str,
) -> Result<Option<Element>> {
    for button in page.find_all_in(scope, "button").await? {
        if let Some(onclick) = page.read_attribute(button, "onclick").await? {
            if onclick.contains(handler) {
                return Ok(Some(button));
            }
        }
    }
    Ok(None)
}

/// Like a post unless it is already liked.
pub async fn like_post(page: &dyn PageDriver, pacing: &Pacing, post: Element) -> Result<()> {
    let like_btn = match page.find_in(post, LIKE_BUTTON).await? {
        Some(btn) => Some(btn),
        None => find_button_by_handler(page, post, "toggleLike").await?,
    };
    let Some(like_btn) = like_btn else {
        warn!("like button not found for post");
        return Ok(());
    };

    page.scroll_into_view(post).await?;
    pacing.reading_pause().await;

    let classes = page.read_attribute(like_btn, "class").await?.unwrap_or_default();
    if classes.contains("liked") {
        debug!("post already liked, skipping");
        return Ok(());
    }

    page.scroll_into_view(like_btn).await?;
    pacing.settle().await;
    page.click(like_btn).await?;
    info!("post liked");
    pacing.settle().await;
    Ok(())
}

/// Comment on a post: expand the comment section, type, submit.
pub async fn comment_on_post(
    page: &dyn PageDriver,
    pacing: &Pacing,
    post: Element,
    comment: &str,
) -> Result<()> {
    let Some(post_id) = page.read_attribute(post, POST_ID_ATTRIBUTE).await? else {
        warn!("post has no id attribute, skipping comment");
        return Ok(());
    };
    debug!(%post_id, "commenting on post");

    page.scroll_into_view(post).await?;
    pacing.settle().await;

    // Expand the comment section. Handler scan first, then action-bar text.
    let mut toggle = find_button_by_handler(page, post, "toggleComments").await?;
    if toggle.is_none() {
        for action in page.find_all_in(post, POST_ACTION).await? {
            if page.read_text(action).await?.contains("\u{1f4ac}") {
                toggle = Some(action);
                break;
            }
        }
    }
    if let Some(toggle) = toggle {
        page.scroll_into_view(toggle).await?;
        pacing.settle().await;
        if let Err(e) = page.click(toggle).await {
            warn!(error = %e, "could not expand comment section");
        }
        pacing.settle().await;
    }

    // The input is rendered with the post id in its selector.
    let mut input = page.find(&format!("#comment-input-{}", post_id)).await?;
    if input.is_none() {
        if let Some(section) = page.find(&format!("#comments-{}", post_id)).await? {
            input = page.find_in(section, "input").await?;
        }
    }
    let Some(input) = input else {
        warn!(%post_id, "comment input not found");
        return Ok(());
    };

    page.scroll_into_view(input).await?;
    behavior::human_type(page, pacing, input, comment).await?;
    pacing.settle().await;

    let mut submit = find_button_by_handler(page, post, &format!("addComment({})", post_id)).await?;
    if submit.is_none() {
        if let Some(section) = page.find(&format!("#comments-{}", post_id)).await? {
            submit = page.find_in(section, "button").await?;
        }
    }
    let Some(submit) = submit else {
        warn!(%post_id, "comment submit button not found");
        return Ok(());
    };

    page.scroll_into_view(submit).await?;
    pacing.settle().await;
    page.click(submit).await?;
    info!(%post_id, "comment posted");
    pacing.settle().await;
    Ok(())
}

/// Scroll through the feed, liking and commenting on up to `max_posts`.
pub async fn interact_with_posts(
    page: &dyn PageDriver,
    pacing: &Pacing,
    max_posts: usize,
) -> Result<()> {
    let posts = page.find_all(POST_SELECTOR).await?;
    if posts.is_empty() {
        info!("no posts found on page");
        return Ok(());
    }

    let count = max_posts.min(posts.len());
    info!(found = posts.len(), interacting = count, "starting post interaction");

    for (i, post) in posts.iter().take(count).enumerate() {
        page.scroll_into_view(*post).await?;
        pacing.reading_pause().await;
        pacing.reading_pause().await;

        if let Err(e) = like_post(page, pacing, *post).await {
            warn!(error = %e, "error liking post");
        }

        let comment = COMMENTS[rand::thread_rng().gen_range(0..COMMENTS.len())];
        if let Err(e) = comment_on_post(page, pacing, *post, comment).await {
            warn!(error = %e, "error commenting on post");
        }

        if i + 1 < count {
            behavior::random_scroll(page).await;
            pacing.reading_pause().await;
        }
    }

    info!("post interaction complete");
    Ok(())
}
