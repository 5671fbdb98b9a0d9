use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use shared::{
    config::ClientConfig,
    models::{Comment, CreateCommentRequest, CreatePostRequest, Post, ReactionKind, UpdateCommentRequest},
};

use super::{authenticated_client, failed};

#[derive(Subcommand, Debug)]
pub enum FeedCommand {
    /// List posts, newest first
    List {
        #[arg(long, short, default_value_t = 1)]
        page: u32,
    },
    /// Publish a post
    Post(PostArgs),
    /// Show the comments under a post
    Comments { post_id: i64 },
    /// Comment on a post
    Comment { post_id: i64, text: String },
    /// Replace the text of one of your comments
    EditComment { comment_id: i64, text: String },
    /// Delete one of your comments
    DeleteComment { comment_id: i64 },
    /// React to a post
    React {
        post_id: i64,
        /// like, love, celebrate, support, insightful, or funny
        #[arg(default_value = "like", value_parser = parse_reaction)]
        kind: ReactionKind,
    },
    /// Withdraw your reaction from a post
    Unreact { post_id: i64 },
}

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Optional headline
    #[arg(long, short)]
    pub title: Option<String>,
    pub content: String,
}

fn parse_reaction(value: &str) -> Result<ReactionKind, String> {
    value
        .parse()
        .map_err(|err: &str| format!("{err}: `{value}`"))
}

pub async fn run(command: FeedCommand, config: &ClientConfig) -> Result<()> {
    let (client, _session) = authenticated_client(config)?;
    match command {
        FeedCommand::List { page } => {
            let page = client.list_posts(page).await.map_err(failed("loading posts"))?;
            if page.items.is_empty() {
                println!("No posts yet.");
            }
            for post in &page.items {
                println!("{}", render_post(post));
            }
            if page.has_more() {
                println!(
                    "page {} of {} ({} posts); use --page {} for more",
                    page.current_page,
                    page.last_page,
                    page.total,
                    page.current_page + 1
                );
            }
        }
        FeedCommand::Post(args) => {
            if args.content.trim().is_empty() {
                bail!("post content must not be empty");
            }
            let post = client
                .create_post(&CreatePostRequest {
                    title: args.title,
                    content: args.content,
                })
                .await
                .map_err(failed("publishing the post"))?;
            println!("Published post #{}", post.id);
        }
        FeedCommand::Comments { post_id } => {
            let comments = client
                .list_comments(post_id)
                .await
                .map_err(failed("loading comments"))?;
            if comments.is_empty() {
                println!("No comments on post #{post_id}.");
            }
            for comment in &comments {
                println!("{}", render_comment(comment));
            }
        }
        FeedCommand::Comment { post_id, text } => {
            if text.trim().is_empty() {
                bail!("comment must not be empty");
            }
            let comment = client
                .create_comment(&CreateCommentRequest {
                    post_id,
                    content: text,
                })
                .await
                .map_err(failed("commenting"))?;
            println!("Added comment #{} to post #{post_id}", comment.id);
        }
        FeedCommand::EditComment { comment_id, text } => {
            if text.trim().is_empty() {
                bail!("comment must not be empty");
            }
            client
                .update_comment(comment_id, &UpdateCommentRequest { content: text })
                .await
                .map_err(failed("editing the comment"))?;
            println!("Updated comment #{comment_id}");
        }
        FeedCommand::DeleteComment { comment_id } => {
            client
                .delete_comment(comment_id)
                .await
                .map_err(failed("deleting the comment"))?;
            println!("Deleted comment #{comment_id}");
        }
        FeedCommand::React { post_id, kind } => {
            client
                .react_to_post(post_id, kind)
                .await
                .map_err(failed("reacting"))?;
            println!("Reacted {kind} to post #{post_id}");
        }
        FeedCommand::Unreact { post_id } => {
            client
                .remove_reaction(post_id)
                .await
                .map_err(failed("removing the reaction"))?;
            println!("Removed your reaction from post #{post_id}");
        }
    }
    Ok(())
}

fn render_post(post: &Post) -> String {
    let author = post
        .author_name
        .clone()
        .unwrap_or_else(|| format!("user #{}", post.user_id));
    let mut out = format!("#{} {} · {}", post.id, author, post.created_at.display_short());
    if let Some(title) = post.title.as_deref().filter(|title| !title.is_empty()) {
        out.push_str(&format!("\n  {title}"));
    }
    out.push_str(&format!("\n  {}", post.content));
    out.push_str(&format!(
        "\n  {} reactions, {} comments",
        post.reactions_count, post.comments_count
    ));
    if let Some(mine) = post.my_reaction {
        out.push_str(&format!(" (you: {mine})"));
    }
    out
}

fn render_comment(comment: &Comment) -> String {
    let author = comment
        .author_name
        .clone()
        .unwrap_or_else(|| format!("user #{}", comment.user_id));
    format!(
        "#{} {} · {}\n  {}",
        comment.id,
        author,
        comment.created_at.display_short(),
        comment.content
    )
}
