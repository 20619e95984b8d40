//! Posts: tag accounting, visibility, engagement, retweets, comments

mod common;

use common::{ctx, ctx_with, login};
use dao_server::posts::comments::{CreateCommentInput, CreateReplyInput};
use dao_server::posts::{ContentPartInput, CreatePostInput, RetweetInput};
use dao_server::utils::AppError;
use shared::{ContentCategory, Pagination, PostType, RefType, Visibility};

fn text_post(tags: &[&str], visibility: Visibility, body: &str) -> CreatePostInput {
    CreatePostInput {
        dao_id: String::new(),
        visibility,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        contents: vec![ContentPartInput {
            content: body.to_string(),
            category: ContentCategory::Text,
            sort: 0,
        }],
    }
}

#[tokio::test]
async fn tag_quotas_follow_public_visibility() {
    let t = ctx().await;
    login(&t, "0xauthor").await;
    let facade = t.facade();

    let post = facade
        .posts
        .create("0xauthor", text_post(&["rust"], Visibility::Public, "hello"))
        .await
        .expect("create");

    let tags = dao_server::db::repository::TagRepository::new(t.state.db.clone());
    let tag = tags.find_by_name("rust").await.expect("query").expect("tag row");
    assert_eq!(tag.quote_num, 1);

    // Going private releases the quota
    facade
        .posts
        .set_visibility("0xauthor", &post.id, Visibility::Private)
        .await
        .expect("hide");
    let tag = tags.find_by_name("rust").await.expect("query").expect("tag row");
    assert_eq!(tag.quote_num, 0);

    // And back
    facade
        .posts
        .set_visibility("0xauthor", &post.id, Visibility::Public)
        .await
        .expect("show");
    let tag = tags.find_by_name("rust").await.expect("query").expect("tag row");
    assert_eq!(tag.quote_num, 1);
}

#[tokio::test]
async fn private_posts_reject_engagement_even_for_the_author() {
    let t = ctx().await;
    login(&t, "0xauthor").await;
    let facade = t.facade();

    let post = facade
        .posts
        .create("0xauthor", text_post(&[], Visibility::Private, "secret"))
        .await
        .expect("create");

    let err = facade.posts.star("0xauthor", &post.id).await.unwrap_err();
    assert!(matches!(err, AppError::NoPermission(_)));
    let err = facade.posts.collect("0xauthor", &post.id).await.unwrap_err();
    assert!(matches!(err, AppError::NoPermission(_)));
}

#[tokio::test]
async fn hidden_posts_read_as_not_found_for_strangers() {
    let t = ctx().await;
    login(&t, "0xauthor").await;
    let facade = t.facade();

    let post = facade
        .posts
        .create("0xauthor", text_post(&[], Visibility::Private, "secret"))
        .await
        .expect("create");

    // The author still sees it
    facade
        .posts
        .get(Some("0xauthor"), &post.id)
        .await
        .expect("author read");

    let err = facade.posts.get(Some("0xother"), &post.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = facade.posts.get(None, &post.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn anonymous_timeline_is_public_only_pinned_first() {
    let t = ctx().await;
    login(&t, "0xauthor").await;
    let facade = t.facade();

    let older = facade
        .posts
        .create("0xauthor", text_post(&[], Visibility::Public, "older"))
        .await
        .expect("create");
    facade
        .posts
        .create("0xauthor", text_post(&[], Visibility::Private, "hidden"))
        .await
        .expect("create");
    facade
        .posts
        .create("0xauthor", text_post(&[], Visibility::Public, "newer"))
        .await
        .expect("create");
    facade
        .posts
        .stick("0xauthor", &older.id)
        .await
        .expect("pin");

    let page = facade
        .posts
        .timeline(None, Pagination::default())
        .await
        .expect("timeline");
    assert_eq!(page.total, 2);
    // Pinned post leads regardless of age
    assert_eq!(page.list[0].id, older.id);
}

#[tokio::test]
async fn pure_retweet_points_at_the_origin() {
    let t = ctx().await;
    login(&t, "0xauthor").await;
    login(&t, "0xfan").await;
    let facade = t.facade();

    let origin = facade
        .posts
        .create("0xauthor", text_post(&[], Visibility::Public, "original"))
        .await
        .expect("create");

    let retweet = facade
        .posts
        .retweet(
            "0xfan",
            RetweetInput {
                ref_id: origin.id.clone(),
                ref_type: RefType::Post,
                contents: vec![],
            },
        )
        .await
        .expect("retweet");
    assert_eq!(retweet.post_type, PostType::Retweet);
    assert_eq!(retweet.ref_id.as_deref(), Some(origin.id.as_str()));

    // Retweeting the retweet still points at the origin
    let second = facade
        .posts
        .retweet(
            "0xauthor",
            RetweetInput {
                ref_id: retweet.id.clone(),
                ref_type: RefType::Post,
                contents: vec![],
            },
        )
        .await
        .expect("retweet of retweet");
    assert_eq!(second.ref_id.as_deref(), Some(origin.id.as_str()));

    let origin_after = facade.posts.get(None, &origin.id).await.expect("read");
    assert_eq!(origin_after.ref_count, 2);
}

#[tokio::test]
async fn comment_ceiling_is_enforced() {
    let t = ctx_with(|c| c.max_comment_count = 2).await;
    login(&t, "0xauthor").await;
    let facade = t.facade();

    let post = facade
        .posts
        .create("0xauthor", text_post(&[], Visibility::Public, "talk to me"))
        .await
        .expect("create");

    let comment_input = |body: &str| CreateCommentInput {
        post_id: post.id.clone(),
        contents: vec![ContentPartInput {
            content: body.to_string(),
            category: ContentCategory::Text,
            sort: 0,
        }],
    };

    facade
        .comments
        .create("0xauthor", comment_input("first"))
        .await
        .expect("first comment");
    facade
        .comments
        .create("0xauthor", comment_input("second"))
        .await
        .expect("second comment");
    let err = facade
        .comments
        .create("0xauthor", comment_input("third"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MaxCommentCount));
}

#[tokio::test]
async fn comment_replies_show_up_in_the_listing() {
    let t = ctx().await;
    login(&t, "0xauthor").await;
    login(&t, "0xfan").await;
    let facade = t.facade();

    let post = facade
        .posts
        .create("0xauthor", text_post(&[], Visibility::Public, "hello"))
        .await
        .expect("create");
    let comment = facade
        .comments
        .create(
            "0xfan",
            CreateCommentInput {
                post_id: post.id.clone(),
                contents: vec![ContentPartInput {
                    content: "nice".to_string(),
                    category: ContentCategory::Text,
                    sort: 0,
                }],
            },
        )
        .await
        .expect("comment");
    let comment_key = dao_server::db::models::key_of(&comment.id);

    facade
        .comments
        .reply(
            "0xauthor",
            CreateReplyInput {
                comment_id: comment_key.clone(),
                content: "thanks".to_string(),
                at_address: "0xfan".to_string(),
            },
        )
        .await
        .expect("reply");

    let page = facade
        .comments
        .list(&post.id, Pagination::default())
        .await
        .expect("list");
    assert_eq!(page.total, 1);
    assert_eq!(page.list[0].replies.len(), 1);
    assert_eq!(page.list[0].replies[0].content, "thanks");

    // Post author may delete someone else's comment on their post
    facade
        .comments
        .delete("0xauthor", &comment_key)
        .await
        .expect("delete");
    let page = facade
        .comments
        .list(&post.id, Pagination::default())
        .await
        .expect("list");
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn delete_cascades_and_releases_tags() {
    let t = ctx().await;
    login(&t, "0xauthor").await;
    let facade = t.facade();

    let post = facade
        .posts
        .create("0xauthor", text_post(&["once"], Visibility::Public, "bye"))
        .await
        .expect("create");

    facade
        .posts
        .delete("0xauthor", &post.id)
        .await
        .expect("delete");

    let err = facade.posts.get(None, &post.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let tags = dao_server::db::repository::TagRepository::new(t.state.db.clone());
    let tag = tags.find_by_name("once").await.expect("query").expect("tag row");
    assert_eq!(tag.quote_num, 0);
}

#[tokio::test]
async fn only_the_author_mutates_a_post() {
    let t = ctx().await;
    login(&t, "0xauthor").await;
    let facade = t.facade();

    let post = facade
        .posts
        .create("0xauthor", text_post(&[], Visibility::Public, "mine"))
        .await
        .expect("create");

    let err = facade.posts.delete("0xother", &post.id).await.unwrap_err();
    assert!(matches!(err, AppError::NoPermission(_)));
    let err = facade
        .posts
        .set_visibility("0xother", &post.id, Visibility::Private)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoPermission(_)));
}
