//! DAOs: creation, follow flows, paid subscriptions, pay-notify routing

mod common;

use common::{ctx, login};
use dao_server::facade::CreateDaoInput;
use dao_server::pay::TransferPurpose;
use dao_server::utils::AppError;
use shared::Visibility;

fn dao_input(name: &str, visibility: Visibility) -> CreateDaoInput {
    CreateDaoInput {
        name: name.to_string(),
        visibility,
        introduction: "a fine community".to_string(),
        avatar: String::new(),
        banner: String::new(),
    }
}

#[tokio::test]
async fn dao_names_are_unique() {
    let t = ctx().await;
    login(&t, "0xowner").await;
    login(&t, "0xrival").await;

    t.facade()
        .create_dao("0xowner", dao_input("builders", Visibility::Public))
        .await
        .expect("create");
    let err = t
        .facade()
        .create_dao("0xrival", dao_input("builders", Visibility::Public))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DaoNameDuplicated(_)));
}

#[tokio::test]
async fn dao_creation_notifies_the_owner_and_links_a_group() {
    let t = ctx().await;
    login(&t, "0xowner").await;

    let dao = t
        .facade()
        .create_dao("0xowner", dao_input("welcomers", Visibility::Public))
        .await
        .expect("create");
    assert!(!dao.group_id.is_empty());

    // The welcome note landed in the owner's inbox
    let groups = t
        .facade()
        .notify
        .group_list("0xowner")
        .await
        .expect("groups");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].unread, 1);
}

#[tokio::test]
async fn public_dao_follow_completes_immediately() {
    let t = ctx().await;
    login(&t, "0xowner").await;
    login(&t, "0xfan").await;

    let dao = t
        .facade()
        .create_dao("0xowner", dao_input("open", Visibility::Public))
        .await
        .expect("create");

    let completed = t
        .facade()
        .follow_dao("0xfan", &dao.id)
        .await
        .expect("follow");
    assert!(completed);

    let bookmarked = t.facade().bookmarked_daos("0xfan").await.expect("bookmarks");
    assert_eq!(bookmarked.len(), 1);
    assert_eq!(bookmarked[0].name, "open");

    let err = t.facade().follow_dao("0xfan", &dao.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadySubscribed(_)));

    t.facade()
        .unfollow_dao("0xfan", &dao.id)
        .await
        .expect("unfollow");
    let bookmarked = t.facade().bookmarked_daos("0xfan").await.expect("bookmarks");
    assert!(bookmarked.is_empty());
}

#[tokio::test]
async fn private_dao_follow_waits_for_the_subscription_payment() {
    let t = ctx().await;
    login(&t, "0xowner").await;
    login(&t, "0xfan").await;

    let dao = t
        .facade()
        .create_dao("0xowner", dao_input("gated", Visibility::Private))
        .await
        .expect("create");

    let completed = t
        .facade()
        .follow_dao("0xfan", &dao.id)
        .await
        .expect("follow");
    assert!(!completed);

    // Nothing bookmarked yet; a subscription transfer went out
    assert!(t.facade().bookmarked_daos("0xfan").await.expect("bookmarks").is_empty());
    let subs: Vec<_> = t
        .gateway
        .sent()
        .into_iter()
        .filter(|r| r.purpose == TransferPurpose::SubscribeDao)
        .collect();
    assert_eq!(subs.len(), 1);

    // The webhook completes the follow
    t.facade()
        .handle_pay_notify("sub_dao", &subs[0].order_id, "tx_sub", true)
        .await
        .expect("notify");
    let bookmarked = t.facade().bookmarked_daos("0xfan").await.expect("bookmarks");
    assert_eq!(bookmarked.len(), 1);
}

#[tokio::test]
async fn failed_subscription_payment_changes_nothing() {
    let t = ctx().await;
    login(&t, "0xowner").await;
    login(&t, "0xfan").await;

    let dao = t
        .facade()
        .create_dao("0xowner", dao_input("strict", Visibility::Private))
        .await
        .expect("create");
    t.facade().follow_dao("0xfan", &dao.id).await.expect("follow");

    let subs: Vec<_> = t
        .gateway
        .sent()
        .into_iter()
        .filter(|r| r.purpose == TransferPurpose::SubscribeDao)
        .collect();
    t.facade()
        .handle_pay_notify("sub_dao", &subs[0].order_id, "tx_sub", false)
        .await
        .expect("notify");
    assert!(t.facade().bookmarked_daos("0xfan").await.expect("bookmarks").is_empty());
}

#[tokio::test]
async fn unknown_pay_methods_are_rejected() {
    let t = ctx().await;
    let err = t
        .facade()
        .handle_pay_notify("gift_card", "gc_1", "tx", true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PayNotify(_)));
}

#[tokio::test]
async fn only_the_owner_updates_a_dao() {
    let t = ctx().await;
    login(&t, "0xowner").await;
    login(&t, "0xother").await;

    let dao = t
        .facade()
        .create_dao("0xowner", dao_input("locked", Visibility::Public))
        .await
        .expect("create");

    let err = t
        .facade()
        .update_dao(
            "0xother",
            &dao.id,
            dao_server::facade::UpdateDaoInput {
                introduction: Some("hijacked".to_string()),
                avatar: None,
                banner: None,
                visibility: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoPermission(_)));
}
