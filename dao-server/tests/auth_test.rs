//! Login, throttling, sessions and account cancellation

mod common;

use common::{ctx, ctx_with, dev_signature, login};
use dao_server::utils::AppError;

#[tokio::test]
async fn first_login_creates_the_account() {
    let t = ctx().await;
    let nonce = t.facade().auth.login_hello().await;
    let outcome = t
        .facade()
        .auth
        .login("0xAlice", &nonce, &dev_signature("0xalice", &nonce))
        .await
        .expect("login");
    assert!(outcome.created);
    // Addresses normalize to lowercase
    assert_eq!(outcome.user.address, "0xalice");

    let (_, user) = login(&t, "0xalice").await;
    assert_eq!(user.address, "0xalice");
    let again = t.facade().auth.login_hello().await;
    let outcome = t
        .facade()
        .auth
        .login("0xalice", &again, &dev_signature("0xalice", &again))
        .await
        .expect("login");
    assert!(!outcome.created);
}

#[tokio::test]
async fn nonce_is_single_use() {
    let t = ctx().await;
    let nonce = t.facade().auth.login_hello().await;
    let sig = dev_signature("0xbob", &nonce);
    t.facade()
        .auth
        .login("0xbob", &nonce, &sig)
        .await
        .expect("first use");
    let err = t.facade().auth.login("0xbob", &nonce, &sig).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidParams(_)));
}

#[tokio::test]
async fn failed_logins_throttle_at_the_limit() {
    let t = ctx_with(|c| c.login_err_max = 3).await;

    for _ in 0..3 {
        let nonce = t.facade().auth.login_hello().await;
        let err = t
            .facade()
            .auth
            .login("0xeve", &nonce, "deadbeef")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature));
    }

    // The window is closed even with a correct signature
    let nonce = t.facade().auth.login_hello().await;
    let err = t
        .facade()
        .auth
        .login("0xeve", &nonce, &dev_signature("0xeve", &nonce))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TooManyLoginError));
}

#[tokio::test]
async fn successful_login_clears_the_failure_count() {
    let t = ctx_with(|c| c.login_err_max = 3).await;

    for _ in 0..2 {
        let nonce = t.facade().auth.login_hello().await;
        let _ = t.facade().auth.login("0xeve", &nonce, "deadbeef").await;
    }
    login(&t, "0xeve").await;

    // Two more failures fit into a fresh window
    for _ in 0..2 {
        let nonce = t.facade().auth.login_hello().await;
        let err = t
            .facade()
            .auth
            .login("0xeve", &nonce, "deadbeef")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature));
    }
    login(&t, "0xeve").await;
}

#[tokio::test]
async fn sessions_resolve_and_revoke() {
    let t = ctx().await;
    let (token, user) = login(&t, "0xcarol").await;

    let session = t
        .facade()
        .auth
        .sessions()
        .get(&token)
        .await
        .expect("live session");
    assert_eq!(session.address, user.address);

    t.facade().auth.logout(&token).await.expect("logout");
    assert!(t.facade().auth.sessions().get(&token).await.is_none());
}

#[tokio::test]
async fn cancelled_account_blocks_login_until_swept() {
    let t = ctx().await;
    let (token, user) = login(&t, "0xdave").await;
    let user_key = dao_server::db::models::key_of(&user.id);

    t.facade().auth.cancel(&user_key, &token).await.expect("cancel");
    assert!(t.facade().auth.sessions().get(&token).await.is_none());

    let nonce = t.facade().auth.login_hello().await;
    let err = t
        .facade()
        .auth
        .login("0xdave", &nonce, &dev_signature("0xdave", &nonce))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::WaitForDelete(_)));

    let swept = t.facade().sweep_cancelled(10).await.expect("sweep");
    assert_eq!(swept, 1);

    // The address is free again; login creates a fresh account
    let (_, fresh) = login(&t, "0xdave").await;
    assert!(fresh.id != user.id);
}
