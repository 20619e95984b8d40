//! Shared test harness: in-memory database, mock payment gateway,
//! noop chat gateway, everything wired through the real state assembly.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tempfile::TempDir;

use dao_server::auth::{DevWalletVerifier, SharedVerifier};
use dao_server::core::{Config, ServerState};
use dao_server::facade::Facade;
use dao_server::pay::{MockPayGateway, TransferPurpose};

pub struct TestCtx {
    pub state: ServerState,
    pub gateway: Arc<MockPayGateway>,
    _tmp: TempDir,
}

impl TestCtx {
    pub fn facade(&self) -> &Facade {
        &self.state.facade
    }
}

pub async fn ctx() -> TestCtx {
    ctx_with(|_| {}).await
}

pub async fn ctx_with(tweak: impl FnOnce(&mut Config)) -> TestCtx {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut config = Config::with_overrides(tmp.path().to_string_lossy().to_string(), 0);
    config.platform_address = "0xplatform".to_string();
    tweak(&mut config);

    let db = dao_server::db::connect_memory().await.expect("memory db");
    let gateway = MockPayGateway::new();
    let verifier: SharedVerifier = Arc::new(DevWalletVerifier);
    let state = ServerState::assemble(config, db, gateway.clone(), verifier).expect("assemble");
    TestCtx {
        state,
        gateway,
        _tmp: tmp,
    }
}

/// Signature the dev verifier accepts for `address` and `nonce`
pub fn dev_signature(address: &str, nonce: &str) -> String {
    hex::encode(Sha256::digest(format!("{address}:{nonce}").as_bytes()))
}

/// Full login round-trip, returning (token, user)
pub async fn login(ctx: &TestCtx, address: &str) -> (String, dao_server::db::models::User) {
    let nonce = ctx.facade().auth.login_hello().await;
    let outcome = ctx
        .facade()
        .auth
        .login(address, &nonce, &dev_signature(address, &nonce))
        .await
        .expect("login");
    (outcome.token, outcome.user)
}

/// Background settler: answers every red-packet funding transfer with
/// a success webhook, the way the real gateway would
pub fn auto_settle(facade: Facade, gateway: Arc<MockPayGateway>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut done: HashSet<String> = HashSet::new();
        loop {
            for req in gateway.sent() {
                if req.purpose == TransferPurpose::SendRedpacket && done.insert(req.order_id.clone())
                {
                    let tx_id = format!("tx_{}", req.order_id);
                    let _ = facade
                        .redpackets
                        .handle_notify(&req.order_id, &tx_id, true)
                        .await;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
}
