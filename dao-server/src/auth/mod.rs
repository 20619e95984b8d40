//! Wallet-signature authentication
//!
//! Login is a two-step dance: `login_hello` hands out a short-lived
//! nonce, the wallet signs it, and `login` verifies the signature and
//! issues a session token. Signature verification itself is an
//! injected capability; deployments wire in their chain's scheme.

pub mod extract;
pub mod session;

pub use extract::{OptionalPrincipal, Principal, SESSION_HEADER};
pub use session::SessionStore;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::cache::{captcha_key, login_err_key, KvStore};
use crate::chat::ChatLinkManager;
use crate::core::config::Config;
use crate::db::models::{key_of, User};
use crate::db::repository::UserRepository;
use crate::utils::time::now_ts;
use crate::utils::validation::normalize_address;
use crate::utils::{AppError, AppResult};
use session::Session;

const CAPTCHA_TTL: Duration = Duration::from_secs(300);

/// Chain-specific signature check, injected at wiring time
#[async_trait]
pub trait WalletVerifier: Send + Sync {
    async fn verify(&self, address: &str, nonce: &str, signature: &str) -> AppResult<bool>;
}

pub type SharedVerifier = Arc<dyn WalletVerifier>;

/// Development verifier: the signature is sha256("<address>:<nonce>")
/// hex-encoded. Useful for local clients and tests; real deployments
/// swap in their chain's recovery scheme.
pub struct DevWalletVerifier;

#[async_trait]
impl WalletVerifier for DevWalletVerifier {
    async fn verify(&self, address: &str, nonce: &str, signature: &str) -> AppResult<bool> {
        let expected = hex::encode(Sha256::digest(format!("{address}:{nonce}").as_bytes()));
        Ok(signature.eq_ignore_ascii_case(&expected))
    }
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
    /// True on first login, when the account was just created
    pub created: bool,
}

#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    sessions: SessionStore,
    kv: Arc<dyn KvStore>,
    verifier: SharedVerifier,
    chat: ChatLinkManager,
    login_err_max: i64,
    login_err_window: Duration,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        sessions: SessionStore,
        kv: Arc<dyn KvStore>,
        verifier: SharedVerifier,
        chat: ChatLinkManager,
        config: &Config,
    ) -> Self {
        Self {
            users,
            sessions,
            kv,
            verifier,
            chat,
            login_err_max: config.login_err_max,
            login_err_window: Duration::from_secs(config.login_err_window_secs),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Step one: issue a signing nonce
    pub async fn login_hello(&self) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        self.kv
            .set(&captcha_key(&nonce), "1".to_string(), Some(CAPTCHA_TTL))
            .await;
        nonce
    }

    /// Step two: verify the signed nonce and open a session
    pub async fn login(
        &self,
        address: &str,
        nonce: &str,
        signature: &str,
    ) -> AppResult<LoginOutcome> {
        let address = normalize_address(address);
        let err_key = login_err_key(&address);
        if let Some(count) = self.kv.get(&err_key).await {
            if count.parse::<i64>().unwrap_or(0) >= self.login_err_max {
                return Err(AppError::TooManyLoginError);
            }
        }

        let nonce_key = captcha_key(nonce);
        if !self.kv.exists(&nonce_key).await {
            return Err(AppError::invalid("Unknown or expired nonce"));
        }
        self.kv.del(&nonce_key).await;

        if !self.verifier.verify(&address, nonce, signature).await? {
            let count = self.kv.incr_by(&err_key, 1).await;
            if count == 1 {
                // First failure opens the throttle window
                self.kv
                    .set(&err_key, "1".to_string(), Some(self.login_err_window))
                    .await;
            }
            return Err(AppError::InvalidSignature);
        }
        self.kv.del(&err_key).await;

        let (user, created) = match self.users.find_by_address(&address).await? {
            Some(user) if user.is_del => {
                return Err(AppError::WaitForDelete(address));
            }
            Some(user) => {
                self.users.touch_login(&key_of(&user.id)).await?;
                (user, false)
            }
            None => {
                let user = self.users.create(User::new(address.clone(), now_ts())).await?;
                let user_key = key_of(&user.id);
                // Chat identity is best-effort on first login
                if let Err(e) = self
                    .chat
                    .link_user(&user_key, &user.address, &user.nickname)
                    .await
                {
                    tracing::warn!(address = %user.address, error = %e,
                        "Chat identity creation failed");
                }
                (user, true)
            }
        };

        let token = self
            .sessions
            .issue(Session {
                address: user.address.clone(),
                user_key: key_of(&user.id),
                nickname: user.nickname.clone(),
            })
            .await;
        Ok(LoginOutcome {
            token,
            user,
            created,
        })
    }

    pub async fn logout(&self, token: &str) -> AppResult<()> {
        self.sessions.revoke(token).await;
        Ok(())
    }

    /// Cancellation: mark and wait for the sweeper
    pub async fn cancel(&self, user_key: &str, token: &str) -> AppResult<()> {
        self.users.mark_cancelled(user_key).await?;
        self.sessions.revoke(token).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dev_verifier_accepts_matching_signature() {
        let v = DevWalletVerifier;
        let sig = hex::encode(Sha256::digest(b"0xabc:nonce1"));
        assert!(v.verify("0xabc", "nonce1", &sig).await.unwrap());
        assert!(!v.verify("0xabc", "nonce1", "deadbeef").await.unwrap());
    }
}
