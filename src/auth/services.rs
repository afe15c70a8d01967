use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::TokenResponse,
        jwt::TokenService,
        password::Passwords,
        repo::{StoreError, UserStore},
        repo_types::User,
    },
    mail::Mailer,
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("incorrect email or password")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("token has expired")]
    ExpiredToken,
    #[error("could not validate credentials")]
    Unauthorized,
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::Other(e) => AuthError::Internal(e),
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Registration, login, email verification and bearer resolution.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
    passwords: Passwords,
    mailer: Arc<dyn Mailer>,
    public_base_url: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: TokenService,
        passwords: Passwords,
        mailer: Arc<dyn Mailer>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            tokens,
            passwords,
            mailer,
            public_base_url: public_base_url.into(),
        }
    }

    #[cfg(test)]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AuthError::InvalidInput("Invalid email".into()));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("Password must not be empty".into()));
        }

        if self.users.find_by_email(email).await?.is_some() {
            warn!("email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        // Signing failures surface before any row exists.
        let token = self.tokens.issue_verification(email)?;
        let hash = self.passwords.hash(password)?;
        // The unique index settles concurrent registrations that both passed the lookup.
        let user = self.users.create(email, &hash).await.map_err(|e| {
            if matches!(e, StoreError::DuplicateEmail) {
                warn!("lost registration race on unique email");
            }
            AuthError::from(e)
        })?;

        self.spawn_verification_email(user.email.clone(), token);

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    fn spawn_verification_email(&self, email: String, token: String) {
        let mailer = Arc::clone(&self.mailer);
        let link = format!("{}/auth/verify?token={}", self.public_base_url, token);
        tokio::spawn(async move {
            match mailer.send_verification(&email, &link).await {
                Ok(()) => debug!("verification email sent"),
                Err(e) => warn!(error = %e, "verification email not delivered"),
            }
        });
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let email = email.trim();
        let verified = match self.users.find_by_email(email).await? {
            Some(user) => self.passwords.verify(password, &user.password_hash),
            None => self.passwords.verify_dummy(password),
        };
        if !verified {
            warn!("login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.tokens.issue_access(email)?;
        info!("user logged in");
        Ok(TokenResponse::bearer(access_token))
    }

    #[instrument(skip_all)]
    pub async fn verify_email(&self, token: &str) -> Result<User, AuthError> {
        let email = self.subject_of(token)?;
        match self.users.activate(&email).await? {
            Some(user) => {
                info!(user_id = %user.id, "email verified");
                Ok(user)
            }
            None => {
                warn!("verification token for unknown user");
                Err(AuthError::Unauthorized)
            }
        }
    }

    /// Resolves a bearer token to its user. Does not require a verified account.
    pub async fn current_user(&self, token: &str) -> Result<User, AuthError> {
        let email = self.subject_of(token)?;
        self.users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    #[instrument(skip(self, url))]
    pub async fn set_avatar(&self, user_id: Uuid, url: &str) -> Result<User, AuthError> {
        self.users
            .set_avatar_url(user_id, url)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    fn subject_of(&self, token: &str) -> Result<String, AuthError> {
        self.tokens.validate(token).map_err(|e| {
            match e {
                AuthError::ExpiredToken => debug!("token expired"),
                AuthError::InvalidToken => debug!("token invalid"),
                ref other => warn!(error = %other, "token validation failed"),
            }
            AuthError::Unauthorized
        })
    }
}

#[cfg(test)]
pub(crate) fn test_service(
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
) -> AuthService {
    use crate::auth::jwt::test_config;
    use jsonwebtoken::Algorithm;

    AuthService::new(
        users,
        TokenService::new(&test_config("test-secret", Algorithm::HS256)),
        Passwords::new().expect("passwords init"),
        mailer,
        "http://localhost:8080",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo::memory::MemoryUserStore,
        mail::fake::{FailingMailer, RecordingMailer},
    };

    fn setup() -> (
        AuthService,
        Arc<MemoryUserStore>,
        tokio::sync::mpsc::UnboundedReceiver<(String, String)>,
    ) {
        let store = Arc::new(MemoryUserStore::default());
        let (mailer, rx) = RecordingMailer::new();
        let svc = test_service(store.clone(), Arc::new(mailer));
        (svc, store, rx)
    }

    fn token_from_link(link: &str) -> String {
        link.split_once("token=").expect("token param").1.to_string()
    }

    #[tokio::test]
    async fn register_creates_inactive_user_and_mails_link() {
        let (svc, _store, mut rx) = setup();
        let user = svc.register("a@x.com", "pw").await.expect("register");
        assert_eq!(user.email, "a@x.com");
        assert!(!user.is_active);
        assert_ne!(user.password_hash, "pw");

        let (to, link) = rx.recv().await.expect("mail sent");
        assert_eq!(to, "a@x.com");
        assert!(link.starts_with("http://localhost:8080/auth/verify?token="));
        assert_eq!(svc.tokens().validate(&token_from_link(&link)).unwrap(), "a@x.com");
    }

    #[tokio::test]
    async fn register_trims_email_before_signing_link() {
        let (svc, store, mut rx) = setup();
        let user = svc.register("  a@x.com \t", "pw").await.expect("register");
        assert_eq!(user.email, "a@x.com");
        assert_eq!(store.count("a@x.com"), 1);

        let (to, link) = rx.recv().await.expect("mail sent");
        assert_eq!(to, "a@x.com");
        assert_eq!(svc.tokens().validate(&token_from_link(&link)).unwrap(), "a@x.com");
        assert!(svc.verify_email(&token_from_link(&link)).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn serialized_user_omits_password_hash() {
        let (svc, _store, _rx) = setup();
        let user = svc.register("a@x.com", "pw").await.unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["is_active"], false);
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let (svc, _store, _rx) = setup();
        assert!(matches!(
            svc.register("not-an-email", "pw").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.register("a@x.com", "").await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn login_works_before_verification() {
        let (svc, _store, _rx) = setup();
        svc.register("a@x.com", "pw").await.unwrap();
        let resp = svc.login("a@x.com", "pw").await.expect("login");
        assert_eq!(resp.token_type, "bearer");
        assert_eq!(svc.tokens().validate(&resp.access_token).unwrap(), "a@x.com");
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (svc, _store, _rx) = setup();
        svc.register("a@x.com", "pw").await.unwrap();

        let wrong_password = svc.login("a@x.com", "nope").await.unwrap_err();
        let unknown_user = svc.login("b@x.com", "pw").await.unwrap_err();
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_without_second_row() {
        let (svc, store, _rx) = setup();
        svc.register("a@x.com", "pw").await.unwrap();
        let err = svc.register("a@x.com", "other").await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
        assert_eq!(store.count("a@x.com"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_leave_one_row() {
        let (svc, store, _rx) = setup();
        let svc = Arc::new(svc);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = Arc::clone(&svc);
                tokio::spawn(async move { svc.register("race@x.com", "pw").await })
            })
            .collect();

        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AuthError::DuplicateEmail) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.count("race@x.com"), 1);
    }

    #[tokio::test]
    async fn mail_failure_does_not_fail_registration() {
        let store = Arc::new(MemoryUserStore::default());
        let svc = test_service(store.clone(), Arc::new(FailingMailer));
        let user = svc.register("a@x.com", "pw").await.expect("register");
        tokio::task::yield_now().await;
        assert_eq!(store.count(&user.email), 1);
    }

    #[tokio::test]
    async fn verify_email_is_idempotent() {
        let (svc, store, mut rx) = setup();
        svc.register("a@x.com", "pw").await.unwrap();
        let (_, link) = rx.recv().await.unwrap();
        let token = token_from_link(&link);

        assert!(svc.verify_email(&token).await.expect("first").is_active);
        assert!(svc.verify_email(&token).await.expect("second").is_active);
        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn tampered_verification_token_leaves_user_inactive() {
        let (svc, store, mut rx) = setup();
        svc.register("a@x.com", "pw").await.unwrap();
        let (_, link) = rx.recv().await.unwrap();
        let original = token_from_link(&link);
        let (head, sig) = original.rsplit_once('.').unwrap();
        let flipped = if sig.starts_with('A') { 'B' } else { 'A' };
        let token = format!("{head}.{flipped}{}", &sig[1..]);

        let err = svc.verify_email(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(!user.is_active);
    }

    #[tokio::test]
    async fn verify_email_for_unknown_subject_is_unauthorized() {
        let (svc, _store, _rx) = setup();
        let token = svc.tokens().issue_verification("ghost@x.com").unwrap();
        assert!(matches!(
            svc.verify_email(&token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn current_user_rejects_garbage_expired_and_unknown() {
        let (svc, _store, _rx) = setup();
        assert!(matches!(
            svc.current_user("garbage").await,
            Err(AuthError::Unauthorized)
        ));

        let expired = svc
            .tokens()
            .issue("a@x.com", std::time::Duration::ZERO)
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert!(matches!(
            svc.current_user(&expired).await,
            Err(AuthError::Unauthorized)
        ));

        let unknown = svc.tokens().issue_access("ghost@x.com").unwrap();
        assert!(matches!(
            svc.current_user(&unknown).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn end_to_end_register_login_current_user_verify() {
        let (svc, _store, mut rx) = setup();

        let registered = svc.register("a@x.com", "pw").await.unwrap();
        assert!(!registered.is_active);

        let login = svc.login("a@x.com", "pw").await.unwrap();
        let me = svc.current_user(&login.access_token).await.unwrap();
        assert_eq!(me.email, "a@x.com");
        assert!(!me.is_active);

        let (_, link) = rx.recv().await.unwrap();
        svc.verify_email(&token_from_link(&link)).await.unwrap();
        let me = svc.current_user(&login.access_token).await.unwrap();
        assert!(me.is_active);
    }

    #[tokio::test]
    async fn set_avatar_updates_url() {
        let (svc, _store, _rx) = setup();
        let user = svc.register("a@x.com", "pw").await.unwrap();
        let updated = svc
            .set_avatar(user.id, "https://cdn.local/avatars/a.png")
            .await
            .unwrap();
        assert_eq!(updated.avatar_url.as_deref(), Some("https://cdn.local/avatars/a.png"));
        assert!(matches!(
            svc.set_avatar(Uuid::new_v4(), "x").await,
            Err(AuthError::Unauthorized)
        ));
    }
}
