/// User service: registration, login, email validation and user CRUD

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;
use uuid::Uuid;

use super::{reject_duplicate, Page, PageRequest};
use crate::auth::authorization::{authorize_user_modification, Principal};
use crate::auth::{CredentialHasher, TokenBlacklist, TokenService};
use crate::error::{ServiceError, ServiceResult};
use crate::mail::{validation_mail, Mailer};
use crate::models::{NewUser, Role, User, UserPatch};
use crate::store::{TaskStore, UserStore};
use crate::validation::{CreateUserInput, UpdateUserInput};

/// Path under which validation tokens are redeemed
pub const VALIDATION_PATH: &str = "/v1/users/validate-email";

/// Everything the user service needs besides mail
#[derive(Clone)]
pub struct UserServiceDeps {
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub hasher: CredentialHasher,
    pub tokens: TokenService,
    pub blacklist: Arc<dyn TokenBlacklist>,
}

pub struct UserService {
    users: Arc<dyn UserStore>,
    tasks: Arc<dyn TaskStore>,
    hasher: CredentialHasher,
    tokens: TokenService,
    blacklist: Arc<dyn TokenBlacklist>,
    mailer: Option<Arc<dyn Mailer>>,
    public_url: String,
}

impl UserService {
    pub fn new(deps: UserServiceDeps) -> Self {
        Self {
            users: deps.users,
            tasks: deps.tasks,
            hasher: deps.hasher,
            tokens: deps.tokens,
            blacklist: deps.blacklist,
            mailer: None,
            public_url: String::new(),
        }
    }

    /// Enables validation emails; links are built on `public_url`
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>, public_url: impl Into<String>) -> Self {
        self.mailer = Some(mailer);
        self.public_url = public_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_mailer(&self) -> bool {
        self.mailer.is_some()
    }

    /// Registers a user and returns it with a fresh session token
    ///
    /// When a mailer is configured a validation email is sent as well. A
    /// failure to send is logged; the registration stands.
    #[instrument(skip_all, fields(name = %input.name))]
    pub async fn create(&self, input: CreateUserInput) -> ServiceResult<(User, String)> {
        let password_hash = self.hash_password(input.password).await?;

        let new_user = NewUser::registration(input.name, input.email, password_hash);
        let user = self.users.insert(new_user.clone()).await.map_err(|e| {
            reject_duplicate(
                e,
                &[("name", new_user.name.as_str()), ("email", new_user.email.as_str())],
            )
        })?;

        let token = self.tokens.issue_session(&user)?;
        tracing::info!(user_id = %user.id, "User registered");

        if self.mailer.is_some() {
            if let Err(e) = self.dispatch_validation(&user).await {
                tracing::warn!(user_id = %user.id, error = %e, "Validation email not sent");
            }
        }

        Ok((user, token))
    }

    /// Exchanges credentials for a session token
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<String> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| {
                ServiceError::BadRequest(format!("User with email {} not found", email))
            })?;

        if !self.verify_password(password, &user.password_hash).await? {
            tracing::debug!(user_id = %user.id, "Rejected login with wrong password");
            return Err(ServiceError::BadRequest("Invalid password".to_string()));
        }

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(self.tokens.issue_session(&user)?)
    }

    /// Redeems a validation token
    ///
    /// Marks the email validated and promotes a readonly user to editor.
    /// Each token works once.
    #[instrument(skip_all)]
    pub async fn validate_email(&self, token: &str) -> ServiceResult<User> {
        let claims = self
            .tokens
            .verify_email_validation(token)
            .map_err(|e| ServiceError::Unauthorized(format!("Invalid validation token: {}", e)))?;

        let email = claims
            .email
            .as_deref()
            .ok_or_else(|| ServiceError::Internal("Validation token has no email claim".to_string()))?;

        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User with email {} not found", email)))?;

        let ttl = claims
            .time_until_expiration()
            .and_then(|left| left.to_std().ok())
            .unwrap_or(Duration::from_secs(1));
        if !self.blacklist.consume(claims.jti, ttl).await? {
            return Err(ServiceError::Unauthorized(
                "Validation token has already been used".to_string(),
            ));
        }

        let patch = UserPatch {
            email_validated: Some(true),
            role: (user.role == Role::Readonly).then_some(Role::Editor),
            ..Default::default()
        };
        // A failed update hands the token back so it can be redeemed again.
        let updated = match self.users.update(user.id, patch).await {
            Ok(Some(updated)) => updated,
            outcome => {
                if let Err(e) = self.blacklist.release(claims.jti).await {
                    tracing::warn!(error = %e, jti = %claims.jti, "Failed to release validation token");
                }
                return Err(match outcome {
                    Err(e) => e.into(),
                    Ok(_) => ServiceError::not_found("User", user.id),
                });
            }
        };

        tracing::info!(user_id = %updated.id, role = %updated.role, "Email validated");
        Ok(updated)
    }

    /// Sends a fresh validation email to the caller
    #[instrument(skip_all, fields(user_id = %principal.id))]
    pub async fn send_validation_email(&self, principal: &Principal) -> ServiceResult<()> {
        if self.mailer.is_none() {
            return Err(ServiceError::Internal(
                "Email validation requested but no mailer is configured".to_string(),
            ));
        }

        let user = self.load_actor(principal).await?;
        if user.email_validated {
            return Err(ServiceError::BadRequest("Email already validated".to_string()));
        }

        self.dispatch_validation(&user).await
    }

    #[instrument(skip_all, fields(user_id = %id))]
    pub async fn find_one(&self, id: Uuid) -> ServiceResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    #[instrument(skip_all, fields(limit = request.limit, page = request.page))]
    pub async fn find_all(&self, request: PageRequest) -> ServiceResult<Page<User>> {
        let total = self.users.count().await?;
        request.check_against(total)?;

        let items = self.users.list(request.offset(), request.limit).await?;
        Ok(Page {
            items,
            total,
            page: request.page,
            limit: request.limit,
        })
    }

    /// Deletes a user together with the tasks it owns
    #[instrument(skip_all, fields(actor = %principal.id, target = %id))]
    pub async fn delete_one(&self, principal: &Principal, id: Uuid) -> ServiceResult<()> {
        let actor = self.load_actor(principal).await?;
        let target = authorize_user_modification(self.users.as_ref(), &actor, id).await?;

        let removed_tasks = self.tasks.delete_by_owner(target.id).await?;
        if !self.users.delete(target.id).await? {
            return Err(ServiceError::not_found("User", target.id));
        }

        tracing::info!(user_id = %target.id, removed_tasks, "User deleted");
        Ok(())
    }

    /// Applies a profile update
    ///
    /// Changing the email address resets the role to readonly and marks the
    /// new address unvalidated.
    #[instrument(skip_all, fields(actor = %principal.id, target = %id))]
    pub async fn update_one(
        &self,
        principal: &Principal,
        id: Uuid,
        input: UpdateUserInput,
    ) -> ServiceResult<User> {
        let actor = self.load_actor(principal).await?;
        let target = authorize_user_modification(self.users.as_ref(), &actor, id).await?;

        let mut patch = UserPatch {
            name: input.name,
            ..Default::default()
        };

        if let Some(email) = input.email {
            if !email.eq_ignore_ascii_case(&target.email) {
                patch.role = Some(Role::Readonly);
                patch.email_validated = Some(false);
            }
            patch.email = Some(email);
        }

        if let Some(password) = input.password {
            patch.password_hash = Some(self.hash_password(password).await?);
        }

        let name = patch.name.clone().unwrap_or_default();
        let email = patch.email.clone().unwrap_or_default();
        let user = self
            .users
            .update(target.id, patch)
            .await
            .map_err(|e| reject_duplicate(e, &[("name", name.as_str()), ("email", email.as_str())]))?
            .ok_or_else(|| ServiceError::not_found("User", target.id))?;

        tracing::info!(user_id = %user.id, "User updated");
        Ok(user)
    }

    /// Loads the acting user as currently stored
    ///
    /// A valid token whose user no longer exists is a bad request rather
    /// than a missing resource.
    pub async fn load_actor(&self, principal: &Principal) -> ServiceResult<User> {
        self.users.find_by_id(principal.id).await?.ok_or_else(|| {
            ServiceError::BadRequest(format!("User with id {} not found", principal.id))
        })
    }

    pub(crate) fn store(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    async fn dispatch_validation(&self, user: &User) -> ServiceResult<()> {
        let mailer = self.mailer.as_ref().ok_or_else(|| {
            ServiceError::Internal("Email validation requested but no mailer is configured".to_string())
        })?;

        let token = self.tokens.issue_email_validation(&user.email)?;
        let link = format!("{}{}/{}", self.public_url, VALIDATION_PATH, token);

        mailer
            .send_mail(validation_mail(&user.email, &user.name, &link))
            .await?;

        tracing::info!(user_id = %user.id, "Validation email sent");
        Ok(())
    }

    // Argon2 is CPU bound; keep it off the async workers
    async fn hash_password(&self, password: String) -> ServiceResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::Internal(format!("Hashing task failed: {}", e)))?
            .map_err(ServiceError::from)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> ServiceResult<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.compare(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(format!("Hashing task failed: {}", e)))?
            .map_err(ServiceError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{HashingConfig, MemoryTokenBlacklist};
    use crate::mail::{Mail, MailError};
    use crate::store::{MemoryStore, StoreError, StoreResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<Mail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_mail(&self, mail: Mail) -> Result<(), MailError> {
            self.sent.lock().await.push(mail);
            Ok(())
        }
    }

    fn deps(store: &MemoryStore) -> UserServiceDeps {
        UserServiceDeps {
            users: Arc::new(store.clone()),
            tasks: Arc::new(store.clone()),
            hasher: CredentialHasher::new(HashingConfig::minimal()),
            tokens: TokenService::new(
                "test-secret-key-at-least-32-bytes-long",
                chrono::Duration::hours(1),
                chrono::Duration::hours(1),
            ),
            blacklist: Arc::new(MemoryTokenBlacklist::new()),
        }
    }

    /// User store whose updates fail while `down` is set
    struct FlakyUpdates {
        inner: MemoryStore,
        down: AtomicBool,
    }

    #[async_trait]
    impl UserStore for FlakyUpdates {
        async fn insert(&self, new_user: NewUser) -> StoreResult<User> {
            UserStore::insert(&self.inner, new_user).await
        }

        async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
            UserStore::find_by_id(&self.inner, id).await
        }

        async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
            UserStore::find_by_email(&self.inner, email).await
        }

        async fn list(&self, offset: u64, limit: u64) -> StoreResult<Vec<User>> {
            UserStore::list(&self.inner, offset, limit).await
        }

        async fn count(&self) -> StoreResult<u64> {
            UserStore::count(&self.inner).await
        }

        async fn update(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            UserStore::update(&self.inner, id, patch).await
        }

        async fn delete(&self, id: Uuid) -> StoreResult<bool> {
            UserStore::delete(&self.inner, id).await
        }

        async fn ping(&self) -> StoreResult<()> {
            UserStore::ping(&self.inner).await
        }
    }

    fn input(name: &str) -> CreateUserInput {
        CreateUserInput {
            name: name.to_string(),
            email: format!("{}@example.com", name),
            password: "s3cret-pass".to_string(),
        }
    }

    fn token_from_link(mail: &Mail) -> String {
        let start = mail.html.find(VALIDATION_PATH).unwrap() + VALIDATION_PATH.len() + 1;
        let rest = &mail.html[start..];
        rest[..rest.find('"').unwrap()].to_string()
    }

    #[tokio::test]
    async fn test_create_and_login() {
        let store = MemoryStore::new();
        let service = UserService::new(deps(&store));

        let (user, token) = service.create(input("alice")).await.unwrap();
        assert_eq!(user.role, Role::Readonly);
        assert!(!user.email_validated);
        assert!(!token.is_empty());

        assert!(service.login("ALICE@example.com", "s3cret-pass").await.is_ok());
        assert_eq!(
            service.login("alice@example.com", "wrong-pass").await,
            Err(ServiceError::BadRequest("Invalid password".to_string()))
        );
        assert!(matches!(
            service.login("nobody@example.com", "s3cret-pass").await,
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_create_duplicate_names_value() {
        let store = MemoryStore::new();
        let service = UserService::new(deps(&store));
        service.create(input("alice")).await.unwrap();

        let mut again = input("alice");
        again.email = "other@example.com".to_string();
        assert_eq!(
            service.create(again).await.unwrap_err(),
            ServiceError::BadRequest("name 'alice' is already taken".to_string())
        );
    }

    #[tokio::test]
    async fn test_validation_flow_promotes_once() {
        let store = MemoryStore::new();
        let mailer = Arc::new(RecordingMailer::default());
        let service =
            UserService::new(deps(&store)).with_mailer(mailer.clone(), "http://localhost:8080/");

        let (user, _) = service.create(input("alice")).await.unwrap();
        let mail = mailer.sent.lock().await[0].clone();
        assert_eq!(mail.to, "alice@example.com");
        assert!(mail
            .html
            .contains("http://localhost:8080/v1/users/validate-email/"));

        let token = token_from_link(&mail);
        let validated = service.validate_email(&token).await.unwrap();
        assert_eq!(validated.id, user.id);
        assert!(validated.email_validated);
        assert_eq!(validated.role, Role::Editor);

        assert!(matches!(
            service.validate_email(&token).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_validation_keeps_admin_role() {
        let store = MemoryStore::new();
        let service = UserService::new(deps(&store));
        let (user, _) = service.create(input("root")).await.unwrap();
        UserStore::update(
            &store,
            user.id,
            UserPatch {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let token = deps(&store).tokens.issue_email_validation(&user.email).unwrap();
        let validated = service.validate_email(&token).await.unwrap();
        assert_eq!(validated.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_validate_email_unknown_address() {
        let store = MemoryStore::new();
        let service = UserService::new(deps(&store));

        let token = deps(&store)
            .tokens
            .issue_email_validation("ghost@example.com")
            .unwrap();
        assert!(matches!(
            service.validate_email(&token).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.validate_email("garbage").await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_send_validation_email_requires_mailer() {
        let store = MemoryStore::new();
        let service = UserService::new(deps(&store));
        let (user, _) = service.create(input("alice")).await.unwrap();

        let principal = Principal { id: user.id, role: user.role };
        assert!(matches!(
            service.send_validation_email(&principal).await,
            Err(ServiceError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_email_change_downgrades() {
        let store = MemoryStore::new();
        let service = UserService::new(deps(&store));
        let (user, _) = service.create(input("alice")).await.unwrap();
        UserStore::update(
            &store,
            user.id,
            UserPatch {
                role: Some(Role::Editor),
                email_validated: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let principal = Principal { id: user.id, role: Role::Editor };

        // same address with different case is not a change
        let same = service
            .update_one(
                &principal,
                user.id,
                UpdateUserInput {
                    email: Some("ALICE@example.com".to_string()),
                    ..Default::default()
                },
        )
        .await
        .unwrap();
        assert_eq!(same.role, Role::Editor);
        assert!(same.email_validated);

        let changed = service
            .update_one(
                &principal,
                user.id,
                UpdateUserInput {
                    email: Some("new@example.com".to_string()),
                    ..Default::default()
                },
        )
        .await
        .unwrap();
        assert_eq!(changed.role, Role::Readonly);
        assert!(!changed.email_validated);
        assert_eq!(changed.email, "new@example.com");
    }

    #[tokio::test]
    async fn test_password_update_rehashes() {
        let store = MemoryStore::new();
        let service = UserService::new(deps(&store));
        let (user, _) = service.create(input("alice")).await.unwrap();
        let principal = Principal { id: user.id, role: user.role };

        service
            .update_one(
                &principal,
                user.id,
                UpdateUserInput {
                    password: Some("brand-new-pass".to_string()),
                    ..Default::default()
                },
        )
        .await
        .unwrap();

        assert!(service.login("alice@example.com", "s3cret-pass").await.is_err());
        assert!(service.login("alice@example.com", "brand-new-pass").await.is_ok());
    }

    #[tokio::test]
    async fn test_actor_not_found_is_bad_request() {
        let store = MemoryStore::new();
        let service = UserService::new(deps(&store));
        let (user, _) = service.create(input("alice")).await.unwrap();

        let ghost = Principal { id: Uuid::new_v4(), role: Role::Admin };
        assert!(matches!(
            service.delete_one(&ghost, user.id).await,
            Err(ServiceError::BadRequest(_))
        ));

        let principal = Principal { id: user.id, role: user.role };
        service.delete_one(&principal, user.id).await.unwrap();
        assert!(matches!(
            service.find_one(user.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_all_pages() {
        let store = MemoryStore::new();
        let service = UserService::new(deps(&store));
        for i in 0..6 {
            service.create(input(&format!("user{}", i))).await.unwrap();
        }

        let page = service
            .find_all(PageRequest { limit: 5, page: 1 })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total, 6);

        let page = service
            .find_all(PageRequest { limit: 5, page: 2 })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);

        assert_eq!(
            service.find_all(PageRequest { limit: 5, page: 3 }).await,
            Err(ServiceError::BadRequest("Invalid page".to_string()))
        );
    }

    #[tokio::test]
    async fn test_find_all_rejects_unparsed_bounds() {
        let store = MemoryStore::new();
        let service = UserService::new(deps(&store));
        service.create(input("alice")).await.unwrap();

        assert_eq!(
            service.find_all(PageRequest { limit: 0, page: 1 }).await,
            Err(ServiceError::BadRequest("Limit must be a valid number".to_string()))
        );
        assert_eq!(
            service.find_all(PageRequest { limit: 5, page: 0 }).await,
            Err(ServiceError::BadRequest("Page must be a valid number".to_string()))
        );
    }

    #[tokio::test]
    async fn test_failed_validation_keeps_token_usable() {
        let store = MemoryStore::new();
        let flaky = Arc::new(FlakyUpdates {
            inner: store.clone(),
            down: AtomicBool::new(true),
        });
        let service = UserService::new(UserServiceDeps {
            users: flaky.clone(),
            ..deps(&store)
        });

        let (user, _) = service.create(input("alice")).await.unwrap();
        let token = deps(&store).tokens.issue_email_validation(&user.email).unwrap();

        assert!(matches!(
            service.validate_email(&token).await,
            Err(ServiceError::Unavailable(_))
        ));
        assert!(!service.find_one(user.id).await.unwrap().email_validated);

        flaky.down.store(false, Ordering::SeqCst);
        let validated = service.validate_email(&token).await.unwrap();
        assert!(validated.email_validated);
        assert_eq!(validated.role, Role::Editor);

        assert!(matches!(
            service.validate_email(&token).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
