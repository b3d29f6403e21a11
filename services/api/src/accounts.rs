//! services/api/src/accounts.rs
//!
//! Account and login-session management.
//!
//! A login is tried against the demo accounts first, then against locally
//! registered accounts, then (for e-mail identifiers) against the external auth
//! provider when one is configured. Every successful login yields a bearer
//! token recorded in the key-value store.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use learnhub_core::demo::{demo_login, demo_users, is_demo_username, DemoLogin};
use learnhub_core::domain::{AuthSession, LocalAccount, Preferences, Role, User};
use learnhub_core::learning::LearningService;
use learnhub_core::ports::{AuthProvider, PortError, PortResult, RemoteDatabase, SignUpRequest, Table};
use learnhub_core::records::{keys, Records};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub avatar: Option<String>,
    pub preferences: Option<Preferences>,
}

#[derive(Clone)]
pub struct AccountService {
    records: Records,
    learning: LearningService,
    provider: Option<Arc<dyn AuthProvider>>,
    remote_db: Option<Arc<dyn RemoteDatabase>>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        records: Records,
        learning: LearningService,
        provider: Option<Arc<dyn AuthProvider>>,
        remote_db: Option<Arc<dyn RemoteDatabase>>,
        session_ttl_days: i64,
    ) -> Self {
        Self {
            records,
            learning,
            provider,
            remote_db,
            session_ttl: Duration::days(session_ttl_days),
        }
    }

    //=====================================================================================
    // Login / Logout
    //=====================================================================================

    pub async fn login(&self, identifier: &str, password: &str) -> PortResult<AuthSession> {
        let identifier = identifier.trim();

        // 1. Demo shortcut
        match demo_login(identifier, password) {
            DemoLogin::Accepted(user) => {
                info!(username = %user.username, role = user.role.as_str(), "demo login");
                return self.open_session(user, None).await;
            }
            DemoLogin::Rejected => {
                warn!(identifier, "demo login rejected");
                return Err(PortError::Unauthorized);
            }
            DemoLogin::NotDemo => {}
        }

        // 2. Locally registered accounts
        if let Some(account) = self.find_local_account(identifier).await? {
            if !verify_password(password, &account.hashed_password)? {
                return Err(PortError::Unauthorized);
            }
            info!(user_id = %account.user.id, "local login");
            return self.open_session(account.user, None).await;
        }

        // 3. External provider
        match &self.provider {
            Some(provider) if identifier.contains('@') => {
                let remote = provider.sign_in(identifier, password).await?;
                info!(user_id = %remote.user.id, "provider login");
                self.open_session(remote.user, Some(remote.access_token)).await
            }
            _ => Err(PortError::Unauthorized),
        }
    }

    pub async fn logout(&self, token: &str) -> PortResult<()> {
        let owned = token.to_string();
        let removed = self
            .records
            .update(keys::AUTH_SESSIONS, move |sessions: &mut Vec<AuthSession>| {
                let index = sessions.iter().position(|s| s.token == owned);
                Ok(index.map(|i| sessions.remove(i)))
            })
            .await?
            .ok_or(PortError::Unauthorized)?;

        if let (Some(provider), Some(provider_token)) = (&self.provider, &removed.provider_token) {
            if let Err(e) = provider.sign_out(provider_token).await {
                warn!("provider sign-out failed: {}", e);
            }
        }
        info!(user_id = %removed.user.id, "logged out");
        Ok(())
    }

    /// Resolves a bearer token to its session. Expired sessions are dropped.
    pub async fn authenticate(&self, token: &str) -> PortResult<AuthSession> {
        let sessions: Vec<AuthSession> = self.records.load(keys::AUTH_SESSIONS).await?;
        let session = sessions
            .into_iter()
            .find(|s| s.token == token)
            .ok_or(PortError::Unauthorized)?;
        if session.expires_at <= Utc::now() {
            self.purge_expired().await?;
            return Err(PortError::Unauthorized);
        }
        Ok(session)
    }

    /// Like [`authenticate`](Self::authenticate), but also re-checks provider
    /// sessions with the provider and refreshes the cached user.
    pub async fn restore(&self, token: &str) -> PortResult<AuthSession> {
        let session = self.authenticate(token).await?;
        let (Some(provider), Some(provider_token)) = (&self.provider, &session.provider_token) else {
            return Ok(session);
        };
        match provider.get_user(provider_token).await {
            Ok(mut user) => {
                // Local profile edits win over provider metadata.
                user.preferences = session.user.preferences.clone();
                if session.user.avatar.is_some() {
                    user.avatar = session.user.avatar.clone();
                }
                self.replace_session_user(&user).await?;
                Ok(AuthSession { user, ..session })
            }
            Err(PortError::Unauthorized) => {
                self.logout(token).await.ok();
                Err(PortError::Unauthorized)
            }
            Err(e) => Err(e),
        }
    }

    async fn open_session(&self, user: User, provider_token: Option<String>) -> PortResult<AuthSession> {
        let session = AuthSession {
            token: Uuid::new_v4().to_string(),
            user,
            expires_at: Utc::now() + self.session_ttl,
            provider_token,
        };
        let stored = session.clone();
        self.records
            .update(keys::AUTH_SESSIONS, move |sessions: &mut Vec<AuthSession>| {
                let now = Utc::now();
                sessions.retain(|s| s.expires_at > now);
                sessions.push(stored);
                Ok(())
            })
            .await?;
        Ok(session)
    }

    async fn purge_expired(&self) -> PortResult<()> {
        self.records
            .update(keys::AUTH_SESSIONS, |sessions: &mut Vec<AuthSession>| {
                let now = Utc::now();
                sessions.retain(|s| s.expires_at > now);
                Ok(())
            })
            .await
    }

    //=====================================================================================
    // Registration
    //=====================================================================================

    pub async fn register(&self, registration: Registration) -> PortResult<AuthSession> {
        let registration = validate(registration)?;

        if let Some(provider) = &self.provider {
            let remote = provider
                .sign_up(&SignUpRequest {
                    email: registration.email.clone(),
                    password: registration.password.clone(),
                    username: registration.username.clone(),
                    role: registration.role,
                })
                .await?;
            self.mirror_profile(&remote.user, true).await;
            info!(user_id = %remote.user.id, "registered with provider");
            return self.open_session(remote.user, Some(remote.access_token)).await;
        }

        let user = User {
            id: Uuid::new_v4(),
            username: registration.username,
            email: registration.email,
            role: registration.role,
            avatar: None,
            preferences: Preferences::default(),
            progress: Default::default(),
        };
        let account = LocalAccount {
            user: user.clone(),
            hashed_password: hash_password(&registration.password)?,
        };
        self.records
            .update(keys::REGISTERED_USERS, move |accounts: &mut Vec<LocalAccount>| {
                if accounts
                    .iter()
                    .any(|a| a.user.username.eq_ignore_ascii_case(&account.user.username))
                {
                    return Err(PortError::Conflict("Username is already taken".to_string()));
                }
                if accounts
                    .iter()
                    .any(|a| a.user.email.eq_ignore_ascii_case(&account.user.email))
                {
                    return Err(PortError::Conflict("Email is already registered".to_string()));
                }
                accounts.push(account);
                Ok(())
            })
            .await?;
        self.mirror_profile(&user, true).await;
        info!(user_id = %user.id, "registered locally");
        self.open_session(user, None).await
    }

    async fn find_local_account(&self, identifier: &str) -> PortResult<Option<LocalAccount>> {
        let accounts: Vec<LocalAccount> = self.records.load(keys::REGISTERED_USERS).await?;
        Ok(accounts.into_iter().find(|a| {
            a.user.username.eq_ignore_ascii_case(identifier) || a.user.email.eq_ignore_ascii_case(identifier)
        }))
    }

    //=====================================================================================
    // Profiles
    //=====================================================================================

    /// The user with `progress` filled in from their enrollments.
    pub async fn profile(&self, user: &User) -> PortResult<User> {
        let mut user = user.clone();
        user.progress = self
            .learning
            .enrollments_for(user.id)
            .await?
            .into_iter()
            .map(|e| (e.course_id, e.progress))
            .collect();
        Ok(user)
    }

    pub async fn update_profile(&self, user: &User, update: ProfileUpdate) -> PortResult<User> {
        let mut updated = user.clone();
        if let Some(username) = update.username {
            let username = username.trim().to_string();
            validate_username(&username)?;
            let renamed = !username.eq_ignore_ascii_case(&user.username);
            if renamed
                && (is_demo_username(&username) || self.find_local_account(&username).await?.is_some())
            {
                return Err(PortError::Conflict("Username is already taken".to_string()));
            }
            updated.username = username;
        }
        if let Some(avatar) = update.avatar {
            let avatar = avatar.trim().to_string();
            updated.avatar = (!avatar.is_empty()).then_some(avatar);
        }
        if let Some(preferences) = update.preferences {
            updated.preferences = preferences;
        }

        let local = updated.clone();
        self.records
            .update(keys::REGISTERED_USERS, move |accounts: &mut Vec<LocalAccount>| {
                if let Some(account) = accounts.iter_mut().find(|a| a.user.id == local.id) {
                    account.user = local;
                }
                Ok(())
            })
            .await?;
        self.replace_session_user(&updated).await?;
        self.mirror_profile(&updated, false).await;
        info!(user_id = %updated.id, "profile updated");
        self.profile(&updated).await
    }

    async fn replace_session_user(&self, user: &User) -> PortResult<()> {
        let user = user.clone();
        self.records
            .update(keys::AUTH_SESSIONS, move |sessions: &mut Vec<AuthSession>| {
                for session in sessions.iter_mut().filter(|s| s.user.id == user.id) {
                    session.user = user.clone();
                }
                Ok(())
            })
            .await
    }

    /// Best-effort copy of the profile into the remote `users` table.
    async fn mirror_profile(&self, user: &User, created: bool) {
        let Some(db) = &self.remote_db else {
            return;
        };
        let row = match serde_json::to_value(user) {
            Ok(row) => row,
            Err(e) => {
                warn!("failed to encode profile for mirroring: {}", e);
                return;
            }
        };
        let result = if created {
            db.insert(Table::Users, user.id, row).await
        } else {
            match db.update(Table::Users, user.id, row.clone()).await {
                Err(PortError::NotFound(_)) => db.insert(Table::Users, user.id, row).await,
                other => other,
            }
        };
        if let Err(e) = result {
            warn!(user_id = %user.id, "failed to mirror profile: {}", e);
        }
    }

    /// Every account known locally: demo accounts plus local registrations.
    pub async fn known_users(&self) -> PortResult<Vec<User>> {
        let accounts: Vec<LocalAccount> = self.records.load(keys::REGISTERED_USERS).await?;
        let mut users = demo_users();
        users.extend(accounts.into_iter().map(|a| a.user));
        Ok(users)
    }
}

//=========================================================================================
// Validation and Password Hashing
//=========================================================================================

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"))
}

fn validate_username(username: &str) -> PortResult<()> {
    let valid_len = (3..=32).contains(&username.chars().count());
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(PortError::InvalidInput(
            "Username must be 3-32 letters, digits, '_' or '.'".to_string(),
        ))
    }
}

fn validate(mut registration: Registration) -> PortResult<Registration> {
    registration.username = registration.username.trim().to_string();
    registration.email = registration.email.trim().to_lowercase();

    validate_username(&registration.username)?;
    if is_demo_username(&registration.username) {
        return Err(PortError::Conflict("Username is already taken".to_string()));
    }
    if !email_pattern().is_match(&registration.email) {
        return Err(PortError::InvalidInput("Email address is not valid".to_string()));
    }
    if registration.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if !registration.role.can_self_register() {
        return Err(PortError::InvalidInput(format!(
            "The {} role cannot be self-assigned",
            registration.role.as_str()
        )));
    }
    Ok(registration)
}

fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PortError::Unexpected(format!("Failed to hash password: {e}")))
}

fn verify_password(password: &str, hashed: &str) -> PortResult<bool> {
    let parsed = PasswordHash::new(hashed)
        .map_err(|e| PortError::Unexpected(format!("Stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use learnhub_core::memory::MemoryStore;
    use learnhub_core::ports::ProviderSession;
    use std::sync::Mutex;

    fn service_with(provider: Option<Arc<dyn AuthProvider>>) -> AccountService {
        let records = Records::new(Arc::new(MemoryStore::new()));
        AccountService::new(
            records.clone(),
            LearningService::new(records),
            provider,
            None,
            30,
        )
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            role: Role::Student,
        }
    }

    /// Provider double that accepts one fixed account.
    struct FakeProvider {
        user: User,
        signed_out: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AuthProvider for FakeProvider {
        async fn sign_in(&self, email: &str, password: &str) -> PortResult<ProviderSession> {
            if email == self.user.email && password == "remote-pass" {
                Ok(ProviderSession {
                    access_token: "remote-token".to_string(),
                    user: self.user.clone(),
                })
            } else {
                Err(PortError::Unauthorized)
            }
        }

        async fn sign_up(&self, request: &SignUpRequest) -> PortResult<ProviderSession> {
            Ok(ProviderSession {
                access_token: "new-token".to_string(),
                user: User {
                    id: Uuid::new_v4(),
                    username: request.username.clone(),
                    email: request.email.clone(),
                    role: request.role,
                    avatar: None,
                    preferences: Preferences::default(),
                    progress: Default::default(),
                },
            })
        }

        async fn get_user(&self, access_token: &str) -> PortResult<User> {
            if access_token == "remote-token" {
                Ok(self.user.clone())
            } else {
                Err(PortError::Unauthorized)
            }
        }

        async fn sign_out(&self, access_token: &str) -> PortResult<()> {
            self.signed_out.lock().unwrap().push(access_token.to_string());
            Ok(())
        }
    }

    fn fake_provider() -> Arc<FakeProvider> {
        Arc::new(FakeProvider {
            user: User {
                id: Uuid::new_v4(),
                username: "remote".to_string(),
                email: "remote@example.com".to_string(),
                role: Role::Teacher,
                avatar: None,
                preferences: Preferences::default(),
                progress: Default::default(),
            },
            signed_out: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn demo_student_login_yields_student_session() {
        let service = service_with(None);
        let session = service.login("student", "12345678").await.unwrap();
        assert_eq!(session.user.role, Role::Student);
        let resolved = service.authenticate(&session.token).await.unwrap();
        assert_eq!(resolved.user.id, session.user.id);
    }

    #[tokio::test]
    async fn demo_login_with_wrong_password_fails() {
        let service = service_with(Some(fake_provider()));
        assert!(matches!(
            service.login("student", "87654321").await,
            Err(PortError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn harsh_logs_in_as_mentor_admin_in_any_case() {
        let service = service_with(None);
        let session = service.login("harsh", "12345678").await.unwrap();
        assert_eq!(session.user.role, Role::MentorAdmin);
    }

    #[tokio::test]
    async fn local_registration_then_login_by_username_or_email() {
        let service = service_with(None);
        service
            .register(registration("ada_l", "Ada@Example.com"))
            .await
            .unwrap();

        let by_name = service.login("ADA_L", "correct horse").await.unwrap();
        let by_email = service.login("ada@example.com", "correct horse").await.unwrap();
        assert_eq!(by_name.user.id, by_email.user.id);
        assert_eq!(by_name.user.email, "ada@example.com");

        assert!(matches!(
            service.login("ada_l", "wrong password").await,
            Err(PortError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn registration_rejects_duplicates_demo_names_and_admin_roles() {
        let service = service_with(None);
        service.register(registration("ada_l", "ada@example.com")).await.unwrap();

        assert!(matches!(
            service.register(registration("Ada_L", "other@example.com")).await,
            Err(PortError::Conflict(_))
        ));
        assert!(matches!(
            service.register(registration("someone", "ADA@example.com")).await,
            Err(PortError::Conflict(_))
        ));
        assert!(matches!(
            service.register(registration("Harsh", "h@example.com")).await,
            Err(PortError::Conflict(_))
        ));

        let mut admin = registration("boss", "boss@example.com");
        admin.role = Role::Admin;
        assert!(matches!(service.register(admin).await, Err(PortError::InvalidInput(_))));

        let mut short = registration("shorty", "s@example.com");
        short.password = "1234".to_string();
        assert!(matches!(service.register(short).await, Err(PortError::InvalidInput(_))));

        assert!(matches!(
            service.register(registration("bad", "not-an-email")).await,
            Err(PortError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn logout_invalidates_token() {
        let service = service_with(None);
        let session = service.login("mentor", "12345678").await.unwrap();
        service.logout(&session.token).await.unwrap();
        assert!(matches!(
            service.authenticate(&session.token).await,
            Err(PortError::Unauthorized)
        ));
        assert!(matches!(
            service.logout(&session.token).await,
            Err(PortError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn provider_login_is_used_for_unknown_emails() {
        let provider = fake_provider();
        let service = service_with(Some(provider.clone()));

        let session = service.login("remote@example.com", "remote-pass").await.unwrap();
        assert_eq!(session.user.role, Role::Teacher);
        assert_eq!(session.provider_token.as_deref(), Some("remote-token"));

        let restored = service.restore(&session.token).await.unwrap();
        assert_eq!(restored.user.id, provider.user.id);

        service.logout(&session.token).await.unwrap();
        assert_eq!(*provider.signed_out.lock().unwrap(), vec!["remote-token".to_string()]);
    }

    #[tokio::test]
    async fn registration_goes_to_provider_when_configured() {
        let service = service_with(Some(fake_provider()));
        let session = service
            .register(registration("newbie", "newbie@example.com"))
            .await
            .unwrap();
        assert_eq!(session.provider_token.as_deref(), Some("new-token"));
        // Nothing was written to the local registry.
        assert_eq!(service.known_users().await.unwrap().len(), demo_users().len());
    }

    #[tokio::test]
    async fn profile_update_is_visible_through_the_session() {
        let service = service_with(None);
        let session = service.register(registration("ada_l", "ada@example.com")).await.unwrap();

        let updated = service
            .update_profile(
                &session.user,
                ProfileUpdate {
                    username: Some("ada_lovelace".to_string()),
                    avatar: Some("https://example.com/ada.png".to_string()),
                    preferences: Some(Preferences {
                        theme: "dark".to_string(),
                        ..Preferences::default()
                    }),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "ada_lovelace");

        let resolved = service.authenticate(&session.token).await.unwrap();
        assert_eq!(resolved.user.preferences.theme, "dark");
        assert!(service.login("ada_lovelace", "correct horse").await.is_ok());

        assert!(matches!(
            service
                .update_profile(
                    &resolved.user,
                    ProfileUpdate {
                        username: Some("student".to_string()),
                        ..Default::default()
                    }
                )
                .await,
            Err(PortError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn profile_reports_enrollment_progress() {
        let records = Records::new(Arc::new(MemoryStore::new()));
        let learning = LearningService::new(records.clone());
        let service = AccountService::new(records, learning.clone(), None, None, 30);
        let session = service.login("student", "12345678").await.unwrap();

        learning
            .complete_lesson(session.user.id, "career-mentoring", "cme-1")
            .await
            .unwrap();
        let profile = service.profile(&session.user).await.unwrap();
        assert_eq!(profile.progress.get("career-mentoring"), Some(&50));
    }
}
