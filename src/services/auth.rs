//! Session tokens, signup and login

use chrono::{Duration, Utc};
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        identity::{LoginRequest, SignupRequest},
        Identity, Librarian, Member, Role, SessionClaims,
    },
    repository::Repository,
    services::credentials,
};

/// Issues and verifies signed, expiring session tokens
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            ttl: Duration::hours(config.jwt_expiration_hours as i64),
        }
    }

    pub fn issue(&self, identity: Identity) -> AppResult<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: identity.subject_id,
            role: identity.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        claims
            .create_token(&self.secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Bad signature, malformed token and expiry all map to `InvalidToken`
    pub fn verify(&self, token: &str) -> AppResult<Identity> {
        SessionClaims::from_token(token, &self.secret)
            .map(|claims| claims.identity())
            .map_err(|e| AppError::InvalidToken(e.to_string()))
    }

    /// Verify and require a role
    pub fn verify_role(&self, token: &str, role: Role) -> AppResult<Identity> {
        let identity = self.verify(token)?;
        if identity.role != role {
            return Err(AppError::InvalidToken(format!(
                "{} token used where {} is required",
                identity.role, role
            )));
        }
        Ok(identity)
    }
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(repository: Repository, config: &AuthConfig) -> Self {
        Self {
            repository,
            tokens: TokenIssuer::new(config),
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Register a new member
    pub async fn signup_member(&self, signup: &SignupRequest) -> AppResult<Member> {
        signup.validate()?;

        if self.repository.members.find_by_username(&signup.username).await?.is_some() {
            return Err(AppError::Conflict("Username already registered".to_string()));
        }

        let hash = credentials::hash_password(&signup.password)?;
        let member = self.repository.members.create(signup, &hash).await?;
        tracing::info!(member_id = %member.id, "Member signed up");
        Ok(member)
    }

    /// Register a new librarian
    pub async fn signup_librarian(&self, signup: &SignupRequest) -> AppResult<Librarian> {
        signup.validate()?;

        if self
            .repository
            .librarians
            .find_by_username(&signup.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already registered".to_string()));
        }

        let hash = credentials::hash_password(&signup.password)?;
        let librarian = self.repository.librarians.create(signup, &hash).await?;
        tracing::info!(librarian_id = %librarian.id, "Librarian signed up");
        Ok(librarian)
    }

    /// Check credentials for the given role and issue a session token
    pub async fn login(&self, role: Role, login: &LoginRequest) -> AppResult<(String, Identity)> {
        login.validate()?;

        let account = match role {
            Role::Member => self
                .repository
                .members
                .find_by_username(&login.username)
                .await?
                .map(|m| (m.id, m.password_hash)),
            Role::Librarian => self
                .repository
                .librarians
                .find_by_username(&login.username)
                .await?
                .map(|l| (l.id, l.password_hash)),
        };

        let verified = match &account {
            Some((_, hash)) => credentials::verify_password(&login.password, hash),
            None => credentials::verify_absent(&login.password),
        };

        let subject_id = match account {
            Some((subject_id, _)) if verified => subject_id,
            _ => return Err(AppError::Authentication("Invalid username or password".to_string())),
        };

        let identity = Identity { role, subject_id };
        let token = self.tokens.issue(identity)?;
        tracing::info!(%role, subject_id = %subject_id, "Login succeeded");
        Ok((token, identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use uuid::Uuid;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_hours: 1,
            cookie_name: "token".to_string(),
        }
    }

    fn service() -> AuthService {
        AuthService::new(Repository::new(Arc::new(MemoryStore::new())), &config())
    }

    fn signup() -> SignupRequest {
        SignupRequest {
            name: "Ada".to_string(),
            username: "ada@example.org".to_string(),
            password: "lovelace".to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = TokenIssuer::new(&config());
        let identity = Identity {
            role: Role::Member,
            subject_id: Uuid::new_v4(),
        };

        let token = tokens.issue(identity).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), identity);
        assert_eq!(tokens.verify_role(&token, Role::Member).unwrap(), identity);
    }

    #[test]
    fn test_member_token_is_rejected_for_librarian_role() {
        let tokens = TokenIssuer::new(&config());
        let token = tokens
            .issue(Identity {
                role: Role::Member,
                subject_id: Uuid::new_v4(),
            })
            .unwrap();

        let err = tokens.verify_role(&token, Role::Librarian).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken(_)));
    }

    #[test]
    fn test_tampered_and_foreign_tokens_are_rejected() {
        let tokens = TokenIssuer::new(&config());
        let token = tokens
            .issue(Identity {
                role: Role::Librarian,
                subject_id: Uuid::new_v4(),
            })
            .unwrap();

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(tokens.verify(&tampered), Err(AppError::InvalidToken(_))));
        assert!(matches!(tokens.verify("not.a.token"), Err(AppError::InvalidToken(_))));

        let other = TokenIssuer::new(&AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..config()
        });
        assert!(matches!(other.verify(&token), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            role: Role::Member,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = claims.create_token("test-secret").unwrap();

        let tokens = TokenIssuer::new(&config());
        assert!(matches!(tokens.verify(&token), Err(AppError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let auth = service();
        let member = auth.signup_member(&signup()).await.unwrap();
        assert_ne!(member.password_hash, "lovelace");

        let (token, identity) = auth
            .login(
                Role::Member,
                &LoginRequest {
                    username: "ada@example.org".to_string(),
                    password: "lovelace".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(identity.subject_id, member.id);
        assert_eq!(auth.tokens().verify(&token).unwrap(), identity);
    }

    #[tokio::test]
    async fn test_duplicate_signup_is_conflict() {
        let auth = service();
        auth.signup_member(&signup()).await.unwrap();
        let err = auth.signup_member(&signup()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Librarians are a separate namespace
        auth.signup_librarian(&signup()).await.unwrap();
    }

    #[tokio::test]
    async fn test_login_failures() {
        let auth = service();
        auth.signup_member(&signup()).await.unwrap();

        let wrong_password = LoginRequest {
            username: "ada@example.org".to_string(),
            password: "babbage".to_string(),
        };
        assert!(matches!(
            auth.login(Role::Member, &wrong_password).await,
            Err(AppError::Authentication(_))
        ));

        let unknown = LoginRequest {
            username: "nobody@example.org".to_string(),
            password: "lovelace".to_string(),
        };
        let err = auth.login(Role::Member, &unknown).await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(msg) if msg == "Invalid username or password"));

        // Member account cannot log in as librarian
        let right_password = LoginRequest {
            password: "lovelace".to_string(),
            ..wrong_password
        };
        assert!(matches!(
            auth.login(Role::Librarian, &right_password).await,
            Err(AppError::Authentication(_))
        ));
    }
}
