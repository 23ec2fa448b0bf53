use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, password_matches},
        repo::{is_unique_violation, User},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 50;

/// Result of a successful register or login.
#[derive(Debug)]
pub struct Session {
    pub name: String,
    pub token: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn present(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

pub fn validate_registration(req: RegisterRequest) -> AppResult<NewUser> {
    let (Some(email), Some(name), Some(password)) =
        (present(req.email), present(req.name), present(req.password))
    else {
        return Err(AppError::Validation(
            "Please provide email, name and password".into(),
        ));
    };

    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Please provide a valid email".into()));
    }
    let name = name.trim().to_string();
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok(NewUser {
        email,
        name,
        password,
    })
}

pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<Session> {
    let new_user = validate_registration(req).map_err(|e| {
        warn!(error = %e, "invalid registration");
        e
    })?;

    let conflict = || AppError::Conflict("Email already registered".into());
    if User::find_by_email(&state.db, &new_user.email).await?.is_some() {
        warn!(email = %new_user.email, "email already registered");
        return Err(conflict());
    }

    let hash = hash_password(&new_user.password)?;
    let user = match User::create(&state.db, &new_user.email, &new_user.name, &hash).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %new_user.email, "email registered concurrently");
            return Err(conflict());
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(e.into());
        }
    };

    let token = JwtKeys::from_config(&state.config.jwt).sign(user.id, &user.name)?;
    info!(user_id = %user.id, "user registered");
    Ok(Session {
        name: user.name,
        token,
    })
}

pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<Session> {
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        warn!("login without email or password");
        return Err(AppError::Validation(
            "Please provide email and password".into(),
        ));
    };
    let email = normalize_email(&email);

    // Same answer for unknown email and wrong password.
    let invalid = || AppError::Authentication("Please enter valid email and password".into());

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!("login unknown email");
        return Err(invalid());
    };
    if !password_matches(&password, &user.password_hash) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let token = JwtKeys::from_config(&state.config.jwt).sign(user.id, &user.name)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Session {
        name: user.name,
        token,
    })
}
