use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, IntoActiveModel};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::validate_name;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::{AuthError, AuthService, AuthUser, Role, TokenResponse, TokenSubject};
use crate::entities::team;
use crate::errors::ServiceError;
use crate::repositories::{RobotRepository, TeamRepository};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "distinct_passwords", skip_on_field_errors = false))]
#[schema(example = json!({
    "team_name": "The Cheesy Poofs",
    "team_number": 254,
    "password": "pit-crew",
    "admin_password": "lead-mentor"
}))]
pub struct RegisterTeamRequest {
    #[validate(custom = "validate_name")]
    pub team_name: String,
    #[validate(range(min = 1, max = 99999))]
    pub team_number: i32,
    /// Shared password for team members
    #[validate(length(min = 4, max = 128))]
    pub password: String,
    /// Password for team administrators
    #[validate(length(min = 4, max = 128))]
    pub admin_password: String,
}

fn distinct_passwords(req: &RegisterTeamRequest) -> Result<(), ValidationError> {
    if req.password == req.admin_password {
        return Err(ValidationError::new("admin_password_must_differ"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub team_number: i32,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTeamRequest {
    #[validate(custom = "validate_name")]
    pub name: Option<String>,
    #[validate(length(min = 4, max = 128))]
    pub password: Option<String>,
    #[validate(length(min = 4, max = 128))]
    pub admin_password: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeamExistsQuery {
    pub team_number: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamResponse {
    pub id: Uuid,
    pub name: String,
    pub team_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<team::Model> for TeamResponse {
    fn from(model: team::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            team_number: model.team_number,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub team: TeamResponse,
    pub token: TokenResponse,
}

/// Team accounts and the logins that issue their tokens
#[derive(Clone)]
pub struct TeamService {
    teams: TeamRepository,
    robots: RobotRepository,
    auth: Arc<AuthService>,
    admin_password_hash: Option<String>,
}

impl TeamService {
    pub fn new(
        teams: TeamRepository,
        robots: RobotRepository,
        auth: Arc<AuthService>,
        admin_password_hash: Option<String>,
    ) -> Self {
        Self {
            teams,
            robots,
            auth,
            admin_password_hash,
        }
    }

    #[instrument(skip(self, request), fields(team_number = request.team_number))]
    pub async fn register(
        &self,
        request: RegisterTeamRequest,
    ) -> Result<RegisterResponse, ServiceError> {
        request.validate()?;

        if self.teams.exists(request.team_number).await? {
            return Err(ServiceError::Conflict(format!(
                "team {} is already registered",
                request.team_number
            )));
        }

        let password_hash = hash_password_blocking(request.password).await?;
        let admin_password_hash = hash_password_blocking(request.admin_password).await?;

        let created = self
            .teams
            .create(team::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(request.team_name.trim().to_string()),
                team_number: Set(request.team_number),
                password_hash: Set(password_hash),
                admin_password_hash: Set(admin_password_hash),
                ..Default::default()
            })
            .await?;

        let token = self.auth.issue_token(&TokenSubject::team(
            created.id,
            created.team_number,
            Role::TeamAdmin,
        ))?;

        info!(team_id = %created.id, "team registered");
        Ok(RegisterResponse {
            team: created.into(),
            token,
        })
    }

    /// The admin password yields a team-admin token, the member password a member token.
    #[instrument(skip(self, request), fields(team_number = request.team_number))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, ServiceError> {
        let team = self
            .teams
            .find_by_number(request.team_number)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let role = if verify_password_blocking(
            request.password.clone(),
            team.admin_password_hash.clone(),
        )
        .await?
        {
            Role::TeamAdmin
        } else if verify_password_blocking(request.password, team.password_hash.clone()).await? {
            Role::Member
        } else {
            warn!("rejected team login");
            return Err(AuthError::InvalidCredentials.into());
        };

        Ok(self
            .auth
            .issue_token(&TokenSubject::team(team.id, team.team_number, role))?)
    }

    #[instrument(skip(self, request))]
    pub async fn admin_login(
        &self,
        request: AdminLoginRequest,
    ) -> Result<TokenResponse, ServiceError> {
        let hash = self.admin_password_hash.clone().ok_or_else(|| {
            ServiceError::Forbidden("site administration is not configured".to_string())
        })?;

        if !verify_password_blocking(request.password, hash).await? {
            warn!("rejected site admin login");
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(self.auth.issue_token(&TokenSubject::site_admin())?)
    }

    pub async fn logout(&self, user: &AuthUser) {
        self.auth.revoke_token(&user.token_id, user.expires_at).await;
    }

    pub async fn team_exists(&self, team_number: i32) -> Result<bool, ServiceError> {
        self.teams.exists(team_number).await
    }

    async fn current_model(&self, user: &AuthUser) -> Result<team::Model, ServiceError> {
        let team_id = user.require_team()?;
        self.teams
            .find_by_id(team_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Team {} not found", team_id)))
    }

    pub async fn current(&self, user: &AuthUser) -> Result<TeamResponse, ServiceError> {
        Ok(self.current_model(user).await?.into())
    }

    #[instrument(skip(self, user, request))]
    pub async fn update(
        &self,
        user: &AuthUser,
        request: UpdateTeamRequest,
    ) -> Result<TeamResponse, ServiceError> {
        request.validate()?;
        let existing = self.current_model(user).await?;
        let mut active = existing.into_active_model();

        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(password) = request.password {
            active.password_hash = Set(hash_password_blocking(password).await?);
        }
        if let Some(admin_password) = request.admin_password {
            active.admin_password_hash = Set(hash_password_blocking(admin_password).await?);
        }

        Ok(self.teams.update(active).await?.into())
    }

    /// Deletes the caller's team and everything under it, then revokes the token.
    #[instrument(skip(self, user))]
    pub async fn delete(&self, user: &AuthUser) -> Result<(), ServiceError> {
        let team_id = user.require_team()?;
        let robots = self.robots.count_by_team(team_id).await?;
        self.teams.delete_cascade(team_id).await?;
        self.logout(user).await;
        info!(%team_id, robots, "team deleted");
        Ok(())
    }
}
