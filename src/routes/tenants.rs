use std::sync::LazyLock;

use axum::Json;
use axum::extract::{Path, State};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::db;
use crate::db::users::NewUser;
use crate::error::AppError;
use crate::models::Tenant;
use crate::state::{AppState, SharedState};
use crate::tenant::SchemaName;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Accepts both `admin_username` and `adminUsername` style field names.
#[derive(Deserialize)]
pub struct TenantSignupRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub schema: String,
    #[serde(alias = "adminUsername")]
    pub admin_username: String,
    #[serde(alias = "adminEmail")]
    pub admin_email: String,
    #[serde(alias = "adminPassword")]
    pub admin_password: String,
    #[serde(alias = "adminFullName")]
    pub admin_full_name: String,
    #[serde(default, alias = "adminPhoneNumber")]
    pub admin_phone_number: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTenant {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub schema: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Serialize)]
pub struct OnboardingResponse {
    pub id: i64,
    pub schema: String,
    pub message: String,
}

struct AdminAccount<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    full_name: &'a str,
    phone_number: Option<&'a str>,
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::BadRequest(if min == 0 {
            format!("{field} cannot exceed {max} characters")
        } else {
            format!("{field} must be between {min} and {max} characters")
        }));
    }
    Ok(())
}

fn validate_tenant_fields(
    state: &AppState,
    name: &str,
    description: Option<&str>,
    schema: &str,
) -> Result<SchemaName, AppError> {
    check_len("Tenant name", name.trim(), 3, 50)?;
    if let Some(description) = description {
        check_len("Description", description, 0, 100)?;
    }

    let schema = SchemaName::parse(schema)?;
    if &schema == state.context.default_schema() || schema.as_str() == "information_schema" {
        return Err(AppError::BadRequest(format!(
            "Schema name '{schema}' is reserved"
        )));
    }
    Ok(schema)
}

impl TenantSignupRequest {
    fn admin(&self) -> AdminAccount<'_> {
        AdminAccount {
            username: &self.admin_username,
            email: &self.admin_email,
            password: &self.admin_password,
            full_name: &self.admin_full_name,
            phone_number: self.admin_phone_number.as_deref(),
        }
    }
}

impl AdminAccount<'_> {
    fn validate(&self) -> Result<(), AppError> {
        check_len("Username", self.username, 3, 50)?;
        check_len("Email", self.email, 1, 100)?;
        if !EMAIL_RE.is_match(self.email) {
            return Err(AppError::BadRequest("Email should be valid".to_string()));
        }
        check_len("Password", self.password, 6, 40)?;
        check_len("Full name", self.full_name.trim(), 1, 100)?;
        if let Some(phone) = self.phone_number {
            check_len("Phone number", phone, 0, 20)?;
        }
        Ok(())
    }
}

fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(e),
    }
}

/// Register a tenant with its optional admin, then provision its schema.
///
/// Uniqueness is checked up front and enforced again by the unique indexes
/// inside one transaction, so a conflict leaves nothing behind. Provisioning
/// only runs after that commit. A provisioning failure is reported but not
/// compensated: the registry row stays and the schema may be partially
/// initialized.
async fn onboard(
    state: &AppState,
    name: &str,
    description: Option<&str>,
    schema: &SchemaName,
    active: bool,
    admin: Option<AdminAccount<'_>>,
) -> Result<Tenant, AppError> {
    let name = name.trim();

    if db::tenants::exists_by_name(&state.pool, name).await? {
        return Err(AppError::Conflict("Tenant name already exists".to_string()));
    }
    if db::tenants::exists_by_schema(&state.pool, schema.as_str()).await? {
        return Err(AppError::Conflict("Schema name already exists".to_string()));
    }
    if let Some(admin) = &admin {
        if db::users::exists_by_username(&state.pool, admin.username).await? {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }
        if db::users::exists_by_email(&state.pool, admin.email).await? {
            return Err(AppError::Conflict("Email is already in use".to_string()));
        }
    }

    let password_hash = admin
        .as_ref()
        .map(|admin| password::hash(admin.password))
        .transpose()?;

    let mut tx = state.pool.begin().await?;

    let mut tenant = db::tenants::create(&mut *tx, name, schema.as_str(), description, active)
        .await
        .map_err(conflict_on_unique("Tenant name or schema already exists"))?;

    let mut admin_username = None;
    if let (Some(admin), Some(password_hash)) = (admin, password_hash) {
        let user = db::users::create(
            &mut *tx,
            NewUser {
                username: admin.username,
                email: admin.email,
                password_hash: &password_hash,
                full_name: Some(admin.full_name.trim()),
                phone_number: admin.phone_number,
                tenant_id: Some(tenant.id),
                system_admin: false,
            },
        )
        .await
        .map_err(conflict_on_unique("Username or email already in use"))?;

        tenant = db::tenants::set_admin_user(&mut *tx, tenant.id, user.id).await?;
        admin_username = Some(user.username);
    }

    tx.commit().await?;

    if let Err(e) = state.provisioner.provision(schema).await {
        tracing::error!(
            tenant_id = tenant.id,
            schema = %schema,
            "Schema provisioning failed for a registered tenant, needs manual remediation: {e}"
        );
        return Err(AppError::Internal(format!(
            "Provisioning of schema '{schema}' failed: {e}"
        )));
    }

    tracing::info!(
        tenant_id = tenant.id,
        schema = %schema,
        admin = ?admin_username,
        "Tenant onboarded"
    );
    Ok(tenant)
}

pub async fn signup(
    State(state): State<SharedState>,
    Json(req): Json<TenantSignupRequest>,
) -> Result<Json<OnboardingResponse>, AppError> {
    let description = req.description.as_deref();
    let schema = validate_tenant_fields(&state, &req.name, description, &req.schema)?;
    let admin = req.admin();
    admin.validate()?;

    let tenant = onboard(&state, &req.name, description, &schema, true, Some(admin)).await?;

    Ok(Json(OnboardingResponse {
        id: tenant.id,
        schema: tenant.schema,
        message: "Company registered successfully with admin account".to_string(),
    }))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateTenant>,
) -> Result<Json<Tenant>, AppError> {
    auth.require_system_admin()?;

    let description = req.description.as_deref();
    let schema = validate_tenant_fields(&state, &req.name, description, &req.schema)?;
    let tenant = onboard(&state, &req.name, description, &schema, req.active, None).await?;

    Ok(Json(tenant))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Tenant>>, AppError> {
    auth.require_system_admin()?;
    let tenants = db::tenants::list(&state.pool).await?;
    Ok(Json(tenants))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Tenant>, AppError> {
    auth.require_system_admin()?;

    let tenant = db::tenants::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    Ok(Json(tenant))
}

pub async fn activate(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Tenant>, AppError> {
    set_active(auth, &state, id, true).await
}

pub async fn deactivate(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Tenant>, AppError> {
    set_active(auth, &state, id, false).await
}

async fn set_active(
    auth: AuthUser,
    state: &AppState,
    id: i64,
    active: bool,
) -> Result<Json<Tenant>, AppError> {
    auth.require_system_admin()?;

    let tenant = db::tenants::set_active(&state.pool, id, active)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    tracing::info!(
        tenant_id = tenant.id,
        schema = %tenant.schema,
        active,
        "Tenant {}",
        if active { "activated" } else { "deactivated" }
    );
    Ok(Json(tenant))
}
