use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{authz, models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::auth::register,
		routes::auth::login,
		routes::auth::me,
		routes::auth::logout,
		routes::tasks::list_tasks,
		routes::tasks::create_task,
		routes::tasks::task_stats,
		routes::tasks::get_task,
		routes::tasks::update_task,
		routes::tasks::reorder_task,
		routes::tasks::delete_task,
		routes::users::list_users,
		routes::users::create_user,
		routes::users::get_user,
		routes::users::update_user,
		routes::users::delete_user,
		routes::organizations::list_organizations,
		routes::organizations::create_organization,
		routes::organizations::get_organization,
		routes::organizations::update_organization,
		routes::organizations::delete_organization,
		routes::audit::list_audit_log
	),
	components(
		schemas(
			authz::Role,
			authz::Permission,
			routes::health::HealthResponse,
			routes::health::DatabaseHealth,
			routes::auth::MessageResponse,
			models::user::User,
			models::user::AuthResponse,
			models::user::LoginRequest,
			models::user::RegisterRequest,
			models::user::UserCreateRequest,
			models::user::UserUpdateRequest,
			models::organization::Organization,
			models::organization::OrganizationCreateRequest,
			models::organization::OrganizationUpdateRequest,
			models::task::Task,
			models::task::TaskStatus,
			models::task::TaskCategory,
			models::task::TaskPriority,
			models::task::TaskCreateRequest,
			models::task::TaskUpdateRequest,
			models::task::TaskReorderRequest,
			models::task::TaskStats,
			models::task::StatusCount,
			models::audit::AuditAction,
			models::audit::AuditLogEntry,
			models::audit::AuditLogPage
		)
	),
	modifiers(&SecurityAddon),
	tags(
		(name = "Health", description = "Liveness"),
		(name = "Auth", description = "Registration, login and the current user"),
		(name = "Tasks", description = "Task board scoped to the caller's organizations"),
		(name = "Users", description = "User management"),
		(name = "Organizations", description = "Organization hierarchy"),
		(name = "Audit", description = "Audit trail")
	)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
	fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
		let components = openapi.components.get_or_insert_with(Default::default);
		components.add_security_scheme(
			"bearerAuth",
			SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
		);
	}
}

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;
	ensure_servers(&mut doc, port);
	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.persist_authorization(true);

	let doc = Arc::new(doc);
	let json_route = get(move || {
		let doc = Arc::clone(&doc);
		async move { Json((*doc).clone()) }
	});

	Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config))
}

fn ensure_servers(doc: &mut Value, port: u16) {
	// https when main.rs will serve TLS
	let tls_enabled = std::env::var("TLS_CERT_PATH").is_ok() && std::env::var("TLS_KEY_PATH").is_ok();
	let scheme = if tls_enabled { "https" } else { "http" };
	let server_url = format!("{}://localhost:{}", scheme, port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}
