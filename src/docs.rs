use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::me::me,
		routes::documents::list_documents,
		routes::documents::create_document,
		routes::documents::get_document,
		routes::documents::update_document,
		routes::documents::delete_document,
		routes::registrations::list_registrations,
		routes::registrations::create_registration,
		routes::registrations::get_registration,
		routes::registrations::update_registration,
		routes::registrations::delete_registration,
		routes::registrations::approve_registration,
		routes::registrations::reject_registration,
		routes::admin::get_actor,
		routes::admin::grant_permission,
		routes::admin::revoke_permission,
		routes::admin::set_role,
		routes::admin::list_audit_logs
	),
	components(
		schemas(
			crate::authz::Role,
			routes::health::HealthResponse,
			models::actor::ActorRecord,
			models::actor::GrantPermissionRequest,
			models::actor::SetRoleRequest,
			models::actor::ActorMutationResponse,
			models::document::Document,
			models::document::DocumentCategory,
			models::document::DocumentCreateRequest,
			models::document::DocumentUpdateRequest,
			models::registration::OwnerRegistration,
			models::registration::RegistrationStatus,
			models::registration::RegistrationCreateRequest,
			models::registration::RegistrationUpdateRequest,
			models::registration::ReviewRequest,
			models::audit::AuditLogEntry
		)
	),
	tags(
		(name = "Health", description = "Liveness"),
		(name = "Actors", description = "The authenticated actor"),
		(name = "Documents", description = "Association documents"),
		(name = "Registrations", description = "Owner registrations"),
		(name = "Admin", description = "Actor administration and audit trail")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	let root = doc
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))?;
	ensure_security_components(root);
	ensure_servers(root, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = get(move || {
		let doc_json = Arc::clone(&doc_json);
		async move { Json((*doc_json).clone()) }
	});

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn ensure_security_components(root: &mut Map<String, Value>) {
	let components = root
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()));

	if let Value::Object(components) = components {
		let schemes = components
			.entry("securitySchemes")
			.or_insert_with(|| Value::Object(Map::new()));

		if let Value::Object(schemes) = schemes {
			schemes.insert(
				"bearerAuth".to_string(),
				json!({
					"type": "http",
					"scheme": "bearer",
					"bearerFormat": "JWT"
				}),
			);
		}
	}
}

fn ensure_servers(root: &mut Map<String, Value>, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match root.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			root.insert("servers".to_string(), json!([{ "url": server_url }]));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn document_lists_every_route_and_the_bearer_scheme() {
		let doc = serde_json::to_value(build_openapi(8000).unwrap()).unwrap();

		for path in [
			"/api/health",
			"/me",
			"/documents",
			"/documents/{id}",
			"/registrations",
			"/registrations/{id}/approve",
			"/admin/actors/{id}/permissions",
			"/admin/actors/{id}/permissions/{permission}",
			"/admin/actors/{id}/role",
			"/admin/audit-logs",
		] {
			assert!(doc["paths"].get(path).is_some(), "missing path {path}");
		}

		assert_eq!(doc["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
		assert_eq!(doc["servers"][0]["url"], "http://localhost:8000");
	}
}
