use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    routing::{get, patch, put},
    Json, Router,
};

use gasdesk_auth::Role;
use gasdesk_core::{AgentId, DomainError};
use gasdesk_events::EventName;
use gasdesk_logistics::{Agent, AgentInput};

use crate::app::dto::{body, ok, AgentStatusRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_agents).post(create_agent))
        .route("/:id", put(update_agent))
        .route("/:id/status", patch(update_agent_status))
}

fn require_manager(session: &SessionContext) -> Result<(), ApiError> {
    match session.role() {
        Role::Admin | Role::AgencyOwner => Ok(()),
        _ => Err(DomainError::forbidden("Only admins and agency owners can manage agents").into()),
    }
}

async fn load_agent(
    services: &AppServices,
    session: &SessionContext,
    id: String,
) -> Result<Agent, ApiError> {
    services
        .agents
        .get(&AgentId::from(id))
        .await?
        .filter(|agent| session.can_access_agency(&agent.agency_id))
        .ok_or_else(|| ApiError::not_found("Agent not found"))
}

pub async fn list_agents(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let agents: Vec<Agent> = services
        .agents
        .list()
        .await?
        .into_iter()
        .filter(|agent| session.can_access_agency(&agent.agency_id))
        .collect();
    ok("Agents fetched successfully", agents)
}

pub async fn create_agent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<AgentInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_manager(&session)?;
    let mut input = body(payload)?;
    if session.role() == Role::AgencyOwner {
        input.agency_id = session.agency_id().cloned();
    }

    let agent = Agent::register(AgentId::generate(), input)?;
    services.agents.upsert(agent.clone()).await?;

    tracing::info!(agent_id = %agent.id, agency_id = %agent.agency_id, "agent created");
    services.publish(EventName::AgentCreated, &agent);
    ok("Agent created successfully", agent)
}

pub async fn update_agent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    payload: Result<Json<AgentInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_manager(&session)?;
    let mut input = body(payload)?;
    if session.role() == Role::AgencyOwner {
        // Owners cannot move agents to another agency.
        input.agency_id = None;
    }

    let current = load_agent(&services, &session, id).await?;
    let updated = current.apply(input)?;
    services.agents.upsert(updated.clone()).await?;

    services.publish(EventName::AgentUpdated, &updated);
    ok("Agent updated successfully", updated)
}

/// Agents may flip their own availability; managers may set anyone's.
pub async fn update_agent_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    payload: Result<Json<AgentStatusRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = body(payload)?;

    let is_self = session.user_id().as_str() == id;
    if !is_self {
        require_manager(&session)?;
    }

    let current = load_agent(&services, &session, id).await?;
    let updated = current.with_status(request.status);
    services.agents.upsert(updated.clone()).await?;

    tracing::info!(agent_id = %updated.id, status = ?updated.status, "agent status updated");
    services.publish(EventName::AgentStatusUpdated, &updated);
    ok("Agent status updated successfully", updated)
}
