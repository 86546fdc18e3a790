use serde::{Deserialize, Serialize};

use gasdesk_core::{AgencyId, AgentId, DomainError, DomainResult, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Offline,
    Busy,
    Available,
}

/// Delivery agent working for one agency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub agency_id: AgencyId,
    pub status: AgentStatus,
    pub vehicle_number: Option<String>,
    pub license_number: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_ifsc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub agency_id: Option<AgencyId>,
    pub status: Option<AgentStatus>,
    pub vehicle_number: Option<String>,
    pub license_number: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_ifsc: Option<String>,
}

impl Agent {
    /// New agents start `offline` unless a status is given.
    pub fn register(id: AgentId, input: AgentInput) -> DomainResult<Self> {
        let name = required(input.name, "Agent name is required")?;
        let email = required(input.email, "Agent email is required")?;
        let agency_id = input
            .agency_id
            .ok_or_else(|| DomainError::validation("Agency is required"))?;

        Ok(Self {
            id,
            name,
            email,
            phone: input.phone,
            agency_id,
            status: input.status.unwrap_or(AgentStatus::Offline),
            vehicle_number: input.vehicle_number,
            license_number: input.license_number,
            bank_account_number: input.bank_account_number,
            bank_ifsc: input.bank_ifsc,
        })
    }

    pub fn apply(&self, input: AgentInput) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(name) = input.name {
            next.name = required(Some(name), "Agent name cannot be empty")?;
        }
        if let Some(email) = input.email {
            next.email = required(Some(email), "Agent email cannot be empty")?;
        }
        if let Some(agency_id) = input.agency_id {
            next.agency_id = agency_id;
        }
        if let Some(status) = input.status {
            next.status = status;
        }
        if input.phone.is_some() {
            next.phone = input.phone;
        }
        if input.vehicle_number.is_some() {
            next.vehicle_number = input.vehicle_number;
        }
        if input.license_number.is_some() {
            next.license_number = input.license_number;
        }
        if input.bank_account_number.is_some() {
            next.bank_account_number = input.bank_account_number;
        }
        if input.bank_ifsc.is_some() {
            next.bank_ifsc = input.bank_ifsc;
        }
        Ok(next)
    }

    pub fn with_status(&self, status: AgentStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

impl Entity for Agent {
    type Id = AgentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

pub(crate) fn required(value: Option<String>, message: &str) -> DomainResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DomainError::validation(message))
}
