use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gasdesk_core::{AgencyId, DomainError, DomainResult, Entity};

use crate::agent::required;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgencyStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agency {
    pub id: AgencyId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub status: AgencyStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub status: Option<AgencyStatus>,
}

impl Agency {
    pub fn register(id: AgencyId, input: AgencyInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = required(input.name, "Agency name is required")?;
        let email = required(input.email, "Agency email is required")?;
        if !email.contains('@') {
            return Err(DomainError::validation("Agency email is invalid"));
        }

        Ok(Self {
            id,
            name,
            email,
            phone: input.phone,
            city: input.city,
            status: input.status.unwrap_or(AgencyStatus::Active),
            created_at: now,
        })
    }

    /// Apply an update. The flag is `true` when the status actually changed.
    pub fn apply(&self, input: AgencyInput) -> DomainResult<(Self, bool)> {
        let mut next = self.clone();
        if let Some(name) = input.name {
            next.name = required(Some(name), "Agency name cannot be empty")?;
        }
        if let Some(email) = input.email {
            next.email = required(Some(email), "Agency email cannot be empty")?;
        }
        if input.phone.is_some() {
            next.phone = input.phone;
        }
        if input.city.is_some() {
            next.city = input.city;
        }
        if let Some(status) = input.status {
            next.status = status;
        }
        let status_changed = next.status != self.status;
        Ok((next, status_changed))
    }
}

impl Entity for Agency {
    type Id = AgencyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agency() -> Agency {
        Agency::register(
            AgencyId::from("a1"),
            AgencyInput {
                name: Some("Northside Gas".to_string()),
                email: Some("ops@northside.example".to_string()),
                ..AgencyInput::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn status_change_is_reported() {
        let (same, changed) = agency()
            .apply(AgencyInput { city: Some("Pune".to_string()), ..AgencyInput::default() })
            .unwrap();
        assert!(!changed);
        assert_eq!(same.city.as_deref(), Some("Pune"));

        let (next, changed) = agency()
            .apply(AgencyInput { status: Some(AgencyStatus::Inactive), ..AgencyInput::default() })
            .unwrap();
        assert!(changed);
        assert_eq!(next.status, AgencyStatus::Inactive);
    }

    #[test]
    fn email_must_look_like_an_address() {
        let result = Agency::register(
            AgencyId::from("a2"),
            AgencyInput {
                name: Some("X".to_string()),
                email: Some("nope".to_string()),
                ..AgencyInput::default()
            },
            Utc::now(),
        );
        assert!(result.is_err());
    }
}
