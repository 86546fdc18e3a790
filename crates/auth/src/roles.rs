use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gasdesk_core::AgencyId;
use gasdesk_events::Channel;

/// Role carried by a session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    AgencyOwner,
    Customer,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::AgencyOwner => "agency_owner",
            Role::Customer => "customer",
            Role::Agent => "agent",
        }
    }

    /// Channels a session of this role joins right after (re)connecting.
    ///
    /// An agency owner without an agency id only gets the orders channel.
    pub fn default_channels(&self, agency_id: Option<&AgencyId>) -> Vec<Channel> {
        match self {
            Role::Admin => vec![
                Channel::Orders,
                Channel::Products,
                Channel::Agencies,
                Channel::Agents,
            ],
            Role::AgencyOwner => {
                let mut channels = vec![Channel::Orders];
                if let Some(agency) = agency_id {
                    channels.push(Channel::Inventory(agency.clone()));
                }
                channels
            }
            Role::Customer | Role::Agent => vec![Channel::Orders],
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "agency_owner" => Ok(Role::AgencyOwner),
            "customer" => Ok(Role::Customer),
            "agent" => Ok(Role::Agent),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_joins_the_four_global_channels() {
        let channels = Role::Admin.default_channels(None);
        assert_eq!(
            channels,
            vec![Channel::Orders, Channel::Products, Channel::Agencies, Channel::Agents]
        );
    }

    #[test]
    fn agency_owner_joins_orders_and_own_inventory() {
        let agency = AgencyId::from("a1");
        let channels = Role::AgencyOwner.default_channels(Some(&agency));
        assert_eq!(channels, vec![Channel::Orders, Channel::Inventory(agency)]);
    }

    #[test]
    fn customers_and_agents_only_follow_orders() {
        assert_eq!(Role::Customer.default_channels(None), vec![Channel::Orders]);
        assert_eq!(Role::Agent.default_channels(None), vec![Channel::Orders]);
    }

    #[test]
    fn roles_parse_from_their_wire_names() {
        assert_eq!("agency_owner".parse::<Role>().unwrap(), Role::AgencyOwner);
        assert!("owner".parse::<Role>().is_err());
    }
}
