//! Access policy for sessions.
//!
//! - No IO
//! - No panics
//! - Pure decisions over claims

use thiserror::Error;

use gasdesk_core::AgencyId;
use gasdesk_events::Channel;

use crate::{Role, SessionClaims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("role '{role}' may not subscribe to '{channel}'")]
    Subscription { role: Role, channel: String },

    #[error("forbidden: requires role '{0}'")]
    MissingRole(Role),
}

/// Decide whether a session may join a realtime channel.
///
/// Admins may join anything. Agency owners may follow orders and their own
/// agency's inventory. Customers and agents only follow orders.
pub fn authorize_subscription(claims: &SessionClaims, channel: &Channel) -> Result<(), AuthzError> {
    let allowed = match (claims.role, channel) {
        (Role::Admin, _) => true,
        (_, Channel::Orders) => true,
        (Role::AgencyOwner, Channel::Inventory(agency)) => claims.agency_id.as_ref() == Some(agency),
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AuthzError::Subscription {
            role: claims.role,
            channel: channel.to_string(),
        })
    }
}

/// Admins see every agency; everyone else only their own.
pub fn can_access_agency(claims: &SessionClaims, agency: &AgencyId) -> bool {
    claims.role == Role::Admin || claims.agency_id.as_ref() == Some(agency)
}

/// Require an exact role (used by admin-only endpoints).
pub fn require_role(claims: &SessionClaims, role: Role) -> Result<(), AuthzError> {
    if claims.role == role {
        Ok(())
    } else {
        Err(AuthzError::MissingRole(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasdesk_core::UserId;

    fn session(role: Role, agency: Option<&str>) -> SessionClaims {
        SessionClaims {
            sub: UserId::from("u1"),
            role,
            agency_id: agency.map(AgencyId::from),
            iat: 0,
            exp: 1,
        }
    }

    #[test]
    fn admin_may_join_any_channel() {
        let admin = session(Role::Admin, None);
        assert!(authorize_subscription(&admin, &Channel::Agents).is_ok());
        assert!(authorize_subscription(&admin, &Channel::Inventory(AgencyId::from("zz"))).is_ok());
    }

    #[test]
    fn agency_owner_is_limited_to_own_inventory() {
        let owner = session(Role::AgencyOwner, Some("a1"));
        assert!(authorize_subscription(&owner, &Channel::Inventory(AgencyId::from("a1"))).is_ok());
        assert!(authorize_subscription(&owner, &Channel::Inventory(AgencyId::from("a2"))).is_err());
        assert!(authorize_subscription(&owner, &Channel::Agencies).is_err());
    }

    #[test]
    fn customers_follow_orders_only() {
        let customer = session(Role::Customer, None);
        assert!(authorize_subscription(&customer, &Channel::Orders).is_ok());
        assert!(authorize_subscription(&customer, &Channel::Products).is_err());
    }

    #[test]
    fn agency_access_is_own_agency_or_admin() {
        let a1 = AgencyId::from("a1");
        assert!(can_access_agency(&session(Role::Admin, None), &a1));
        assert!(can_access_agency(&session(Role::Agent, Some("a1")), &a1));
        assert!(!can_access_agency(&session(Role::AgencyOwner, Some("a2")), &a1));
        assert!(!can_access_agency(&session(Role::Customer, None), &a1));
    }

    #[test]
    fn require_role_matches_exactly() {
        assert!(require_role(&session(Role::Admin, None), Role::Admin).is_ok());
        assert_eq!(
            require_role(&session(Role::Agent, None), Role::Admin),
            Err(AuthzError::MissingRole(Role::Admin))
        );
    }
}
