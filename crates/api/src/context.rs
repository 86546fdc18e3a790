use gasdesk_auth::{Role, SessionClaims};
use gasdesk_core::{AgencyId, UserId};

/// Authenticated session for a request, derived from the bearer token.
///
/// Present on every route behind the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    claims: SessionClaims,
}

impl SessionContext {
    pub fn new(claims: SessionClaims) -> Self {
        Self { claims }
    }

    pub fn user_id(&self) -> &UserId {
        &self.claims.sub
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn agency_id(&self) -> Option<&AgencyId> {
        self.claims.agency_id.as_ref()
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    pub fn can_access_agency(&self, agency: &AgencyId) -> bool {
        gasdesk_auth::can_access_agency(&self.claims, agency)
    }
}
