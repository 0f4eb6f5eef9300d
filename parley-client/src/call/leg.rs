use crate::peer::{LegRole, PeerConnection};
use parley_core::SessionId;
use std::fmt;
use std::sync::Arc;

/// Negotiation progress of one leg. A caller leg runs
/// `Idle → Calling → Negotiating → Active`, a callee leg
/// `Idle → Offered → Negotiating → Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegPhase {
    Idle,
    Calling,
    Offered,
    Negotiating,
    Active,
}

impl LegPhase {
    /// Whether `self → next` is a step the leg of `role` may take.
    pub fn can_advance(self, role: LegRole, next: LegPhase) -> bool {
        use LegPhase::*;
        matches!(
            (role, self, next),
            (LegRole::Local, Idle, Calling)
                | (LegRole::Local, Calling, Negotiating)
                | (LegRole::Local, Negotiating, Active)
                | (LegRole::Remote, Idle, Offered)
                | (LegRole::Remote, Active, Offered)
                | (LegRole::Remote, Offered, Negotiating)
                | (LegRole::Remote, Negotiating, Active)
        )
    }
}

pub(crate) struct Leg {
    pub session: SessionId,
    pub role: LegRole,
    pub phase: LegPhase,
    pub pc: Arc<dyn PeerConnection>,
}

impl Leg {
    pub fn new(session: SessionId, role: LegRole, pc: Arc<dyn PeerConnection>) -> Self {
        Self {
            session,
            role,
            phase: LegPhase::Idle,
            pc,
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.role {
            LegRole::Local => "local",
            LegRole::Remote => "remote",
        };
        write!(f, "[{} {} {:?}]", role, self.session, self.phase)
    }
}
