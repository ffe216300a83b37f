use tracing::info;

/// Which side of the marketplace the user is acting as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    ServiceSeeker,
    Sitter,
}

/// Current role and the actor ids behind each role.
///
/// Lives for one process and is handed to whatever needs the acting user;
/// nothing is persisted.
#[derive(Debug, Clone)]
pub struct Session {
    role: Option<Role>,
    seeker_id: String,
    sitter_id: String,
}

impl Session {
    pub fn new(seeker_id: impl Into<String>, sitter_id: impl Into<String>) -> Self {
        Self {
            role: None,
            seeker_id: seeker_id.into(),
            sitter_id: sitter_id.into(),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Set the role; `None` clears it
    pub fn switch_role(&mut self, role: Option<Role>) {
        info!(?role, "role switched");
        self.role = role;
    }

    pub fn logout(&mut self) {
        info!("logged out");
        self.role = None;
    }

    pub fn is_service_seeker(&self) -> bool {
        self.role == Some(Role::ServiceSeeker)
    }

    pub fn is_sitter(&self) -> bool {
        self.role == Some(Role::Sitter)
    }

    /// Id of the user acting under the current role
    pub fn actor_id(&self) -> Option<&str> {
        match self.role? {
            Role::ServiceSeeker => Some(self.seeker_id.as_str()),
            Role::Sitter => Some(self.sitter_id.as_str()),
        }
    }
}
