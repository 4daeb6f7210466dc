use uuid::Uuid;

/// The signed-in viewer, passed explicitly to every feed and analytics call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    viewer_id: Option<Uuid>,
    access_token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(viewer_id: Uuid, access_token: impl Into<String>) -> Self {
        Self {
            viewer_id: Some(viewer_id),
            access_token: Some(access_token.into()),
        }
    }

    pub fn viewer_id(&self) -> Option<Uuid> {
        self.viewer_id
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.viewer_id.is_some()
    }
}
