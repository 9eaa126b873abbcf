use uuid::Uuid;

use crate::models::CommunitySnippet;

/// Authenticated identity as the external session provider reports it.
/// `loading` is true until the provider has definitively resolved the
/// session one way or the other.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<Uuid>,
    pub loading: bool,
}

impl SessionState {
    pub fn resolving() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    pub fn signed_in(user: Uuid) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: None,
            loading: false,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::resolving()
    }
}

/// The viewer's community subscriptions plus whether their initial load
/// has completed. The feed must not be assembled off a list that is still
/// loading; an empty-but-unloaded list is not "no subscriptions".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnippetState {
    pub snippets: Vec<CommunitySnippet>,
    pub loaded: bool,
}

impl SnippetState {
    pub fn loaded(snippets: Vec<CommunitySnippet>) -> Self {
        Self {
            snippets,
            loaded: true,
        }
    }
}
