//! Access policy gate and host-facing menu entry
//!
//! The engine only computes decisions; enforcing them (rendering a 403,
//! hiding a link) is the host's job.

use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::config::IndieAuthConfig;

/// The only action the gate has an opinion about
pub const VIEW_INSTANCE: &str = "view-instance";

/// Label of the sign-in menu entry
pub const SIGN_IN_LABEL: &str = "Sign in IndieAuth";

/// Identities allowed to view the instance
///
/// Deserializes from either a list of identities or a single string of
/// whitespace-separated identities. Membership is an exact string match;
/// entries are not canonicalised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AllowListRepr", into = "Vec<String>")]
pub struct AllowList {
    members: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AllowListRepr {
    Spaced(String),
    List(Vec<String>),
}

impl From<AllowListRepr> for AllowList {
    fn from(repr: AllowListRepr) -> Self {
        match repr {
            AllowListRepr::Spaced(s) => Self::new(s.split_whitespace()),
            AllowListRepr::List(list) => Self::new(list),
        }
    }
}

impl From<AllowList> for Vec<String> {
    fn from(list: AllowList) -> Self {
        list.members
    }
}

impl AllowList {
    /// Build an allow-list from identities
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `me` is listed verbatim
    pub fn contains(&self, me: &str) -> bool {
        self.members.iter().any(|m| m == me)
    }

    /// Listed identities
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    /// Whether the list is empty (which denies everyone)
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Tri-state outcome of the access gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The actor is on the allow-list
    Allow,
    /// An allow-list is configured and the actor is absent or not on it
    Deny,
    /// No opinion; the host decides
    Abstain,
}

impl AccessDecision {
    /// `Some(true)` for allow, `Some(false)` for deny, `None` to abstain
    pub fn as_option(self) -> Option<bool> {
        match self {
            Self::Allow => Some(true),
            Self::Deny => Some(false),
            Self::Abstain => None,
        }
    }
}

/// Evaluate an actor against an optional allow-list
pub fn is_allowed(actor: Option<&Actor>, allow_list: Option<&AllowList>) -> AccessDecision {
    let Some(allow_list) = allow_list else {
        return AccessDecision::Abstain;
    };
    match actor {
        Some(actor) if allow_list.contains(&actor.me) => AccessDecision::Allow,
        _ => AccessDecision::Deny,
    }
}

/// Access decision for `action`; only [`VIEW_INSTANCE`] is gated
pub fn access_decision(actor: Option<&Actor>, action: &str, config: &IndieAuthConfig) -> AccessDecision {
    if action != VIEW_INSTANCE {
        return AccessDecision::Abstain;
    }
    is_allowed(actor, config.restrict_access.as_ref())
}

/// A navigation link offered to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuLink {
    /// Link target
    pub href: String,
    /// Link text
    pub label: String,
}

/// The sign-in link, offered only when nobody is signed in
pub fn menu_entry(actor: Option<&Actor>, login_path: &str) -> Option<MenuLink> {
    match actor {
        Some(_) => None,
        None => Some(MenuLink {
            href: login_path.to_string(),
            label: SIGN_IN_LABEL.to_string(),
        }),
    }
}
