//! Signed-in actors and their session tokens

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::canonical::display_url;
use crate::signing::{ACTOR_NAMESPACE, SignatureError, Signer, sign_json, unsign_json};

/// Keys owned by the engine; profile data may not overwrite them
const RESERVED_KEYS: [&str; 3] = ["me", "display", "indieauth_scope"];

/// A verified identity
///
/// Serializes flat: profile fields returned by the authorization server
/// (`name`, `photo`, `email`, ...) sit beside `me` and `display`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Canonical profile URL
    pub me: String,
    /// Short display form of `me`
    pub display: String,
    /// Scope granted by the authorization server, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indieauth_scope: Option<String>,
    /// Profile information merged from the code exchange response
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl Actor {
    /// Build an actor for a verified `me`
    ///
    /// `profile` is merged only if it is a JSON object; its `me`, `display`
    /// and `indieauth_scope` keys are ignored.
    pub fn new(me: &str, scope: Option<&str>, profile: Option<&Value>) -> Self {
        let profile = match profile {
            Some(Value::Object(fields)) => fields
                .iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            Some(other) => {
                debug!("Ignoring non-object profile: {}", other);
                Map::new()
            }
            None => Map::new(),
        };

        Self {
            me: me.to_string(),
            display: display_url(me),
            indieauth_scope: scope.map(str::to_string),
            profile,
        }
    }

    /// A profile field by name
    pub fn profile_field(&self, name: &str) -> Option<&Value> {
        self.profile.get(name)
    }
}

/// Payload of the actor session cookie: `{"a": actor}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSession {
    /// The signed-in actor
    #[serde(rename = "a")]
    pub actor: Actor,
}

impl ActorSession {
    /// Wrap an actor
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    /// Sign the session for the actor cookie
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Serialize`] if the actor cannot be serialized.
    pub fn seal(&self, signer: &dyn Signer) -> Result<String, SignatureError> {
        sign_json(signer, self, ACTOR_NAMESPACE)
    }

    /// Recover a session from a cookie value
    ///
    /// Fails closed: any verification or shape failure yields `None`.
    pub fn open(signer: &dyn Signer, token: &str) -> Option<Self> {
        match unsign_json(signer, token, ACTOR_NAMESPACE) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Rejected actor session cookie: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{HmacSigner, STATE_NAMESPACE};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_actor_serializes_flat() {
        let actor = Actor::new(
            "https://indieauth.simonwillison.net/index.php/author/simonw/",
            None,
            Some(&json!({"email": "simon@example.com"})),
        );
        assert_eq!(
            serde_json::to_value(&actor).unwrap(),
            json!({
                "me": "https://indieauth.simonwillison.net/index.php/author/simonw/",
                "display": "indieauth.simonwillison.net/index.php/author/simonw/",
                "email": "simon@example.com",
            })
        );
    }

    #[test]
    fn test_scope_is_included() {
        let actor = Actor::new("https://a.test/", Some("profile email"), None);
        let value = serde_json::to_value(&actor).unwrap();
        assert_eq!(value["indieauth_scope"], "profile email");
        assert_eq!(value["display"], "a.test");
    }

    #[test]
    fn test_profile_cannot_override_identity() {
        let actor = Actor::new(
            "https://a.test/",
            None,
            Some(&json!({"me": "https://evil.test/", "display": "evil", "indieauth_scope": "all", "name": "A"})),
        );
        assert_eq!(actor.me, "https://a.test/");
        assert_eq!(actor.display, "a.test");
        assert_eq!(actor.indieauth_scope, None);
        assert_eq!(actor.profile_field("name"), Some(&json!("A")));
    }

    #[test]
    fn test_non_object_profile_ignored() {
        let actor = Actor::new("https://a.test/", None, Some(&json!(["x"])));
        assert!(actor.profile.is_empty());
    }

    #[test]
    fn test_session_round_trip() {
        let signer = HmacSigner::new(b"secret");
        let session = ActorSession::new(Actor::new("https://a.test/", None, Some(&json!({"name": "A"}))));
        let token = session.seal(&signer).unwrap();
        assert_eq!(ActorSession::open(&signer, &token), Some(session));
    }

    #[test]
    fn test_session_payload_uses_a_key() {
        let signer = HmacSigner::new(b"secret");
        let token = ActorSession::new(Actor::new("https://a.test/", None, None))
            .seal(&signer)
            .unwrap();
        let raw: Value = unsign_json(&signer, &token, ACTOR_NAMESPACE).unwrap();
        assert_eq!(raw["a"]["me"], "https://a.test/");
    }

    #[test]
    fn test_session_fails_closed() {
        let signer = HmacSigner::new(b"secret");
        let wrong_namespace = sign_json(&signer, &json!({"a": {"me": "x", "display": "x"}}), STATE_NAMESPACE).unwrap();
        assert_eq!(ActorSession::open(&signer, &wrong_namespace), None);
        assert_eq!(ActorSession::open(&signer, "garbage"), None);

        let wrong_shape = sign_json(&signer, &json!({"b": 1}), ACTOR_NAMESPACE).unwrap();
        assert_eq!(ActorSession::open(&signer, &wrong_shape), None);
    }
}
