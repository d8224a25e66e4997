//! Keelson key-space construction.

/// Version segment of the keelson key space.
const KEY_VERSION: &str = "v0";

/// Build a keelson pub/sub key:
/// `{realm}/v0/{entity_id}/pubsub/{subject}/{source_id}`.
pub fn construct_pubsub_key(realm: &str, entity_id: &str, subject: &str, source_id: &str) -> String {
    format!("{realm}/{KEY_VERSION}/{entity_id}/pubsub/{subject}/{source_id}")
}
