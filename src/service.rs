//! Blocking proxies for the freedesktop.org Secret Service interfaces.
//!
//! Only the calls this crate needs are declared: session negotiation and
//! search/unlock on the service object, `Close` on the session object, and
//! secret/attribute retrieval on items. Everything speaks to the well-known
//! name `org.freedesktop.secrets` on the session bus.

use std::collections::HashMap;

use serde::Deserialize;
use zbus::proxy;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Type, Value};

/// Session negotiation algorithm. Plain transfer is fine here: the bus is
/// local and per-user, and the service accepts it unconditionally.
pub const PLAIN_ALGORITHM: &str = "plain";

/// Wire form of a secret value:
/// `(ObjectPath session, Array<Byte> parameters, Array<Byte> value, String content_type)`.
/// Only `value` is consumed; the rest is carried to match the wire signature.
#[derive(Debug, Deserialize, Type)]
#[allow(dead_code)]
pub struct Secret {
    pub session: OwnedObjectPath,
    pub parameters: Vec<u8>,
    pub value: Vec<u8>,
    pub content_type: String,
}

#[proxy(
    interface = "org.freedesktop.Secret.Service",
    default_service = "org.freedesktop.secrets",
    default_path = "/org/freedesktop/secrets",
    gen_async = false,
    blocking_name = "ServiceProxyBlocking"
)]
pub trait Service {
    /// Negotiate a transfer session. Returns the algorithm output (unused
    /// for plain sessions) and the session object path.
    fn open_session(
        &self,
        algorithm: &str,
        input: &Value<'_>,
    ) -> zbus::Result<(OwnedValue, OwnedObjectPath)>;

    /// Search all collections for items whose attributes equal `attributes`,
    /// partitioned into (unlocked, locked) in service order.
    fn search_items(
        &self,
        attributes: &HashMap<&str, &str>,
    ) -> zbus::Result<(Vec<OwnedObjectPath>, Vec<OwnedObjectPath>)>;

    /// Unlock the given objects. Returns the objects that are now unlocked
    /// and a prompt path ("/" when no prompt is required).
    fn unlock(
        &self,
        objects: &[OwnedObjectPath],
    ) -> zbus::Result<(Vec<OwnedObjectPath>, OwnedObjectPath)>;
}

#[proxy(
    interface = "org.freedesktop.Secret.Session",
    default_service = "org.freedesktop.secrets",
    gen_async = false,
    blocking_name = "SecretSessionProxyBlocking"
)]
pub trait SecretSession {
    /// Release the negotiated session state held by the service.
    fn close(&self) -> zbus::Result<()>;
}

#[proxy(
    interface = "org.freedesktop.Secret.Item",
    default_service = "org.freedesktop.secrets",
    gen_async = false,
    blocking_name = "ItemProxyBlocking"
)]
pub trait Item {
    /// Retrieve the item's secret, keyed by the session path that provides
    /// the decryption context.
    fn get_secret(&self, session: &OwnedObjectPath) -> zbus::Result<Secret>;

    #[zbus(property)]
    fn attributes(&self) -> zbus::Result<HashMap<String, String>>;
}
