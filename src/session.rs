//! Connection and negotiated-session lifecycle.

use std::collections::HashMap;

use log::debug;
use zbus::blocking::Connection;
use zbus::zvariant::{OwnedObjectPath, Value};

use crate::error::{Error, Result};
use crate::resolver::{self, Credential, SearchResult, SecretStore};
use crate::service::{
    ItemProxyBlocking, SecretSessionProxyBlocking, ServiceProxyBlocking, PLAIN_ALGORITHM,
};

/// An open connection to the secret service plus a negotiated transfer
/// session. One session serves one logical request sequence; it holds remote
/// state, so concurrent callers should each open their own.
pub struct Session {
    conn: Connection,
    service: ServiceProxyBlocking<'static>,
    path: OwnedObjectPath,
}

impl Session {
    /// Connect to the session bus, locate the secret service, and negotiate
    /// a plain-algorithm session. Each step is terminal on failure; no
    /// retries are attempted at this layer.
    pub fn new() -> Result<Self> {
        let conn = Connection::session().map_err(Error::Transport)?;

        let service = ServiceProxyBlocking::new(&conn).map_err(Error::ServiceUnavailable)?;

        // A session is required before any secret value can be read.
        let (_, path) = service
            .open_session(PLAIN_ALGORITHM, &Value::from(""))
            .map_err(|err| {
                if is_service_missing(&err) {
                    Error::ServiceUnavailable(err)
                } else {
                    Error::SessionNegotiation(err)
                }
            })?;

        debug!("negotiated secret service session at {path}");

        Ok(Self {
            conn,
            service,
            path,
        })
    }

    /// Resolve `label` to a full credential.
    pub fn get_credential(&self, label: &str) -> Result<Credential> {
        resolver::resolve(self, label)
    }

    /// Resolve `label` and return only the secret value.
    pub fn get_secret(&self, label: &str) -> Result<String> {
        Ok(self.get_credential(label)?.password)
    }

    /// Release the negotiated session state on the service. Callers that
    /// already hold their result should log a close failure, not escalate it.
    pub fn close(self) -> Result<()> {
        let proxy = SecretSessionProxyBlocking::builder(&self.conn)
            .path(self.path.clone())
            .and_then(|builder| builder.build())
            .map_err(Error::SessionClose)?;

        proxy.close().map_err(Error::SessionClose)?;
        debug!("closed secret service session at {}", self.path);

        Ok(())
    }

    fn item_proxy(&self, item: &OwnedObjectPath) -> zbus::Result<ItemProxyBlocking<'_>> {
        ItemProxyBlocking::builder(&self.conn)
            .path(item.clone())?
            .build()
    }
}

impl SecretStore for Session {
    type Item = OwnedObjectPath;

    fn search(&self, attributes: &HashMap<&str, &str>) -> Result<SearchResult<OwnedObjectPath>> {
        let (unlocked, locked) = self
            .service
            .search_items(attributes)
            .map_err(Error::Search)?;

        debug!(
            "search matched {} unlocked and {} locked item(s)",
            unlocked.len(),
            locked.len()
        );

        Ok(SearchResult { unlocked, locked })
    }

    fn unlock(&self, item: &OwnedObjectPath) -> Result<()> {
        let (unlocked, prompt) = self
            .service
            .unlock(std::slice::from_ref(item))
            .map_err(|err| Error::Unlock(err.to_string()))?;

        if unlocked.contains(item) {
            return Ok(());
        }

        // Driving prompts would need user interaction; treat them as a
        // failed unlock so resolution moves on to the next candidate.
        if prompt.as_str() != "/" {
            return Err(Error::Unlock(format!(
                "item {item} requires an interactive prompt"
            )));
        }

        Err(Error::Unlock(format!("service left item {item} locked")))
    }

    fn read_secret(&self, item: &OwnedObjectPath) -> Result<Vec<u8>> {
        let secret = self
            .item_proxy(item)
            .and_then(|proxy| proxy.get_secret(&self.path))
            .map_err(|err| Error::SecretFetch(err.to_string()))?;

        Ok(secret.value)
    }

    fn read_attributes(&self, item: &OwnedObjectPath) -> Result<HashMap<String, String>> {
        self.item_proxy(item)
            .and_then(|proxy| proxy.attributes())
            .map_err(|err| Error::AttributeFetch(err.to_string()))
    }

    fn close(self) -> Result<()> {
        Session::close(self)
    }
}

/// The bus reports a missing service by error name; anything else during
/// negotiation is the service itself refusing the session.
fn is_service_missing(err: &zbus::Error) -> bool {
    match err {
        zbus::Error::MethodError(name, _, _) => {
            let name = name.as_str();
            name == "org.freedesktop.DBus.Error.ServiceUnknown"
                || name == "org.freedesktop.DBus.Error.NameHasNoOwner"
        }
        zbus::Error::FDO(fdo) => matches!(
            **fdo,
            zbus::fdo::Error::ServiceUnknown(_) | zbus::fdo::Error::NameHasNoOwner(_)
        ),
        _ => false,
    }
}
