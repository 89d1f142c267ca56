//! Label-to-credential resolution.
//!
//! The algorithm lives behind the [`SecretStore`] trait so it can be tested
//! against a scripted store without a running secret service. The real store
//! is [`crate::session::Session`].

use std::collections::HashMap;
use std::fmt;

use log::warn;

use crate::error::{Error, Result};
use crate::session::Session;

/// Attribute the label is matched against.
pub const TITLE_ATTRIBUTE: &str = "Title";

/// A resolved secret with its descriptive attributes. URL and username stay
/// empty when the item carries no matching attributes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Credential {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "url={} username={} password={}",
            self.url, self.username, self.password
        )
    }
}

/// Search matches partitioned by lock state, each in service-returned order.
pub struct SearchResult<I> {
    pub unlocked: Vec<I>,
    pub locked: Vec<I>,
}

/// Operations the resolver needs from a secret store. Items are opaque
/// handles into remote state; the store is the only way to act on them.
pub trait SecretStore {
    type Item;

    fn search(&self, attributes: &HashMap<&str, &str>) -> Result<SearchResult<Self::Item>>;

    fn unlock(&self, item: &Self::Item) -> Result<()>;

    fn read_secret(&self, item: &Self::Item) -> Result<Vec<u8>>;

    fn read_attributes(&self, item: &Self::Item) -> Result<HashMap<String, String>>;

    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Resolve `label` to a credential: unlocked matches first, then locked ones
/// after unlocking. Returns the first item that yields a secret.
pub(crate) fn resolve<S: SecretStore>(store: &S, label: &str) -> Result<Credential> {
    let criteria = HashMap::from([(TITLE_ATTRIBUTE, label)]);
    let found = store.search(&criteria)?;

    // Only the first unlocked candidate is ever examined: a successful read
    // returns and a failed read aborts. Only unlock failures fall through.
    if let Some(item) = found.unlocked.first() {
        return assemble(store, item);
    }

    for item in &found.locked {
        if let Err(err) = store.unlock(item) {
            warn!("skipping locked item: {err}");
            continue;
        }
        return assemble(store, item);
    }

    Err(Error::NoMatchFound)
}

fn assemble<S: SecretStore>(store: &S, item: &S::Item) -> Result<Credential> {
    let value = store.read_secret(item)?;
    let password = String::from_utf8(value)
        .map_err(|_| Error::SecretFetch("secret value is not valid UTF-8".to_string()))?;

    let mut credential = Credential {
        password,
        ..Credential::default()
    };

    // A readable secret is still worth returning when the metadata read
    // fails; the credential just comes back with empty URL/username.
    match store.read_attributes(item) {
        Ok(attributes) => fill_from_attributes(&mut credential, &attributes),
        Err(err) => warn!("could not read item attributes: {err}"),
    }

    Ok(credential)
}

/// Keys are matched case-insensitively; a field set once is never
/// overwritten, and the scan stops as soon as both fields are filled.
fn fill_from_attributes(credential: &mut Credential, attributes: &HashMap<String, String>) {
    for (key, value) in attributes {
        if credential.username.is_empty() && key.eq_ignore_ascii_case("username") {
            credential.username = value.clone();
        } else if credential.url.is_empty() && key.eq_ignore_ascii_case("url") {
            credential.url = value.clone();
        }

        if !credential.username.is_empty() && !credential.url.is_empty() {
            break;
        }
    }
}

/// One-shot lookup: open a session, resolve, close. A close failure is
/// logged and never changes the outcome.
pub fn get_credential(label: &str) -> Result<Credential> {
    resolve_and_close(Session::new()?, label)
}

/// One-shot lookup returning only the secret value.
pub fn get_secret(label: &str) -> Result<String> {
    Ok(get_credential(label)?.password)
}

fn resolve_and_close<S: SecretStore>(store: S, label: &str) -> Result<Credential> {
    let result = resolve(&store, label);

    if let Err(err) = store.close() {
        warn!("{err}");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MockItem {
        locked: bool,
        unlockable: bool,
        /// `None` makes the secret fetch fail.
        secret: Option<Vec<u8>>,
        attributes: Vec<(&'static str, &'static str)>,
        attributes_fail: bool,
    }

    impl MockItem {
        fn unlocked(secret: &[u8]) -> Self {
            Self {
                secret: Some(secret.to_vec()),
                ..Self::default()
            }
        }

        fn locked(secret: &[u8], unlockable: bool) -> Self {
            Self {
                locked: true,
                unlockable,
                secret: Some(secret.to_vec()),
                ..Self::default()
            }
        }

        fn with_attributes(mut self, attributes: &[(&'static str, &'static str)]) -> Self {
            self.attributes = attributes.to_vec();
            self
        }
    }

    /// Scripted store; items match a single label and are addressed by index.
    #[derive(Default)]
    struct MockStore {
        label: String,
        items: Vec<MockItem>,
        closed: Rc<Cell<u32>>,
        unlock_attempts: Rc<RefCell<Vec<usize>>>,
    }

    impl MockStore {
        fn new(label: &str, items: Vec<MockItem>) -> Self {
            Self {
                label: label.to_string(),
                items,
                ..Self::default()
            }
        }
    }

    impl SecretStore for MockStore {
        type Item = usize;

        fn search(&self, attributes: &HashMap<&str, &str>) -> Result<SearchResult<usize>> {
            let mut result = SearchResult {
                unlocked: Vec::new(),
                locked: Vec::new(),
            };

            if attributes.get(TITLE_ATTRIBUTE) != Some(&self.label.as_str()) {
                return Ok(result);
            }

            for (index, item) in self.items.iter().enumerate() {
                if item.locked {
                    result.locked.push(index);
                } else {
                    result.unlocked.push(index);
                }
            }

            Ok(result)
        }

        fn unlock(&self, item: &usize) -> Result<()> {
            self.unlock_attempts.borrow_mut().push(*item);

            if self.items[*item].unlockable {
                Ok(())
            } else {
                Err(Error::Unlock(format!("item {item} requires a prompt")))
            }
        }

        fn read_secret(&self, item: &usize) -> Result<Vec<u8>> {
            self.items[*item]
                .secret
                .clone()
                .ok_or_else(|| Error::SecretFetch("transfer failed".to_string()))
        }

        fn read_attributes(&self, item: &usize) -> Result<HashMap<String, String>> {
            let item = &self.items[*item];

            if item.attributes_fail {
                return Err(Error::AttributeFetch("item is gone".to_string()));
            }

            Ok(item
                .attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect())
        }

        fn close(self) -> Result<()> {
            self.closed.set(self.closed.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn unlocked_match_yields_full_credential() {
        let store = MockStore::new(
            "example.com",
            vec![MockItem::unlocked(b"s3cr3t")
                .with_attributes(&[("username", "bob"), ("url", "https://example.com")])],
        );

        let credential = resolve(&store, "example.com").unwrap();

        assert_eq!(
            credential,
            Credential {
                url: "https://example.com".to_string(),
                username: "bob".to_string(),
                password: "s3cr3t".to_string(),
            }
        );
    }

    #[test]
    fn no_matching_items_is_no_match_found() {
        let store = MockStore::new("something-else", Vec::new());

        let result = resolve(&store, "nope");

        assert!(matches!(result, Err(Error::NoMatchFound)));
    }

    #[test]
    fn locked_item_is_unlocked_before_reading() {
        let store = MockStore::new(
            "locked.example",
            vec![MockItem::locked(b"hunter2", true)],
        );

        let credential = resolve(&store, "locked.example").unwrap();

        assert_eq!(credential.password, "hunter2");
        assert_eq!(*store.unlock_attempts.borrow(), vec![0]);
    }

    #[test]
    fn unlocked_items_are_preferred_over_locked() {
        let store = MockStore::new(
            "mixed",
            vec![
                MockItem::locked(b"from-locked", true),
                MockItem::unlocked(b"from-unlocked"),
            ],
        );

        let credential = resolve(&store, "mixed").unwrap();

        assert_eq!(credential.password, "from-unlocked");
        assert!(store.unlock_attempts.borrow().is_empty());
    }

    #[test]
    fn failed_unlock_skips_to_next_candidate() {
        let store = MockStore::new(
            "stubborn",
            vec![
                MockItem::locked(b"unreachable", false),
                MockItem::locked(b"reachable", true),
            ],
        );

        let credential = resolve(&store, "stubborn").unwrap();

        assert_eq!(credential.password, "reachable");
        assert_eq!(*store.unlock_attempts.borrow(), vec![0, 1]);
    }

    #[test]
    fn exhausted_candidates_is_no_match_found() {
        let store = MockStore::new(
            "stuck",
            vec![MockItem::locked(b"unreachable", false)],
        );

        let result = resolve(&store, "stuck");

        assert!(matches!(result, Err(Error::NoMatchFound)));
    }

    #[test]
    fn secret_fetch_failure_aborts_without_fallthrough() {
        let mut broken = MockItem::unlocked(b"");
        broken.secret = None;

        let store = MockStore::new(
            "broken",
            vec![broken, MockItem::unlocked(b"never-reached")],
        );

        let result = resolve(&store, "broken");

        assert!(matches!(result, Err(Error::SecretFetch(_))));
    }

    #[test]
    fn attribute_keys_match_case_insensitively() {
        let upper = MockStore::new(
            "site",
            vec![MockItem::unlocked(b"x").with_attributes(&[("URL", "https://site")])],
        );
        let lower = MockStore::new(
            "site",
            vec![MockItem::unlocked(b"x").with_attributes(&[("url", "https://site")])],
        );

        let from_upper = resolve(&upper, "site").unwrap();
        let from_lower = resolve(&lower, "site").unwrap();

        assert_eq!(from_upper.url, "https://site");
        assert_eq!(from_upper, from_lower);
    }

    #[test]
    fn attribute_failure_still_returns_the_password() {
        let mut item = MockItem::unlocked(b"still-here");
        item.attributes_fail = true;

        let store = MockStore::new("flaky", vec![item]);

        let credential = resolve(&store, "flaky").unwrap();

        assert_eq!(credential.password, "still-here");
        assert_eq!(credential.url, "");
        assert_eq!(credential.username, "");
    }

    #[test]
    fn one_shot_closes_the_store_once_on_success() {
        let store = MockStore::new("example.com", vec![MockItem::unlocked(b"s3cr3t")]);
        let closed = Rc::clone(&store.closed);

        let credential = resolve_and_close(store, "example.com").unwrap();

        assert_eq!(credential.password, "s3cr3t");
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn one_shot_closes_the_store_once_on_error() {
        let store = MockStore::new("example.com", Vec::new());
        let closed = Rc::clone(&store.closed);

        let result = resolve_and_close(store, "nope");

        assert!(matches!(result, Err(Error::NoMatchFound)));
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn credential_display_is_one_line() {
        let credential = Credential {
            url: "https://example.com".to_string(),
            username: "bob".to_string(),
            password: "s3cr3t".to_string(),
        };

        assert_eq!(
            credential.to_string(),
            "url=https://example.com username=bob password=s3cr3t"
        );
    }
}
