//! Key/value providers the decoder reads from.
//!
//! The engine only ever calls [`Source::get`]. A missing key and an empty
//! value are both treated as absent, so sources whose legitimate values can
//! be empty need a richer adapter around the decoder.

use std::borrow::{Borrow, Cow};
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use url::form_urlencoded;

pub trait Source {
    fn get(&self, key: &str) -> Option<Cow<'_, str>>;
}

impl<S: Source + ?Sized> Source for &S {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        (**self).get(key)
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        (**self).get(key)
    }
}

impl<K, V, H> Source for HashMap<K, V, H>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<str>,
    H: BuildHasher,
{
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        HashMap::get(self, key).map(|value| Cow::Borrowed(value.as_ref()))
    }
}

impl<K, V> Source for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: AsRef<str>,
{
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        BTreeMap::get(self, key).map(|value| Cow::Borrowed(value.as_ref()))
    }
}

// First matching pair wins.
impl<K, V> Source for [(K, V)]
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        self.iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, value)| Cow::Borrowed(value.as_ref()))
    }
}

impl<K, V, const N: usize> Source for [(K, V); N]
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        Source::get(self.as_slice(), key)
    }
}

/// A source backed by a lookup function.
#[derive(Debug, Clone, Copy)]
pub struct FnSource<F>(pub F);

impl<F> Source for FnSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        (self.0)(key).map(Cow::Owned)
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Env;

impl Source for Env {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        std::env::var(key).ok().map(Cow::Owned)
    }
}

/// Prepends a fixed prefix to every key before asking the inner source.
#[derive(Debug, Clone)]
pub struct Prefixed<S> {
    prefix: String,
    inner: S,
}

impl<S> Prefixed<S> {
    pub fn new(prefix: impl Into<String>, inner: S) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Source> Source for Prefixed<S> {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        if self.prefix.is_empty() {
            return self.inner.get(key);
        }
        self.inner.get(&format!("{}{key}", self.prefix))
    }
}

/// URL query string parameters. The first occurrence of a repeated key wins.
#[derive(Debug, Clone, Default)]
pub struct Query {
    params: HashMap<String, String>,
}

impl Query {
    /// Parses `a=1&b=2`, with or without a leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = HashMap::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { params }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl Source for Query {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        self.params.get(key).map(|value| Cow::Borrowed(value.as_str()))
    }
}

// Header names are case-insensitive; values that are not visible ASCII are
// treated as absent.
#[cfg(feature = "http")]
impl Source for http::HeaderMap {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        http::HeaderMap::get(self, key)?
            .to_str()
            .ok()
            .map(Cow::Borrowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_borrow_values() {
        let map: HashMap<String, String> = [("HOST".to_owned(), "localhost".to_owned())].into();
        assert_eq!(Source::get(&map, "HOST").as_deref(), Some("localhost"));
        assert_eq!(Source::get(&map, "PORT"), None);

        let tree: BTreeMap<&str, &str> = [("a", "1")].into();
        assert_eq!(Source::get(&tree, "a").as_deref(), Some("1"));
    }

    #[test]
    fn pairs_first_match_wins() {
        let pairs = [("k", "first"), ("k", "second")];
        assert_eq!(Source::get(&pairs, "k").as_deref(), Some("first"));
        assert_eq!(Source::get(&pairs[..], "missing"), None);
    }

    #[test]
    fn prefixed_rewrites_keys() {
        let map: HashMap<&str, &str> = [("APP_PORT", "80"), ("PORT", "1")].into();
        let source = Prefixed::new("APP_", &map);
        assert_eq!(source.get("PORT").as_deref(), Some("80"));

        let bare = Prefixed::new("", &map);
        assert_eq!(bare.get("PORT").as_deref(), Some("1"));
    }

    #[test]
    fn fn_source_calls_through() {
        let source = FnSource(|key: &str| (key == "x").then(|| "y".to_owned()));
        assert_eq!(source.get("x").as_deref(), Some("y"));
        assert_eq!(source.get("z"), None);
    }

    #[test]
    fn query_decodes_percent_and_plus() {
        let query = Query::parse("?name=a%20b&tag=x+y&tag=second&empty=");
        assert_eq!(Source::get(&query, "name").as_deref(), Some("a b"));
        assert_eq!(Source::get(&query, "tag").as_deref(), Some("x y"));
        assert_eq!(Source::get(&query, "empty").as_deref(), Some(""));
        assert_eq!(query.len(), 3);
    }

    #[cfg(feature = "http")]
    #[test]
    fn header_names_are_case_insensitive() {
        let mut headers = http::HeaderMap::new();
        headers.insert("x-request-id", http::HeaderValue::from_static("abc"));
        assert_eq!(
            Source::get(&headers, "X-Request-Id").as_deref(),
            Some("abc")
        );
        assert_eq!(Source::get(&headers, "bad header"), None);
    }
}
