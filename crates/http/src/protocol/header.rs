/// Header collection with lowercase names and last-write-wins semantics.
///
/// Names are canonicalized to lowercase on insert, so lookups are
/// case-insensitive. Insertion order is preserved for serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a header, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        let position = self.entries.iter().position(|(n, _)| *n == name)?;
        Some(self.entries.remove(position).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_lowercased_and_lookups_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", "text/plain");

        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(headers.iter().next(), Some(("content-type", "text/plain")));
    }

    #[test]
    fn last_write_wins_keeps_position() {
        let mut headers = HeaderMap::new();
        headers.insert("accept", "*/*");
        headers.insert("host", "localhost");
        headers.insert("Accept", "text/html");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("accept"), Some("text/html"));
        // the replaced entry stays first
        assert_eq!(headers.iter().next(), Some(("accept", "text/html")));
    }

    #[test]
    fn remove_returns_the_value() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", "abc");

        assert_eq!(headers.remove("X-Request-Id"), Some("abc".to_owned()));
        assert!(headers.is_empty());
        assert_eq!(headers.remove("x-request-id"), None);
    }
}
