//! Marker envelope around content appended to shared project files.

use uuid::Uuid;

/// Scope written into every marker line.
pub const MARKER_SCOPE: &str = "Scaffolder";

const NOTICE: &str =
    "# Do not remove the above line if you want the installer to be able to delete the content on uninstall";

/// Fresh 128-bit hex identifier for one install call.
pub fn unique_hash() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Begin/end markers of one block appended for a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerEnvelope {
    begin: String,
    end: String,
}

impl MarkerEnvelope {
    pub fn new(package: &str, hash: &str) -> Self {
        Self {
            begin: format!("###BEGIN-{}-{}-{}###", MARKER_SCOPE, package, hash),
            end: format!("###END-{}-{}-{}###", MARKER_SCOPE, package, hash),
        }
    }

    /// The block to append to a target file.
    pub fn wrap(&self, content: &str) -> String {
        format!("\n{}\n{}\n{}\n{}", self.begin, NOTICE, content, self.end)
    }

    /// Remove the block from `haystack`.
    ///
    /// Returns `None` when either marker is missing.
    pub fn strip(&self, haystack: &str) -> Option<String> {
        let begin = format!("\n{}", self.begin);
        let start = haystack.find(&begin)?;
        let end = start + haystack[start..].find(&self.end)? + self.end.len();

        let mut stripped = String::with_capacity(haystack.len() - (end - start));
        stripped.push_str(&haystack[..start]);
        stripped.push_str(&haystack[end..]);
        Some(stripped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_format() {
        let envelope = MarkerEnvelope::new("acme/widget", "abc123");
        assert_eq!(
            envelope.wrap("B=2"),
            "\n###BEGIN-Scaffolder-acme/widget-abc123###\n\
             # Do not remove the above line if you want the installer to be able to delete the content on uninstall\n\
             B=2\n\
             ###END-Scaffolder-acme/widget-abc123###"
        );
    }

    #[test]
    fn test_strip_restores_original() {
        let envelope = MarkerEnvelope::new("acme/widget", "abc123");
        let original = "A=1";
        let appended = format!("{}{}", original, envelope.wrap("B=2\n"));

        assert_eq!(envelope.strip(&appended).as_deref(), Some(original));
    }

    #[test]
    fn test_strip_keeps_surrounding_content() {
        let first = MarkerEnvelope::new("acme/widget", "one");
        let second = MarkerEnvelope::new("acme/widget", "two");
        let content = format!("A=1{}{}\nZ=26", first.wrap("B=2"), second.wrap("C=3"));

        let stripped = first.strip(&content).unwrap();
        assert_eq!(stripped, format!("A=1{}\nZ=26", second.wrap("C=3")));
    }

    #[test]
    fn test_strip_missing_markers() {
        let envelope = MarkerEnvelope::new("acme/widget", "abc123");
        assert!(envelope.strip("A=1").is_none());

        let other = MarkerEnvelope::new("acme/widget", "other");
        let content = format!("A=1{}", other.wrap("B=2"));
        assert!(envelope.strip(&content).is_none());
    }

    #[test]
    fn test_unique_hash() {
        let first = unique_hash();
        let second = unique_hash();
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
