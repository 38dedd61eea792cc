use std::fmt;

use crate::config::ExtraConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Status,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Ordered messages of a single result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagesCollection(Vec<Message>);

impl MessagesCollection {
    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Message::is_error)
    }
}

/// Outcome of one operation on one version directory.
///
/// A result without messages is neutral: nothing happened and nothing is
/// recorded. Any error message makes it a failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationResult {
    messages: MessagesCollection,
    extra_config: ExtraConfig,
    version: String,
    operation_name: String,
}

impl OperationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_status(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages.push(Message::new(MessageKind::Status, text));
        self
    }

    pub fn add_warning(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages.push(Message::new(MessageKind::Warning, text));
        self
    }

    pub fn add_error(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages.push(Message::new(MessageKind::Error, text));
        self
    }

    pub fn is_failure(&self) -> bool {
        self.messages.has_errors()
    }

    pub fn is_success(&self) -> bool {
        !self.messages.is_empty() && !self.is_failure()
    }

    pub fn is_neutral(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &MessagesCollection {
        &self.messages
    }

    pub fn extra_config(&self) -> &ExtraConfig {
        &self.extra_config
    }

    pub fn set_extra_config(&mut self, extra_config: ExtraConfig) -> &mut Self {
        self.extra_config = extra_config;
        self
    }

    /// Attach the version and operation labels used when printing.
    pub fn labeled(
        mut self,
        version: impl fmt::Display,
        operation_name: impl Into<String>,
    ) -> Self {
        self.version = format!("v{}", version);
        self.operation_name = operation_name.into();
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }
}

/// All results produced while handling one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationResultCollection(Vec<OperationResult>);

impl OperationResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: OperationResult) {
        self.0.push(result);
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationResult> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any collected result is not neutral.
    pub fn made_changes(&self) -> bool {
        self.0.iter().any(|result| !result.is_neutral())
    }
}

impl IntoIterator for OperationResultCollection {
    type Item = OperationResult;
    type IntoIter = std::vec::IntoIter<OperationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let neutral = OperationResult::new();
        assert!(neutral.is_neutral());
        assert!(!neutral.is_success());
        assert!(!neutral.is_failure());

        let mut success = OperationResult::new();
        success.add_status("done").add_warning("careful");
        assert!(success.is_success());
        assert!(!success.is_failure());
        assert!(!success.is_neutral());

        let mut failure = OperationResult::new();
        failure.add_status("half done").add_error("broken");
        assert!(failure.is_failure());
        assert!(!failure.is_success());
        assert!(!failure.is_neutral());
    }

    #[test]
    fn test_labeled() {
        let mut result = OperationResult::new();
        result.add_status("ok");
        let result = result.labeled("1.2", "Copy Files");
        assert_eq!(result.version(), "v1.2");
        assert_eq!(result.operation_name(), "Copy Files");
    }

    #[test]
    fn test_made_changes() {
        let mut collection = OperationResultCollection::new();
        collection.push(OperationResult::new());
        assert!(!collection.made_changes());

        let mut failure = OperationResult::new();
        failure.add_error("broken");
        collection.push(failure);
        assert!(collection.made_changes());
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_messages_keep_order() {
        let mut result = OperationResult::new();
        result.add_warning("first").add_status("second");
        let texts: Vec<_> = result.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
