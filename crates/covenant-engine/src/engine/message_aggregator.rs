//! Message Aggregator (`spec.md` §4.10): dedupes `AnalysisMessage`s by
//! `(file, line, column)`, keeping the worse verdict, the message with a
//! usable repr, and (as a final tie-break) the shorter text.

use std::collections::BTreeMap;

use covenant_core::AnalysisMessage;

#[derive(Debug, Default)]
pub struct MessageAggregator {
    by_location: BTreeMap<(String, u32, u32), AnalysisMessage>,
}

impl MessageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: AnalysisMessage) {
        let key = (
            message.location.file.clone(),
            message.location.line,
            message.location.column,
        );
        match self.by_location.get(&key) {
            Some(existing) if existing.priority_key() >= message.priority_key() => {}
            _ => {
                self.by_location.insert(key, message);
            }
        }
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = AnalysisMessage>) {
        for message in messages {
            self.push(message);
        }
    }

    pub fn into_messages(self) -> Vec<AnalysisMessage> {
        self.by_location.into_values().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::{MessageKind, SourceLocation};

    fn msg(kind: MessageKind, text: &str, line: u32) -> AnalysisMessage {
        AnalysisMessage::new(kind, text, SourceLocation::new("a.py", line, 0))
    }

    #[test]
    fn same_location_keeps_worse_verdict() {
        let mut agg = MessageAggregator::new();
        agg.push(msg(MessageKind::Confirmed, "ok", 10));
        agg.push(msg(MessageKind::PostconditionFail, "bad", 10));
        let messages = agg.into_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::PostconditionFail);
    }

    #[test]
    fn distinct_locations_are_both_kept() {
        let mut agg = MessageAggregator::new();
        agg.push(msg(MessageKind::Confirmed, "ok", 10));
        agg.push(msg(MessageKind::Confirmed, "ok2", 11));
        assert_eq!(agg.into_messages().len(), 2);
    }

    #[test]
    fn unusable_repr_loses_to_a_usable_one_at_equal_severity() {
        let mut agg = MessageAggregator::new();
        agg.push(msg(MessageKind::CannotConfirm, "<unable to repr>", 5));
        agg.push(msg(MessageKind::CannotConfirm, "f(3)", 5));
        let messages = agg.into_messages();
        assert_eq!(messages[0].text, "f(3)");
    }
}
