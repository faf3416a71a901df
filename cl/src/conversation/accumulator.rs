//! Assembles streamed tool-call fragments into complete calls

use tracing::{debug, warn};

use crate::llm::{ToolCall, ToolCallDelta};

/// How far past the last known slot a fragment index may reach
pub const MAX_INDEX_GAP: usize = 64;

#[derive(Debug, Default, Clone)]
struct PartialToolCall {
    id: String,
    call_type: String,
    name: String,
    arguments: String,
}

impl PartialToolCall {
    fn is_placeholder(&self) -> bool {
        self.id.is_empty() && self.call_type.is_empty() && self.name.is_empty() && self.arguments.is_empty()
    }
}

/// Merges tool-call fragments by their index within the response
///
/// Identity fields are taken from the first fragment that carries a
/// non-empty value; argument text is concatenated in arrival order.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    slots: Vec<PartialToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fragment; fragments without an index are ignored
    pub fn push(&mut self, delta: &ToolCallDelta) {
        let Some(index) = delta.index else {
            debug!("ToolCallAccumulator::push: fragment without index ignored");
            return;
        };

        let limit = self.slots.len().saturating_add(MAX_INDEX_GAP);
        let Some(needed) = index.checked_add(1).filter(|_| index <= limit) else {
            warn!(index, slots = self.slots.len(), "ToolCallAccumulator::push: fragment index out of range ignored");
            return;
        };
        if self.slots.len() < needed {
            self.slots.resize_with(needed, PartialToolCall::default);
        }
        let slot = &mut self.slots[index];

        if let Some(id) = delta.id.as_deref().filter(|s| !s.is_empty())
            && slot.id.is_empty()
        {
            slot.id = id.to_string();
        }
        if let Some(call_type) = delta.call_type.as_deref().filter(|s| !s.is_empty())
            && slot.call_type.is_empty()
        {
            slot.call_type = call_type.to_string();
        }
        if let Some(name) = delta.name.as_deref().filter(|s| !s.is_empty())
            && slot.name.is_empty()
        {
            slot.name = name.to_string();
        }
        if let Some(arguments) = &delta.arguments {
            slot.arguments.push_str(arguments);
        }
    }

    /// Whether any slot has received a field
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(PartialToolCall::is_placeholder)
    }

    /// Finalise into complete calls in index order
    pub fn finish(self) -> Vec<ToolCall> {
        let calls: Vec<ToolCall> = self
            .slots
            .into_iter()
            .filter(|slot| !slot.is_placeholder())
            .map(|slot| {
                let id = if slot.id.is_empty() {
                    let generated = format!("call_{}", uuid::Uuid::now_v7().simple());
                    debug!(%generated, "ToolCallAccumulator::finish: generated missing id");
                    generated
                } else {
                    slot.id
                };
                ToolCall {
                    id,
                    call_type: if slot.call_type.is_empty() {
                        "function".to_string()
                    } else {
                        slot.call_type
                    },
                    name: slot.name,
                    arguments: slot.arguments,
                }
            })
            .collect();
        debug!(count = calls.len(), "ToolCallAccumulator::finish: complete");
        calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(index: Option<usize>, id: Option<&str>, name: Option<&str>, args: Option<&str>) -> ToolCallDelta {
        ToolCallDelta {
            index,
            id: id.map(str::to_string),
            call_type: None,
            name: name.map(str::to_string),
            arguments: args.map(str::to_string),
        }
    }

    #[test]
    fn test_merges_interleaved_fragments() {
        let mut acc = ToolCallAccumulator::new();
        acc.push(&fragment(Some(0), Some("call_a"), Some("read_file"), Some("{\"target")));
        acc.push(&fragment(Some(1), Some("call_b"), Some("list_dir"), None));
        acc.push(&fragment(Some(0), None, None, Some("_file\":\"a.txt\"}")));
        acc.push(&fragment(Some(1), None, None, Some("{}")));

        let calls = acc.finish();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].name, "read_file");
        assert_eq!(calls[0].arguments, "{\"target_file\":\"a.txt\"}");
        assert_eq!(calls[0].call_type, "function");
        assert_eq!(calls[1].name, "list_dir");
        assert_eq!(calls[1].arguments, "{}");
    }

    #[test]
    fn test_first_non_empty_identity_wins() {
        let mut acc = ToolCallAccumulator::new();
        acc.push(&fragment(Some(0), Some(""), Some(""), None));
        acc.push(&fragment(Some(0), Some("call_1"), Some("grep_search"), None));
        acc.push(&fragment(Some(0), Some("call_2"), Some("other"), None));

        let calls = acc.finish();
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "grep_search");
    }

    #[test]
    fn test_drops_unindexed_and_placeholder_slots() {
        let mut acc = ToolCallAccumulator::new();
        acc.push(&fragment(None, Some("ghost"), Some("write_file"), Some("{}")));
        assert!(acc.is_empty());

        acc.push(&fragment(Some(2), Some("call_c"), Some("list_dir"), None));
        assert!(!acc.is_empty());

        let calls = acc.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_c");
    }

    #[test]
    fn test_out_of_range_index_ignored() {
        let mut acc = ToolCallAccumulator::new();
        acc.push(&fragment(Some(usize::MAX), Some("call_x"), Some("list_dir"), Some("{}")));
        acc.push(&fragment(Some(1_000_000_000), Some("call_y"), Some("list_dir"), Some("{}")));
        assert!(acc.is_empty());
        assert!(acc.slots.is_empty());

        acc.push(&fragment(Some(MAX_INDEX_GAP), Some("call_z"), Some("list_dir"), Some("{}")));
        acc.push(&fragment(Some(MAX_INDEX_GAP * 3), Some("call_w"), Some("list_dir"), Some("{}")));
        let calls = acc.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_z");
    }

    #[test]
    fn test_generates_missing_id() {
        let mut acc = ToolCallAccumulator::new();
        acc.push(&fragment(Some(0), None, Some("list_dir"), Some("{}")));

        let calls = acc.finish();
        assert!(calls[0].id.starts_with("call_"));
        assert!(calls[0].id.len() > "call_".len());
    }
}
