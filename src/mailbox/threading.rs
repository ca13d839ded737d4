//! Group messages into conversation threads.
//!
//! Messages sharing any identifier through `Message-ID`, `In-Reply-To` or
//! `References` end up in the same thread.

use std::collections::HashMap;

use crate::model::message::{InboundMessage, MailThread};

/// Build threads from a list of messages.
///
/// Returns threads sorted by their newest message (descending); messages
/// inside a thread are sorted oldest first.
pub fn build_threads(messages: Vec<InboundMessage>) -> Vec<MailThread> {
    if messages.is_empty() {
        return Vec::new();
    }

    let keys: Vec<String> = messages
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            if m.message_id.is_empty() {
                format!("__synth_{idx}__")
            } else {
                m.message_id.clone()
            }
        })
        .collect();

    let mut sets = DisjointSets::default();
    for (key, message) in keys.iter().zip(&messages) {
        sets.add(key);
        for reference in message.references.iter().chain(message.in_reply_to.iter()) {
            if !reference.is_empty() {
                sets.union(key, reference);
            }
        }
    }

    let mut groups: HashMap<String, Vec<InboundMessage>> = HashMap::new();
    for (key, message) in keys.iter().zip(messages) {
        let root = sets.find(key);
        groups.entry(root).or_default().push(message);
    }

    let mut threads: Vec<MailThread> = groups
        .into_values()
        .map(|mut messages| {
            messages.sort_by(|a, b| a.received_at.cmp(&b.received_at).then_with(|| a.id.cmp(&b.id)));
            let root_message_id = messages
                .iter()
                .map(|m| m.message_id.clone())
                .find(|id| !id.is_empty())
                .unwrap_or_else(|| format!("__synth_{}__", messages[0].id));
            MailThread {
                root_message_id,
                messages,
            }
        })
        .collect();

    threads.sort_by(|a, b| {
        b.newest()
            .cmp(&a.newest())
            .then_with(|| a.root_message_id.cmp(&b.root_message_id))
    });
    threads
}

/// Union-find over message identifiers.
#[derive(Default)]
struct DisjointSets {
    parent: HashMap<String, String>,
}

impl DisjointSets {
    fn add(&mut self, id: &str) {
        self.parent
            .entry(id.to_string())
            .or_insert_with(|| id.to_string());
    }

    fn find(&mut self, id: &str) -> String {
        self.add(id);
        let mut root = id.to_string();
        while let Some(parent) = self.parent.get(&root) {
            if *parent == root {
                break;
            }
            root = parent.clone();
        }

        // Path compression
        let mut current = id.to_string();
        while current != root {
            let next = self.parent.insert(current.clone(), root.clone()).unwrap_or_else(|| root.clone());
            current = next;
        }
        root
    }

    fn union(&mut self, a: &str, b: &str) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent.insert(rb, ra);
        }
    }
}
