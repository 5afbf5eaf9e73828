use crate::collect::Message;
use std::collections::{HashMap, HashSet};

/// Message ids a run must not touch because their thread holds a message
/// worth keeping.
#[derive(Debug, Default)]
pub struct KeptThreads {
    /// Ids of the flagged or unread messages themselves.
    pub seeds: HashSet<String>,
    /// Ids of every other message in the same threads.
    pub related: HashSet<String>,
}

impl KeptThreads {
    pub fn scan(messages: &[Message], keep_flagged: bool, keep_unread: bool) -> Self {
        let mut kept = KeptThreads::default();
        if !keep_flagged && !keep_unread {
            return kept;
        }

        info!("Scanning threads...");
        let mut links: HashMap<&str, Vec<&str>> = HashMap::new();
        for message in messages {
            let mid = match message.message_id.as_deref() {
                Some(mid) => mid,
                None => {
                    debug!("Mail without a message ID: {}", message.subject());
                    continue;
                }
            };
            if keep_flagged && message.is_flagged() {
                debug!("Flagged: {} -- {}", message.subject(), mid);
                kept.seeds.insert(mid.to_string());
            }
            if keep_unread && message.is_unread() {
                debug!("Unread: {} -- {}", message.subject(), mid);
                kept.seeds.insert(mid.to_string());
            }
            links.entry(mid).or_default();
            // References count as well, since intermediate messages may well
            // live in another folder.
            let parents = message.in_reply_to.iter().chain(message.references.iter());
            for parent in parents {
                let parent = parent.as_str();
                if parent == mid {
                    continue;
                }
                links.entry(mid).or_default().push(parent);
                links.entry(parent).or_default().push(mid);
            }
        }

        {
            let mut visited: HashSet<&str> = kept.seeds.iter().map(String::as_str).collect();
            let mut queue: Vec<&str> = visited.iter().copied().collect();
            while let Some(mid) = queue.pop() {
                for &next in links.get(mid).into_iter().flatten() {
                    if visited.insert(next) {
                        debug!("Related: {} (to {})", next, mid);
                        kept.related.insert(next.to_string());
                        queue.push(next);
                    }
                }
            }
        }
        info!("Done scanning.");
        kept
    }
}
