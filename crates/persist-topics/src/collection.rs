use std::collections::HashMap;

use persist_core::Topic;

/// In-memory, rank-ordered view of a chat's topic tree.
///
/// Immutable once built — handlers hold shared read-only references to it.
/// All adjacency is computed from rank order, matching
/// `TopicDataCollection` in `original_source/persistsvc/topic_data_manager.py`:
/// a monotone rank scan is chronological-message order, since ranks are a
/// pre-order traversal of the tree.
#[derive(Debug, Clone)]
pub struct TopicCollection {
    by_rank: Vec<Topic>,
    by_id: HashMap<i64, usize>,
    leaf_indices: Vec<usize>,
}

impl TopicCollection {
    /// Build from topics already sorted by rank (root first). Leaves are any
    /// topic that no other topic names as `parent_id`.
    pub fn new(topics_by_rank: Vec<Topic>) -> Self {
        let by_id: HashMap<i64, usize> = topics_by_rank
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, i))
            .collect();

        let parent_ids: std::collections::HashSet<i64> =
            topics_by_rank.iter().filter_map(|t| t.parent_id).collect();

        let leaf_indices = topics_by_rank
            .iter()
            .enumerate()
            .filter(|(_, t)| !parent_ids.contains(&t.id))
            .map(|(i, _)| i)
            .collect();

        Self {
            by_rank: topics_by_rank,
            by_id,
            leaf_indices,
        }
    }

    pub fn as_list_by_rank(&self) -> &[Topic] {
        &self.by_rank
    }

    pub fn as_dict(&self) -> HashMap<i64, &Topic> {
        self.by_rank.iter().map(|t| (t.id, t)).collect()
    }

    pub fn leaf_list_by_rank(&self) -> Vec<&Topic> {
        self.leaf_indices.iter().map(|&i| &self.by_rank[i]).collect()
    }

    pub fn get(&self, id: i64) -> Option<&Topic> {
        self.by_id.get(&id).map(|&i| &self.by_rank[i])
    }

    pub fn is_leaf_by_id(&self, id: i64) -> bool {
        self.by_id
            .get(&id)
            .map(|&i| self.leaf_indices.contains(&i))
            .unwrap_or(false)
    }

    pub fn is_leaf(&self, t: &Topic) -> bool {
        self.is_leaf_by_id(t.id)
    }

    pub fn next_by_id(&self, id: i64) -> Option<&Topic> {
        let i = *self.by_id.get(&id)?;
        self.by_rank.get(i + 1)
    }

    pub fn next(&self, t: &Topic) -> Option<&Topic> {
        self.next_by_id(t.id)
    }

    pub fn previous_by_id(&self, id: i64) -> Option<&Topic> {
        let i = *self.by_id.get(&id)?;
        if i == 0 {
            None
        } else {
            self.by_rank.get(i - 1)
        }
    }

    pub fn previous(&self, t: &Topic) -> Option<&Topic> {
        self.previous_by_id(t.id)
    }

    pub fn next_leaf_by_id(&self, id: i64) -> Option<&Topic> {
        let i = *self.by_id.get(&id)?;
        let pos = self.leaf_indices.iter().position(|&li| li == i)?;
        self.leaf_indices.get(pos + 1).map(|&li| &self.by_rank[li])
    }

    pub fn next_leaf(&self, t: &Topic) -> Option<&Topic> {
        self.next_leaf_by_id(t.id)
    }

    pub fn previous_leaf_by_id(&self, id: i64) -> Option<&Topic> {
        let i = *self.by_id.get(&id)?;
        let pos = self.leaf_indices.iter().position(|&li| li == i)?;
        if pos == 0 {
            None
        } else {
            self.leaf_indices.get(pos - 1).map(|&li| &self.by_rank[li])
        }
    }

    pub fn previous_leaf(&self, t: &Topic) -> Option<&Topic> {
        self.previous_leaf_by_id(t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: i64, parent: Option<i64>, rank: u32, level: u32) -> Topic {
        Topic {
            id,
            parent_id: parent,
            rank,
            level,
            title: format!("t{id}"),
            description: String::new(),
        }
    }

    // Root / T1 / T2 / T3.T4 / T5 / T6, ranks 0..6, leaves T1, T4, T5, T6.
    fn sample_tree() -> TopicCollection {
        TopicCollection::new(vec![
            topic(0, None, 0, 1),       // Root
            topic(1, Some(0), 1, 2),    // T1 (leaf)
            topic(2, Some(0), 2, 2),    // T2
            topic(3, Some(2), 3, 3),    // T3
            topic(4, Some(3), 4, 4),    // T4 (leaf)
            topic(5, Some(2), 5, 3),    // T5 (leaf)
            topic(6, Some(0), 6, 2),    // T6 (leaf)
        ])
    }

    #[test]
    fn leaves_are_topics_with_no_children() {
        let c = sample_tree();
        let leaf_ids: Vec<i64> = c.leaf_list_by_rank().iter().map(|t| t.id).collect();
        assert_eq!(leaf_ids, vec![1, 4, 5, 6]);
        assert!(!c.is_leaf_by_id(0));
        assert!(!c.is_leaf_by_id(2));
        assert!(!c.is_leaf_by_id(3));
        assert!(c.is_leaf_by_id(1));
        assert!(c.is_leaf_by_id(6));
    }

    #[test]
    fn adjacency_respects_rank_order() {
        let c = sample_tree();
        assert_eq!(c.next_by_id(0).unwrap().id, 1);
        assert_eq!(c.previous_by_id(1).unwrap().id, 0);
        assert!(c.previous_by_id(0).is_none());
        assert!(c.next_by_id(6).is_none());
    }

    #[test]
    fn leaf_adjacency_skips_non_leaves() {
        let c = sample_tree();
        assert_eq!(c.next_leaf_by_id(1).unwrap().id, 4);
        assert_eq!(c.next_leaf_by_id(4).unwrap().id, 5);
        assert_eq!(c.previous_leaf_by_id(5).unwrap().id, 4);
        assert!(c.previous_leaf_by_id(1).is_none());
        assert!(c.next_leaf_by_id(6).is_none());
    }
}
