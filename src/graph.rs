//! The friendship graph.
//!
//! Friendships are undirected edges between two profiles. The database stores
//! them as rows with two foreign keys, the functions in here work on rows that
//! were already loaded and don't care about the direction they were stored in.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use chrono::NaiveDateTime;
use itertools::Itertools;

/// Order a pair of profile ids so that the smaller one comes first.
///
/// Returns `None` if both sides are identical, as a profile can't be friends with itself.
pub fn normalize_pair<Id: Ord>(a: Id, b: Id) -> Option<(Id, Id)> {
    match a.cmp(&b) {
        Ordering::Less => Some((a, b)),
        Ordering::Greater => Some((b, a)),
        Ordering::Equal => None,
    }
}

/// The key of an unordered pair, identical for both orderings
///
/// Stored edges carry this key in a unique column.
pub fn pair_key<Id: Ord + Display>(a: Id, b: Id) -> String {
    if a <= b {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}

/// What has to be stored to connect two profiles
#[derive(Debug, PartialEq, Eq)]
pub enum Connect<Id> {
    /// The profiles are identical or already connected
    Nothing,
    /// The pair is new, stored in normalized order
    Insert(Id, Id),
}

/// Decide how `a` and `b` get connected, given the edges that are already stored.
///
/// `existing` may contain edges in either direction as well as unrelated edges.
pub fn connect<Id: Ord + Copy>(
    a: Id,
    b: Id,
    existing: impl IntoIterator<Item = (Id, Id)>,
) -> Connect<Id> {
    let Some(pair) = normalize_pair(a, b) else {
        return Connect::Nothing;
    };

    if existing
        .into_iter()
        .any(|(x, y)| normalize_pair(x, y) == Some(pair))
    {
        Connect::Nothing
    } else {
        Connect::Insert(pair.0, pair.1)
    }
}

/// Collect the neighbors of `profile` from a list of edges.
///
/// Edges that don't touch `profile` are ignored, so both directional lookups can
/// simply be chained. The result is de-duplicated and never contains `profile` itself.
pub fn neighbors<Id>(profile: Id, edges: impl IntoIterator<Item = (Id, Id)>) -> Vec<Id>
where
    Id: Copy + Eq + Hash,
{
    let mut seen = HashSet::new();
    edges
        .into_iter()
        .filter_map(|(a, b)| {
            if a == profile {
                Some(b)
            } else if b == profile {
                Some(a)
            } else {
                None
            }
        })
        .filter(|other| *other != profile && seen.insert(*other))
        .collect()
}

/// All profiles that are neither `profile` nor one of its neighbors.
///
/// The order of `all_profiles` is kept.
pub fn suggestions<Id>(
    profile: Id,
    all_profiles: impl IntoIterator<Item = Id>,
    neighbors: &[Id],
) -> Vec<Id>
where
    Id: Copy + Eq + Hash,
{
    let excluded = closed_neighborhood(profile, neighbors);
    all_profiles
        .into_iter()
        .filter(|p| !excluded.contains(p))
        .collect()
}

/// The neighbors of `profile` together with `profile`
pub fn closed_neighborhood<Id>(profile: Id, neighbors: &[Id]) -> HashSet<Id>
where
    Id: Copy + Eq + Hash,
{
    let mut set: HashSet<Id> = neighbors.iter().copied().collect();
    set.insert(profile);
    set
}

/// An entry of the news feed
pub trait FeedItem {
    /// Unique, monotonically increasing id of the item
    fn feed_id(&self) -> i64;

    /// The point in time the item was created
    fn feed_timestamp(&self) -> NaiveDateTime;
}

/// Ordering of the feed: newest first, later inserts first on equal timestamps
pub fn feed_order<T: FeedItem>(a: &T, b: &T) -> Ordering {
    b.feed_timestamp()
        .cmp(&a.feed_timestamp())
        .then_with(|| b.feed_id().cmp(&a.feed_id()))
}

/// Merge the posts of all members of a closed neighborhood into one feed.
///
/// Every source is sorted with [feed_order] before merging, so callers don't have
/// to rely on the order the database returned.
pub fn merge_feed<T: FeedItem>(sources: impl IntoIterator<Item = Vec<T>>) -> Vec<T> {
    sources
        .into_iter()
        .map(|mut source| {
            source.sort_by(feed_order);
            source
        })
        .kmerge_by(|a, b| feed_order(a, b) == Ordering::Less)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Post {
        id: i64,
        author: u32,
        at: NaiveDateTime,
    }

    impl FeedItem for Post {
        fn feed_id(&self) -> i64 {
            self.id
        }

        fn feed_timestamp(&self) -> NaiveDateTime {
            self.at
        }
    }

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 21)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn post(id: i64, author: u32, hour: u32) -> Post {
        Post {
            id,
            author,
            at: at(hour),
        }
    }

    fn add_edge(edges: &mut Vec<(u32, u32)>, a: u32, b: u32) {
        if let Connect::Insert(x, y) = connect(a, b, edges.iter().copied()) {
            edges.push((x, y));
        }
    }

    #[test]
    fn normalize_orders_and_rejects_self() {
        assert_eq!(normalize_pair(3, 1), Some((1, 3)));
        assert_eq!(normalize_pair(1, 3), Some((1, 3)));
        assert_eq!(normalize_pair(2, 2), None);
    }

    #[test]
    fn adding_both_orderings_stores_one_edge() {
        let mut edges = vec![];
        add_edge(&mut edges, 2, 1);
        add_edge(&mut edges, 1, 2);
        add_edge(&mut edges, 1, 1);
        add_edge(&mut edges, 3, 1);
        add_edge(&mut edges, 1, 3);
        assert_eq!(edges, vec![(1, 2), (1, 3)]);
    }

    #[test]
    fn connect_detects_edges_stored_in_reverse() {
        assert_eq!(connect(1, 2, vec![(2, 1)]), Connect::Nothing);
        assert_eq!(connect(2, 1, vec![(1, 2)]), Connect::Nothing);
        assert_eq!(connect(2, 1, vec![(1, 3), (3, 2)]), Connect::Insert(1, 2));
        assert_eq!(connect(4, 4, Vec::new()), Connect::Nothing);
    }

    #[test]
    fn pair_key_ignores_order() {
        assert_eq!(pair_key(7, 3), "3:7");
        assert_eq!(pair_key(3, 7), pair_key(7, 3));
        assert_ne!(pair_key(3, 7), pair_key(3, 8));
    }

    #[test]
    fn neighbors_union_both_directions() {
        let edges = vec![(1, 2), (3, 1), (2, 3), (1, 4), (4, 1)];
        assert_eq!(neighbors(1, edges), vec![2, 3, 4]);
    }

    #[test]
    fn profile_is_never_its_own_neighbor() {
        let edges = vec![(1, 1), (1, 2)];
        assert_eq!(neighbors(1, edges), vec![2]);
        assert!(neighbors(5, vec![(1, 2)]).is_empty());
    }

    #[test]
    fn suggestions_partition_all_profiles() {
        let all = vec![1, 2, 3, 4, 5, 6];
        let edges = vec![(1, 2), (4, 1), (3, 5)];

        let n = neighbors(1, edges);
        let s = suggestions(1, all.clone(), &n);

        assert_eq!(s, vec![3, 5, 6]);
        assert!(!s.contains(&1));
        assert!(s.iter().all(|p| !n.contains(p)));

        let mut union: Vec<_> = n.iter().chain(s.iter()).copied().collect();
        union.push(1);
        union.sort();
        assert_eq!(union, all);
    }

    #[test]
    fn lonely_profile_gets_everyone_else_suggested() {
        assert_eq!(suggestions(2, vec![1, 2, 3], &[]), vec![1, 3]);
    }

    #[test]
    fn feed_is_newest_first_across_sources() {
        let mine = vec![post(1, 1, 8), post(4, 1, 12)];
        let friend = vec![post(2, 2, 9), post(3, 2, 15)];

        let feed = merge_feed(vec![mine, friend]);
        let ids: Vec<_> = feed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 4, 2, 1]);
    }

    #[test]
    fn equal_timestamps_are_ordered_by_id() {
        let a = vec![post(5, 1, 10), post(7, 1, 10)];
        let b = vec![post(6, 2, 10)];

        let ids: Vec<_> = merge_feed(vec![a, b]).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![7, 6, 5]);
    }

    #[test]
    fn feed_without_neighbors_contains_own_posts() {
        let n: Vec<u32> = neighbors(1, vec![(2, 3)]);
        let members = closed_neighborhood(1, &n);
        assert_eq!(members.len(), 1);

        let all_posts = vec![post(1, 1, 8), post(2, 2, 9), post(3, 1, 10)];
        let sources = members.iter().map(|m| {
            all_posts
                .iter()
                .filter(|p| p.author == *m)
                .cloned()
                .collect::<Vec<_>>()
        });

        let ids: Vec<_> = merge_feed(sources).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
