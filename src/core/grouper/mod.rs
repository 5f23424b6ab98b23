//! # Grouper Module
//!
//! Partitions fingerprinted photos into exact-duplicate groups.
//!
//! ## Rules
//! - Photos without a fingerprint never join a group
//! - A group holds every photo sharing one fingerprint, and at least two
//! - Photos with a unique fingerprint are dropped
//!
//! Groups come out in the order their fingerprint was first received, and
//! members in the order they were received. Because the scheduler delivers
//! results in completion order, call [`into_stable_order`] before showing
//! groups to a user.

use crate::core::fingerprint::{Fingerprint, FingerprintResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Photos that all share one fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// The shared fingerprint
    pub fingerprint: Fingerprint,
    /// Members, at least two
    pub photos: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Number of redundant copies (every member but one)
    pub fn duplicate_count(&self) -> usize {
        self.photos.len().saturating_sub(1)
    }

    /// Smallest member path, used as the stable sort key
    fn sort_key(&self) -> Option<&PathBuf> {
        self.photos.iter().min()
    }
}

/// Builds duplicate groups from fingerprint results
#[derive(Debug, Default)]
pub struct DuplicateGrouper;

impl DuplicateGrouper {
    pub fn new() -> Self {
        Self
    }

    /// Group results by identical fingerprint.
    pub fn group<I>(&self, results: I) -> Vec<DuplicateGroup>
    where
        I: IntoIterator<Item = FingerprintResult>,
    {
        let mut index: HashMap<Fingerprint, usize> = HashMap::new();
        let mut buckets: Vec<DuplicateGroup> = Vec::new();

        for result in results {
            let (path, fingerprint) = result.into_parts();
            let Some(fingerprint) = fingerprint else {
                continue;
            };

            match index.get(&fingerprint) {
                Some(&slot) => buckets[slot].photos.push(path),
                None => {
                    index.insert(fingerprint.clone(), buckets.len());
                    buckets.push(DuplicateGroup {
                        fingerprint,
                        photos: vec![path],
                    });
                }
            }
        }

        buckets.retain(|group| group.photos.len() > 1);
        buckets
    }
}

/// Reorder groups so the output no longer depends on completion order.
///
/// Members are sorted by path, and groups by their smallest member.
pub fn into_stable_order(mut groups: Vec<DuplicateGroup>) -> Vec<DuplicateGroup> {
    for group in &mut groups {
        group.photos.sort();
    }
    groups.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(path: &str, fingerprint: Option<&str>) -> FingerprintResult {
        FingerprintResult::new(PathBuf::from(path), fingerprint.map(Fingerprint::from))
    }

    #[test]
    fn empty_input_returns_no_groups() {
        let groups = DuplicateGrouper::new().group(Vec::new());
        assert!(groups.is_empty());
    }

    #[test]
    fn matching_fingerprints_form_a_group() {
        let groups = DuplicateGrouper::new().group(vec![
            result("/a.jpg", Some("x")),
            result("/b.jpg", Some("x")),
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].fingerprint, Fingerprint::from("x"));
        assert_eq!(
            groups[0].photos,
            vec![PathBuf::from("/a.jpg"), PathBuf::from("/b.jpg")]
        );
    }

    #[test]
    fn unique_fingerprints_are_dropped() {
        let groups = DuplicateGrouper::new().group(vec![
            result("/a.jpg", Some("x")),
            result("/b.jpg", Some("y")),
            result("/c.jpg", Some("x")),
        ]);

        assert_eq!(groups.len(), 1);
        assert!(!groups[0].photos.contains(&PathBuf::from("/b.jpg")));
    }

    #[test]
    fn unreadable_photos_never_group() {
        let groups = DuplicateGrouper::new().group(vec![
            result("/a.jpg", None),
            result("/b.jpg", None),
            result("/c.jpg", Some("x")),
        ]);

        assert!(groups.is_empty());
    }

    #[test]
    fn groups_follow_first_occurrence_order() {
        let groups = DuplicateGrouper::new().group(vec![
            result("/z1.jpg", Some("z")),
            result("/a1.jpg", Some("a")),
            result("/a2.jpg", Some("a")),
            result("/z2.jpg", Some("z")),
        ]);

        let fingerprints: Vec<_> = groups.iter().map(|g| g.fingerprint.as_str()).collect();
        assert_eq!(fingerprints, vec!["z", "a"]);
        assert_eq!(
            groups[0].photos,
            vec![PathBuf::from("/z1.jpg"), PathBuf::from("/z2.jpg")]
        );
    }

    #[test]
    fn every_group_has_two_members_sharing_one_fingerprint() {
        let input = vec![
            result("/1.jpg", Some("p")),
            result("/2.jpg", Some("q")),
            result("/3.jpg", Some("p")),
            result("/4.jpg", None),
            result("/5.jpg", Some("q")),
            result("/6.jpg", Some("p")),
            result("/7.jpg", Some("r")),
        ];
        let lookup: HashMap<PathBuf, Option<Fingerprint>> = input
            .iter()
            .map(|r| (r.path().to_path_buf(), r.fingerprint().cloned()))
            .collect();

        let groups = DuplicateGrouper::new().group(input);

        assert_eq!(groups.len(), 2);
        for group in &groups {
            assert!(group.photos.len() >= 2);
            for photo in &group.photos {
                assert_eq!(lookup[photo].as_ref(), Some(&group.fingerprint));
            }
        }
    }

    #[test]
    fn stable_order_ignores_arrival_order() {
        let forward = DuplicateGrouper::new().group(vec![
            result("/b2.jpg", Some("b")),
            result("/a2.jpg", Some("a")),
            result("/b1.jpg", Some("b")),
            result("/a1.jpg", Some("a")),
        ]);
        let reverse = DuplicateGrouper::new().group(vec![
            result("/a1.jpg", Some("a")),
            result("/b1.jpg", Some("b")),
            result("/a2.jpg", Some("a")),
            result("/b2.jpg", Some("b")),
        ]);

        assert_ne!(forward, reverse);
        assert_eq!(into_stable_order(forward.clone()), into_stable_order(reverse));

        let stable = into_stable_order(forward);
        assert_eq!(stable[0].photos[0], PathBuf::from("/a1.jpg"));
        assert_eq!(stable[1].photos[0], PathBuf::from("/b1.jpg"));
    }

    #[test]
    fn duplicate_count_excludes_one_member() {
        let groups = DuplicateGrouper::new().group(vec![
            result("/a.jpg", Some("x")),
            result("/b.jpg", Some("x")),
            result("/c.jpg", Some("x")),
        ]);

        assert_eq!(groups[0].duplicate_count(), 2);
    }
}
