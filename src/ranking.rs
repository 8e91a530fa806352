//! Mirror ranking
//!
//! Candidates are ordered by an explicit list of keys evaluated left to
//! right: language match, quality match, then either the source weight or a
//! group/server match. Every key is "higher is better" and the sort is
//! stable, so candidates that tie on every key keep their original order.

use std::cmp::Ordering;

use crate::models::{RankingPreferences, VideoDescriptor, WeightedVideo};

/// How a preference token is matched against a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseRule {
    /// Exact substring match
    Sensitive,
    /// Both sides lowercased before matching
    Insensitive,
}

impl CaseRule {
    fn matches(self, haystack: &str, needle: &str) -> bool {
        match self {
            CaseRule::Sensitive => haystack.contains(needle),
            CaseRule::Insensitive => haystack.to_lowercase().contains(&needle.to_lowercase()),
        }
    }
}

/// Value produced by one ranking key; larger ranks first
#[derive(Debug, Clone, Copy, PartialEq)]
enum RankKey {
    Flag(bool),
    Weight(f32),
}

impl RankKey {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (RankKey::Flag(a), RankKey::Flag(b)) => a.cmp(b),
            (RankKey::Weight(a), RankKey::Weight(b)) => a.total_cmp(b),
            // a weighted candidate outranks one that only had a group check
            (RankKey::Weight(_), RankKey::Flag(_)) => Ordering::Greater,
            (RankKey::Flag(_), RankKey::Weight(_)) => Ordering::Less,
        }
    }
}

type KeyFn = fn(&MirrorRanker, &WeightedVideo, &RankingPreferences) -> RankKey;

/// Deterministic multi-key ordering of resolved mirrors
#[derive(Debug, Clone, Copy)]
pub struct MirrorRanker {
    /// Case rule for the language / sub-dub token
    pub language_case: CaseRule,
    /// Case rule for the group / server token
    pub group_case: CaseRule,
}

impl MirrorRanker {
    /// Keys in precedence order, primary first
    const KEYS: [KeyFn; 3] = [
        MirrorRanker::language_key,
        MirrorRanker::quality_key,
        MirrorRanker::group_key,
    ];

    pub fn new(language_case: CaseRule, group_case: CaseRule) -> Self {
        Self {
            language_case,
            group_case,
        }
    }

    /// Orders candidates best first
    pub fn rank(
        &self,
        candidates: Vec<WeightedVideo>,
        preferences: &RankingPreferences,
    ) -> Vec<VideoDescriptor> {
        let mut keyed: Vec<(Vec<RankKey>, WeightedVideo)> = candidates
            .into_iter()
            .map(|candidate| {
                let keys = Self::KEYS
                    .iter()
                    .map(|key| key(self, &candidate, preferences))
                    .collect();
                (keys, candidate)
            })
            .collect();

        // stable sort, compared descending
        keyed.sort_by(|(a, _), (b, _)| {
            a.iter()
                .zip(b.iter())
                .map(|(ka, kb)| kb.compare(ka))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        keyed.into_iter().map(|(_, c)| c.video).collect()
    }

    fn language_key(&self, candidate: &WeightedVideo, prefs: &RankingPreferences) -> RankKey {
        RankKey::Flag(
            self.language_case
                .matches(&candidate.video.label, &prefs.preferred_language),
        )
    }

    fn quality_key(&self, candidate: &WeightedVideo, prefs: &RankingPreferences) -> RankKey {
        RankKey::Flag(candidate.video.label.contains(&prefs.preferred_quality))
    }

    fn group_key(&self, candidate: &WeightedVideo, prefs: &RankingPreferences) -> RankKey {
        match candidate.weight {
            Some(weight) if !prefs.has_group_override() => RankKey::Weight(weight),
            _ => RankKey::Flag(
                self.group_case
                    .matches(&candidate.video.label, &prefs.preferred_group),
            ),
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Ranking is a permutation of its input and is deterministic.
        #[test]
        fn property_rank_is_deterministic_permutation(
            labels in prop::collection::vec("(Sub|Dub) (1080|720|480)p Group[A-C]", 0..10),
            weights in prop::collection::vec(0u8..5, 10),
        ) {
            let candidates: Vec<WeightedVideo> = labels
                .iter()
                .enumerate()
                .map(|(i, l)| WeightedVideo::weighted(
                    VideoDescriptor::new(format!("u{i}"), l.clone(), ""),
                    weights[i] as f32,
                ))
                .collect();
            let prefs = RankingPreferences {
                preferred_quality: "1080".into(),
                preferred_language: "sub".into(),
                preferred_group: "site_default".into(),
            };
            let ranker = MirrorRanker::new(CaseRule::Insensitive, CaseRule::Sensitive);

            let first = ranker.rank(candidates.clone(), &prefs);
            let second = ranker.rank(candidates.clone(), &prefs);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), candidates.len());

            let mut got: Vec<_> = first.iter().map(|v| v.playback_url.clone()).collect();
            let mut want: Vec<_> = candidates.iter().map(|c| c.video.playback_url.clone()).collect();
            got.sort();
            want.sort();
            prop_assert_eq!(got, want);

            // every sub-labelled mirror precedes every dub-labelled one
            let first_dub = first.iter().position(|v| v.label.starts_with("Dub"));
            if let Some(idx) = first_dub {
                prop_assert!(first[idx..].iter().all(|v| v.label.starts_with("Dub")));
            }
        }
    }
}
