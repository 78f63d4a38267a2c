//! List transforms applied by pipeline steps.
//!
//! All transforms take their input by slice and return a new list. Random
//! ones take the generator explicitly so a seeded run is reproducible.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::collections::{HashSet, VecDeque};
use tracing::warn;

use crate::catalog::{Track, NUMERIC_ATTRS};

pub fn slice(tracks: &[Track], amount: usize) -> Vec<Track> {
    tracks.iter().take(amount).cloned().collect()
}

/// `amount` distinct elements chosen uniformly, or everything if there are
/// not more than `amount`.
pub fn sample<R: Rng + ?Sized>(tracks: &[Track], amount: usize, rng: &mut R) -> Vec<Track> {
    if tracks.len() <= amount {
        return tracks.to_vec();
    }
    rand::seq::index::sample(rng, tracks.len(), amount)
        .into_iter()
        .map(|i| tracks[i].clone())
        .collect()
}

pub fn mix<R: Rng + ?Sized>(mut tracks: Vec<Track>, rng: &mut R) -> Vec<Track> {
    tracks.shuffle(rng);
    tracks
}

/// First occurrence of every identity key, in order.
pub fn dedup(tracks: &[Track]) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .iter()
        .filter(|t| seen.insert(t.identity_key()))
        .cloned()
        .collect()
}

pub fn filter_exclude(tracks: &[Track], exclude: &[Track]) -> Vec<Track> {
    let banned: HashSet<&str> = exclude.iter().map(Track::identity_key).collect();
    tracks
        .iter()
        .filter(|t| !banned.contains(t.identity_key()))
        .cloned()
        .collect()
}

/// Artist ids banned by a blacklist. Artist-shaped entries (a single artist
/// equal to the entry itself) also ban their own id.
pub fn banned_artist_ids(blacklist: &[Track]) -> HashSet<&str> {
    let mut banned = HashSet::new();
    for entry in blacklist {
        banned.extend(entry.artist_ids());
        if entry.artists.len() == 1 && entry.artists[0].id == entry.id {
            banned.insert(entry.id.as_str());
        }
    }
    banned
}

pub fn filter_artist(tracks: &[Track], blacklist: &[Track]) -> Vec<Track> {
    let banned = banned_artist_ids(blacklist);
    tracks
        .iter()
        .filter(|t| !t.artist_ids().any(|id| banned.contains(id)))
        .cloned()
        .collect()
}

/// Interleave `pool` into `base`: after each chunk of roughly `every` base
/// tracks, one pooled track, as long as base tracks remain after the chunk.
pub fn inject<R: Rng + ?Sized>(
    base: &[Track],
    pool: &[Track],
    every: usize,
    variance: usize,
    rng: &mut R,
) -> Vec<Track> {
    let mut pool: VecDeque<Track> = {
        let mut shuffled = pool.to_vec();
        shuffled.shuffle(rng);
        shuffled.into()
    };

    let every = every as i64;
    let variance = variance as i64;
    let mut result = Vec::with_capacity(base.len() + pool.len());
    let mut idx = 0;

    while idx < base.len() {
        let chunk = (every + rng.random_range(-variance..=variance)).max(1) as usize;
        let end = (idx + chunk).min(base.len());
        result.extend_from_slice(&base[idx..end]);
        idx += chunk;

        if idx < base.len() {
            if let Some(extra) = pool.pop_front() {
                result.push(extra);
            }
        }
    }

    result
}

fn shares_artist(a: &Track, b: &Track) -> bool {
    a.artist_ids().any(|id| b.artist_ids().any(|other| other == id))
}

/// Best-effort reordering so no two tracks within `min_distance` positions
/// share an artist. Tracks that cannot be placed end up at the tail.
pub fn artist_separation<R: Rng + ?Sized>(
    tracks: &[Track],
    min_distance: usize,
    rng: &mut R,
) -> Vec<Track> {
    let mut pool: VecDeque<Track> = {
        let mut shuffled = tracks.to_vec();
        shuffled.shuffle(rng);
        shuffled.into()
    };
    let mut placed: Vec<Track> = Vec::with_capacity(tracks.len());
    let mut postponed: VecDeque<Track> = VecDeque::new();

    while let Some(track) = pool.pop_front() {
        let window = &placed[placed.len().saturating_sub(min_distance)..];
        if window.iter().any(|p| shares_artist(&track, p)) {
            postponed.push_back(track);
            continue;
        }
        placed.push(track);
        if let Some(retry) = postponed.pop_front() {
            pool.push_front(retry);
        }
    }

    placed.extend(postponed);
    placed
}

/// Stable sort on a numeric attribute; missing attributes sort as 0.
pub fn sort(tracks: &[Track], by: &str, reverse: bool) -> Vec<Track> {
    if !Track::is_numeric_attr(by) {
        warn!(
            "Unknown sort attribute '{}', every track reads as 0 (known: {})",
            by,
            NUMERIC_ATTRS.join(", ")
        );
    }
    let mut sorted = tracks.to_vec();
    sorted.sort_by(|a, b| {
        let ord = a.numeric_attr(by).total_cmp(&b.numeric_attr(by));
        if reverse {
            ord.reverse()
        } else {
            ord
        }
    });
    sorted
}

/// Sort by `by`, then let every element drift up to `factor` positions from
/// its rank.
pub fn weighted_shuffle<R: Rng + ?Sized>(
    tracks: &[Track],
    by: &str,
    factor: f64,
    reverse: bool,
    rng: &mut R,
) -> Vec<Track> {
    let ranked = sort(tracks, by, reverse);
    let factor = factor.abs();
    let jitter = Uniform::new_inclusive(-factor, factor).ok();

    let mut keyed: Vec<(f64, Track)> = ranked
        .into_iter()
        .enumerate()
        .map(|(rank, track)| {
            let drift = jitter.as_ref().map(|j| j.sample(&mut *rng)).unwrap_or(0.0);
            (rank as f64 + drift, track)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, track)| track).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ids, track};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn numbered(prefix: &str, n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| {
                let id = format!("{}{}", prefix, i);
                let artist = format!("artist-{}", id);
                track(&id, &[artist.as_str()])
            })
            .collect()
    }

    fn sorted_ids(tracks: &[Track]) -> Vec<String> {
        let mut ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_slice() {
        let tracks = numbered("t", 5);
        assert_eq!(ids(&slice(&tracks, 2)), vec!["t0", "t1"]);
        assert_eq!(slice(&tracks, 10).len(), 5);
    }

    #[test]
    fn test_sample_short_input_is_unchanged() {
        let tracks = numbered("t", 3);
        assert_eq!(sample(&tracks, 5, &mut rng()), tracks);
    }

    #[test]
    fn test_sample_picks_distinct_members() {
        let tracks = numbered("t", 10);
        let picked = sample(&tracks, 5, &mut rng());

        assert_eq!(picked.len(), 5);
        assert_eq!(dedup(&picked).len(), 5);
        assert!(picked.iter().all(|t| tracks.contains(t)));
    }

    #[test]
    fn test_mix_keeps_multiset() {
        let tracks = numbered("t", 20);
        let mixed = mix(tracks.clone(), &mut rng());
        assert_eq!(sorted_ids(&mixed), sorted_ids(&tracks));
    }

    #[test]
    fn test_dedup_is_idempotent_and_unique() {
        let mut tracks = numbered("t", 4);
        tracks.push(tracks[1].clone());
        tracks.insert(0, tracks[3].clone());

        let once = dedup(&tracks);
        let twice = dedup(&once);

        assert_eq!(once, twice);
        assert!(once.len() <= tracks.len());
        assert_eq!(ids(&once), vec!["t3", "t0", "t1", "t2"]);
    }

    #[test]
    fn test_dedup_uses_id_without_uri() {
        let mut a = Track::stub("x");
        a.uri = None;
        let b = a.clone();
        assert_eq!(dedup(&[a, b]).len(), 1);
    }

    #[test]
    fn test_filter_exclude() {
        let tracks = numbered("t", 4);
        let exclude = vec![tracks[1].clone(), tracks[3].clone()];
        assert_eq!(ids(&filter_exclude(&tracks, &exclude)), vec!["t0", "t2"]);
    }

    #[test]
    fn test_filter_artist_with_track_and_artist_entries() {
        let tracks = vec![
            track("t1", &["a1"]),
            track("t2", &["a2", "a9"]),
            track("t3", &["a3"]),
            track("t4", &["a4"]),
        ];
        let mut artist_entry = track("a3", &["a3"]);
        artist_entry.uri = None;
        let blacklist = vec![track("b1", &["a9"]), artist_entry];

        assert_eq!(ids(&filter_artist(&tracks, &blacklist)), vec!["t1", "t4"]);
    }

    #[test]
    fn test_inject_every_ten_without_variance() {
        let base = numbered("b", 25);
        let pool = numbered("i", 3);

        let result = inject(&base, &pool, 10, 0, &mut rng());

        // Injection happens only while base tracks remain after the chunk.
        assert_eq!(result.len(), 27);
        assert!(result[10].id.starts_with('i'));
        assert!(result[21].id.starts_with('i'));
        let injected = result.iter().filter(|t| t.id.starts_with('i')).count();
        assert_eq!(injected, 2);
        let base_order: Vec<&str> = result
            .iter()
            .filter(|t| t.id.starts_with('b'))
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(base_order, ids(&base));
    }

    #[test]
    fn test_inject_stops_when_pool_is_exhausted() {
        let base = numbered("b", 30);
        let pool = numbered("i", 1);

        let result = inject(&base, &pool, 5, 0, &mut rng());

        assert_eq!(result.len(), 31);
        assert!(result[5].id.starts_with('i'));
    }

    #[test]
    fn test_inject_with_variance_keeps_every_base_track() {
        let base = numbered("b", 40);
        let pool = numbered("i", 10);

        let result = inject(&base, &pool, 2, 5, &mut rng());

        let base_count = result.iter().filter(|t| t.id.starts_with('b')).count();
        assert_eq!(base_count, 40);
        assert!(!result.last().unwrap().id.starts_with('i'));
    }

    fn shuffled(tracks: &[Track]) -> Vec<Track> {
        let mut expected = tracks.to_vec();
        expected.shuffle(&mut rng());
        expected
    }

    #[test]
    fn test_artist_separation_unique_artists_never_postpones() {
        let tracks = numbered("t", 12);
        let result = artist_separation(&tracks, 3, &mut rng());
        assert_eq!(result, shuffled(&tracks));
    }

    #[test]
    fn test_artist_separation_single_artist_defers_to_tail() {
        let tracks: Vec<Track> = (0..6).map(|i| track(&format!("t{}", i), &["same"])).collect();

        let result = artist_separation(&tracks, 3, &mut rng());

        // First placed, every other one postponed and appended in order.
        assert_eq!(result, shuffled(&tracks));
    }

    #[test]
    fn test_artist_separation_zero_distance_is_plain_shuffle() {
        let tracks: Vec<Track> = (0..6).map(|i| track(&format!("t{}", i), &["same"])).collect();
        assert_eq!(artist_separation(&tracks, 0, &mut rng()), shuffled(&tracks));
    }

    #[test]
    fn test_artist_separation_keeps_multiset() {
        let mut tracks = Vec::new();
        for artist in ["a", "b", "c", "d"] {
            for n in 0..3 {
                tracks.push(track(&format!("{}{}", artist, n), &[artist]));
            }
        }

        let result = artist_separation(&tracks, 1, &mut rng());

        assert_eq!(sorted_ids(&result), sorted_ids(&tracks));
    }

    #[test]
    fn test_artist_separation_requeues_after_placement() {
        let x1 = track("x1", &["x"]);
        let x2 = track("x2", &["x"]);
        let y = track("y", &["y"]);
        let tracks = vec![x1, x2, y];

        let result = artist_separation(&tracks, 1, &mut rng());

        assert_eq!(result.len(), 3);
        // With one y available the two x tracks can always be kept apart,
        // unless the shuffle put y first.
        let order = shuffled(&tracks);
        if order[0].id != "y" {
            assert_eq!(result[1].id, "y");
        }
    }

    #[test]
    fn test_sort_missing_attribute_is_zero() {
        let mut a = track("a", &[]);
        a.popularity = Some(10);
        let b = track("b", &[]);
        let mut c = track("c", &[]);
        c.popularity = Some(50);

        let tracks = vec![a, b, c];
        assert_eq!(ids(&sort(&tracks, "popularity", true)), vec!["c", "a", "b"]);
        assert_eq!(ids(&sort(&tracks, "popularity", false)), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let tracks = numbered("t", 5);
        assert_eq!(sort(&tracks, "energy", true), tracks);
    }

    #[test]
    fn test_sort_unknown_attribute_keeps_order() {
        let mut tracks = numbered("t", 4);
        tracks[2].popularity = Some(90);
        assert_eq!(sort(&tracks, "danceability", true), tracks);
        assert_eq!(
            weighted_shuffle(&tracks, "danceability", 0.0, true, &mut rng()),
            tracks
        );
    }

    #[test]
    fn test_weighted_shuffle_zero_factor_is_sorted_order() {
        let tracks: Vec<Track> = (0..10)
            .map(|i| {
                let mut t = track(&format!("t{}", i), &[]);
                t.popularity = Some((i * 7 % 10) as u32);
                t
            })
            .collect();

        let shuffled = weighted_shuffle(&tracks, "popularity", 0.0, true, &mut rng());

        assert_eq!(shuffled, sort(&tracks, "popularity", true));
    }

    #[test]
    fn test_weighted_shuffle_preserves_multiset() {
        let tracks = numbered("t", 30);
        for factor in [0.0, 1.0, 50.0] {
            let shuffled = weighted_shuffle(&tracks, "popularity", factor, true, &mut rng());
            assert_eq!(sorted_ids(&shuffled), sorted_ids(&tracks));
        }
    }
}
