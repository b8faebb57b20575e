//! Aligns a sent-side packet log with its received-side counterpart by
//! sequence number, deriving per-unit latency and per-bucket loss rate.

use std::collections::{BTreeMap, HashMap, HashSet};

use bwe_report_model::{BUCKET_MS, Reducer, SequencedRecord, Series};

/// Result of joining a sent log with a received log.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceJoin {
    /// `(seq, received_time - sent_time)` for every unit seen on both sides,
    /// in sent order. Lost units are absent here, they are loss, not outliers.
    pub latency_by_seq: Vec<(u64, f64)>,
    /// Mean one-way delay per 1-second bucket of rebased sent time.
    pub latency: Series,
    /// `lost / sent` per 1-second bucket of rebased sent time, in `[0, 1]`.
    pub loss_rate: Series,
}

impl SequenceJoin {
    pub fn is_empty(&self) -> bool {
        self.loss_rate.is_empty()
    }
}

/// Joins the two logs on sequence number.
///
/// Duplicate sequence numbers are deduplicated keep-first on both sides: the
/// sequence number is the unit's identity, so a retransmission must neither
/// inflate the sent count nor pair the original send with a later arrival.
pub fn join_by_sequence(
    sent: &[SequencedRecord],
    received: &[SequencedRecord],
    basetime_ms: i64,
) -> SequenceJoin {
    let mut arrival: HashMap<u64, i64> = HashMap::with_capacity(received.len());
    for r in received {
        arrival.entry(r.seq).or_insert(r.time_ms);
    }

    let mut seen: HashSet<u64> = HashSet::with_capacity(sent.len());
    let mut latency_by_seq = Vec::new();
    let mut latency_samples = Vec::new();
    let mut buckets: BTreeMap<i64, (u64, u64)> = BTreeMap::new();

    for s in sent {
        if !seen.insert(s.seq) {
            continue;
        }
        let rebased = s.time_ms - basetime_ms;
        let bucket = rebased.div_euclid(BUCKET_MS) * BUCKET_MS;
        let (sent_count, lost_count) = buckets.entry(bucket).or_insert((0, 0));
        *sent_count += 1;

        match arrival.get(&s.seq) {
            Some(&received_time) => {
                let latency = (received_time - s.time_ms) as f64;
                latency_by_seq.push((s.seq, latency));
                latency_samples.push((rebased, latency));
            }
            None => *lost_count += 1,
        }
    }

    let loss_rate = Series::from_points(
        buckets
            .into_iter()
            .map(|(bucket, (sent_count, lost_count))| {
                (bucket, lost_count as f64 / sent_count as f64)
            })
            .collect(),
    );

    SequenceJoin {
        latency_by_seq,
        latency: Series::from_points(latency_samples).resample(Reducer::Mean),
        loss_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(pairs: &[(u64, i64)]) -> Vec<SequencedRecord> {
        pairs
            .iter()
            .map(|&(seq, t)| SequencedRecord::new(seq, t))
            .collect()
    }

    #[test]
    fn five_packet_scenario() {
        let sent = records(&[(1, 0), (2, 100), (3, 200), (4, 300), (5, 400)]);
        let received = records(&[(1, 50), (2, 160), (4, 320), (5, 460)]);

        let join = join_by_sequence(&sent, &received, 0);
        assert_eq!(
            join.latency_by_seq,
            vec![(1, 50.0), (2, 60.0), (4, 20.0), (5, 60.0)]
        );
        // All five sends fall in one bucket; one of them never arrived.
        assert_eq!(join.loss_rate.points(), &[(0, 0.2)]);
        assert_eq!(join.latency.points(), &[(0, 47.5)]);
    }

    #[test]
    fn matched_plus_lost_equals_sent_per_bucket() {
        let sent = records(&[
            (1, 0),
            (2, 500),
            (3, 900),
            (4, 1_100),
            (5, 1_600),
            (6, 2_200),
        ]);
        let received = records(&[(1, 30), (4, 1_150), (6, 2_230)]);

        let join = join_by_sequence(&sent, &received, 0);
        for &(bucket, rate) in join.loss_rate.points() {
            assert!((0.0..=1.0).contains(&rate), "bucket {bucket} rate {rate}");
        }

        // bucket 0: sent 3, lost 2; bucket 1000: sent 2, lost 1; bucket 2000: sent 1, lost 0
        assert_eq!(
            join.loss_rate.points(),
            &[(0, 2.0 / 3.0), (1_000, 0.5), (2_000, 0.0)]
        );
        let matched = join.latency_by_seq.len();
        assert_eq!(matched + 3, sent.len());
    }

    #[test]
    fn rebasing_buckets_by_sent_time() {
        let sent = records(&[(1, 10_000), (2, 10_400)]);
        let received = records(&[(1, 10_050)]);

        let join = join_by_sequence(&sent, &received, 10_000);
        assert_eq!(join.loss_rate.points(), &[(0, 0.5)]);
        assert_eq!(join.latency.points(), &[(0, 50.0)]);
    }

    #[test]
    fn duplicate_keys_keep_first() {
        let sent = records(&[(1, 0), (1, 700), (2, 100)]);
        let received = records(&[(1, 900), (1, 40), (2, 150)]);

        let join = join_by_sequence(&sent, &received, 0);
        // First arrival (t=900) pairs with the first send (t=0); the
        // retransmission at t=700 does not add a sent unit.
        assert_eq!(join.latency_by_seq, vec![(1, 900.0), (2, 50.0)]);
        assert_eq!(join.loss_rate.points(), &[(0, 0.0)]);
    }

    #[test]
    fn empty_inputs_produce_empty_join() {
        let join = join_by_sequence(&[], &[], 0);
        assert!(join.is_empty());
        assert!(join.latency_by_seq.is_empty());
    }
}
