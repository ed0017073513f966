//! Construction statistics, grouped by bucket size.

#[derive(Default, Clone, serde::Serialize, Debug)]
struct Row {
    buckets: usize,
    elements: usize,
    displacement_sum: u64,
    displacement_max: u32,
}

impl Row {
    fn add(&mut self, bucket_len: usize, displacement: u32) {
        self.buckets += 1;
        self.elements += bucket_len;
        self.displacement_sum += displacement as u64;
        self.displacement_max = self.displacement_max.max(displacement);
    }
}

#[derive(Default, Clone, serde::Serialize, Debug)]
pub struct BucketStats {
    by_bucket_len: Vec<Row>,
    bins_claimed: usize,
    num_bins: usize,
}

impl BucketStats {
    pub fn new(num_bins: usize) -> Self {
        Self {
            by_bucket_len: Vec::new(),
            bins_claimed: 0,
            num_bins,
        }
    }

    /// Record a bucket of `bucket_len` keys placed with `displacement`.
    /// Empty buckets are recorded with displacement 0.
    pub fn add(&mut self, bucket_len: usize, displacement: u32) {
        if self.by_bucket_len.len() <= bucket_len {
            self.by_bucket_len.resize(bucket_len + 1, Row::default());
        }
        self.by_bucket_len[bucket_len].add(bucket_len, displacement);
    }

    pub(crate) fn set_bins_claimed(&mut self, bins_claimed: usize) {
        self.bins_claimed = bins_claimed;
    }

    /// Number of distinct bins claimed during construction.
    pub fn bins_claimed(&self) -> usize {
        self.bins_claimed
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn buckets(&self) -> usize {
        self.by_bucket_len.iter().map(|r| r.buckets).sum()
    }

    pub fn empty_buckets(&self) -> usize {
        self.by_bucket_len.first().map_or(0, |r| r.buckets)
    }

    pub fn keys(&self) -> usize {
        self.by_bucket_len.iter().map(|r| r.elements).sum()
    }

    /// Number of buckets holding exactly `len` keys.
    pub fn buckets_of_len(&self, len: usize) -> usize {
        self.by_bucket_len.get(len).map_or(0, |r| r.buckets)
    }

    pub fn max_displacement(&self) -> u32 {
        self.by_bucket_len
            .iter()
            .map(|r| r.displacement_max)
            .max()
            .unwrap_or(0)
    }

    /// Mean displacement over non-empty buckets.
    pub fn mean_displacement(&self) -> f64 {
        let (sum, cnt) = self
            .by_bucket_len
            .iter()
            .skip(1)
            .fold((0u64, 0usize), |(s, c), r| (s + r.displacement_sum, c + r.buckets));
        if cnt == 0 {
            0.0
        } else {
            sum as f64 / cnt as f64
        }
    }

    pub fn print(&self) {
        eprintln!();
        let b_total = self.buckets();
        let n = self.keys();

        eprintln!(
            "{:>4}  {:>11} {:>7} {:>6} {:>6} {:>6} {:>10} {:>10}",
            "sz", "cnt", "bucket%", "cuml%", "elem%", "cuml%", "avg d", "max d"
        );
        let mut bucket_cuml = 0;
        let mut elem_cuml = 0;
        for (len, row) in self.by_bucket_len.iter().enumerate().rev() {
            if row.buckets == 0 {
                continue;
            }
            bucket_cuml += row.buckets;
            elem_cuml += row.elements;
            eprintln!(
                "{:>4}: {:>11} {:>7.2} {:>6.2} {:>6.2} {:>6.2} {:>10.1} {:>10}",
                len,
                row.buckets,
                row.buckets as f32 / b_total as f32 * 100.,
                bucket_cuml as f32 / b_total as f32 * 100.,
                row.elements as f32 / n.max(1) as f32 * 100.,
                elem_cuml as f32 / n.max(1) as f32 * 100.,
                row.displacement_sum as f32 / row.buckets as f32,
                row.displacement_max,
            );
        }
        eprintln!(
            "{:>4}: {:>11} {:>7.2} {:>6.2} {:>6.2} {:>6.2} {:>10.1} {:>10}",
            "",
            b_total,
            100.,
            100.,
            100.,
            100.,
            self.mean_displacement(),
            self.max_displacement(),
        );
        eprintln!(
            "bins: {} claimed of {} ({:.2}% load)",
            self.bins_claimed,
            self.num_bins,
            self.bins_claimed as f64 / self.num_bins.max(1) as f64 * 100.
        );
        eprintln!();
    }
}
