use crate::engines::generation::genome::Genome;

/// Coefficients of the NEAT compatibility distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeatDistance {
    pub excess_coefficient: f64,
    pub disjoint_coefficient: f64,
    pub weight_coefficient: f64,
}

/// Gene alignment counts between two signatures
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Alignment {
    pub matching: usize,
    pub disjoint: usize,
    pub excess: usize,
    /// Sum of |w1 - w2| over matching genes where both sides expose a weight
    pub weight_difference: f64,
    pub weighted_matches: usize,
}

impl Default for NeatDistance {
    fn default() -> Self {
        Self {
            excess_coefficient: 1.0,
            disjoint_coefficient: 1.0,
            weight_coefficient: 0.0,
        }
    }
}

impl NeatDistance {
    pub fn new(c1: f64, c2: f64, c3: f64) -> Self {
        Self {
            excess_coefficient: c1,
            disjoint_coefficient: c2,
            weight_coefficient: c3,
        }
    }

    /// `c1 * excess / N + c2 * disjoint / N + c3 * mean weight difference`
    ///
    /// N is the length of the longer signature (1 when both are empty). Genes past the
    /// smaller of the two highest innovation numbers are excess, the remaining
    /// unmatched genes are disjoint.
    pub fn distance<G: Genome>(&self, g1: &G, g2: &G) -> f64 {
        let s1 = normalized(g1.innovation_signature());
        let s2 = normalized(g2.innovation_signature());
        let n = s1.len().max(s2.len()).max(1) as f64;

        let alignment = align(&s1, &s2, |id| {
            g1.innovation_weight(id).zip(g2.innovation_weight(id))
        });

        let mean_weight_difference = if alignment.weighted_matches == 0 {
            0.0
        } else {
            alignment.weight_difference / alignment.weighted_matches as f64
        };

        self.excess_coefficient * alignment.excess as f64 / n
            + self.disjoint_coefficient * alignment.disjoint as f64 / n
            + self.weight_coefficient * mean_weight_difference
    }
}

fn normalized(mut signature: Vec<i32>) -> Vec<i32> {
    signature.sort_unstable();
    signature.dedup();
    signature
}

/// Walk two ascending signatures in lock-step
pub fn align<F>(s1: &[i32], s2: &[i32], mut weights: F) -> Alignment
where
    F: FnMut(i32) -> Option<(f64, f64)>,
{
    let mut alignment = Alignment::default();
    let cutoff = match (s1.last(), s2.last()) {
        (Some(a), Some(b)) => *a.min(b),
        // Everything in a signature facing an empty one is excess
        _ => i32::MIN,
    };

    let unmatched = |id: i32, alignment: &mut Alignment| {
        if id > cutoff {
            alignment.excess += 1;
        } else {
            alignment.disjoint += 1;
        }
    };

    let (mut i, mut j) = (0, 0);
    while i < s1.len() && j < s2.len() {
        if s1[i] == s2[j] {
            alignment.matching += 1;
            if let Some((w1, w2)) = weights(s1[i]) {
                alignment.weight_difference += (w1 - w2).abs();
                alignment.weighted_matches += 1;
            }
            i += 1;
            j += 1;
        } else if s1[i] < s2[j] {
            unmatched(s1[i], &mut alignment);
            i += 1;
        } else {
            unmatched(s2[j], &mut alignment);
            j += 1;
        }
    }
    for &id in &s1[i..] {
        unmatched(id, &mut alignment);
    }
    for &id in &s2[j..] {
        unmatched(id, &mut alignment);
    }
    alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::network::NetworkGenome;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_alignment_counts() {
        let a = align(&[1, 2, 3, 5], &[1, 3, 4, 8, 9], |_| None);
        assert_eq!(a.matching, 2); // 1, 3
        assert_eq!(a.disjoint, 3); // 2, 4, 5
        assert_eq!(a.excess, 2); // 8, 9
    }

    #[test]
    fn test_empty_signatures() {
        let a = align(&[], &[], |_| None);
        assert_eq!(a, Alignment::default());
        let b = align(&[], &[4, 7], |_| None);
        assert_eq!(b.excess, 2);
        assert_eq!(b.disjoint, 0);
    }

    #[test]
    fn test_identical_genomes_have_zero_distance() {
        let genome = NetworkGenome::minimal(3, 2);
        let metric = NeatDistance::new(1.0, 1.0, 0.4);
        assert_eq!(metric.distance(&genome, &genome), 0.0);
    }

    #[test]
    fn test_weight_term_uses_matching_genes() {
        let a = NetworkGenome::minimal(1, 1);
        let mut b = a.clone();
        b.edges_mut()[0].weight += 2.0;
        let metric = NeatDistance::new(1.0, 1.0, 0.5);
        assert!((metric.distance(&a, &b) - 1.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_distance_is_symmetric(seed_a in 0u64..500, seed_b in 0u64..500, steps in 0usize..12) {
            let mut rng_a = StdRng::seed_from_u64(seed_a);
            let mut rng_b = StdRng::seed_from_u64(seed_b);
            let mut a = NetworkGenome::minimal(3, 2);
            let mut b = NetworkGenome::minimal(3, 2);
            for _ in 0..steps {
                a.mutate(2, &mut rng_a);
                b.mutate(2, &mut rng_b);
            }
            let metric = NeatDistance::new(1.0, 0.8, 0.3);
            let d_ab = metric.distance(&a, &b);
            let d_ba = metric.distance(&b, &a);
            prop_assert!((d_ab - d_ba).abs() < 1e-12);
            prop_assert_eq!(metric.distance(&a, &a), 0.0);
        }
    }
}
