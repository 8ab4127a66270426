//! Property tests for preprocessing and split masks.

use proptest::prelude::*;

use fraud_gnn::masks::{sample_mask, SplitIndices, SplitMasks};
use fraud_gnn::preprocess::{normalize_adjacency, normalize_features, AdjacencyNorm, NormScheme};
use fraud_gnn::sparse::CooMatrix;

const N: usize = 12;

fn arb_edges() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..N, 0..N), 0..40)
}

fn symmetric(edges: &[(usize, usize)]) -> CooMatrix {
    CooMatrix::from_triplets(
        (N, N),
        edges
            .iter()
            .filter(|(u, v)| u != v)
            .flat_map(|&(u, v)| [(u, v, 1.0), (v, u, 1.0)]),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn disjoint_indices_give_disjoint_masks(assignment in prop::collection::vec(0u8..4, N)) {
        // 0: train, 1: val, 2: test, 3: unassigned
        let pick = |k: u8| -> Vec<usize> {
            assignment.iter().enumerate().filter(|&(_, &a)| a == k).map(|(i, _)| i).collect()
        };
        let indices = SplitIndices { train: pick(0), val: pick(1), test: pick(2) };
        prop_assume!(!indices.train.is_empty() && !indices.val.is_empty() && !indices.test.is_empty());

        let masks = SplitMasks::build(&indices, N).unwrap();
        for node in 0..N {
            let hits = [masks.train[node], masks.val[node], masks.test[node]]
                .iter()
                .filter(|&&m| m)
                .count();
            prop_assert!(hits <= 1);
            prop_assert_eq!(hits == 1, assignment[node] < 3);
        }
    }

    #[test]
    fn masks_are_order_independent(mut indices in prop::collection::vec(0..N, 0..30)) {
        let forward = sample_mask(&indices, N).unwrap();
        indices.reverse();
        prop_assert_eq!(forward, sample_mask(&indices, N).unwrap());
    }

    #[test]
    fn row_normalized_adjacency_rows_are_bounded(edges in arb_edges(), self_loops in any::<bool>()) {
        let norm = AdjacencyNorm { scheme: NormScheme::Row, self_loops };
        let adj = normalize_adjacency(&symmetric(&edges), N, &norm).unwrap();
        let has_edge = |i: usize| edges.iter().any(|&(u, v)| u != v && (u == i || v == i));
        for (i, sum) in adj.row_sums().into_iter().enumerate() {
            prop_assert!(sum.is_finite());
            prop_assert!(sum <= 1.0 + 1e-6);
            if !self_loops && !has_edge(i) {
                prop_assert_eq!(sum, 0.0);
            }
        }
        prop_assert!(adj.coords().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn symmetric_adjacency_is_finite(edges in arb_edges(), self_loops in any::<bool>()) {
        let norm = AdjacencyNorm { scheme: NormScheme::Symmetric, self_loops };
        let adj = normalize_adjacency(&symmetric(&edges), N, &norm).unwrap();
        prop_assert!(adj.values().iter().all(|v| v.is_finite() && *v > 0.0));
        prop_assert_eq!(adj.shape(), (N, N));
    }

    #[test]
    fn feature_rows_sum_to_one(
        rows in 1usize..10,
        cols in 1usize..10,
        entries in prop::collection::vec((0usize..10, 0usize..10, 0.0f32..5.0), 0..50),
    ) {
        let raw = CooMatrix::from_triplets(
            (rows, cols),
            entries.into_iter().filter(|&(r, c, _)| r < rows && c < cols),
        ).unwrap();
        let raw_sums = {
            let mut sums = vec![0.0f32; rows];
            for &(r, _, v) in raw.triplets() {
                sums[r] += v;
            }
            sums
        };
        let features = normalize_features(&raw, rows).unwrap();
        prop_assert_eq!(features.shape(), (rows, cols));
        for (r, sum) in features.row_sums().into_iter().enumerate() {
            if raw_sums[r] == 0.0 {
                prop_assert_eq!(sum, 0.0);
            } else {
                prop_assert!((sum - 1.0).abs() < 1e-6);
            }
        }
    }
}
