use approx::assert_abs_diff_eq;
use ndarray::{array, Array, Array2, ArrayView1};
use oorandom::Rand64;

use ghtree::{Error, Metric, PivotStrategy, PivotTree, PivotTreeBuilder, PruningRule};

fn uniform(rows: usize, cols: usize, seed: u128) -> Array2<f64> {
    let mut rng = Rand64::new(seed);
    Array::from_shape_simple_fn((rows, cols), || rng.rand_float() * 20. - 10.)
}

/// Two far-apart clusters of `half` points each.
fn clusters(half: usize, seed: u128) -> Array2<f64> {
    let mut rng = Rand64::new(seed);
    Array::from_shape_fn((2 * half, 2), |(ii, _)| {
        let offset = if ii < half { 0. } else { 1000. };
        offset + rng.rand_float() * 10.
    })
}

/// Distances of the `k` nearest points, computed independently of the tree.
fn brute_force(data: &Array2<f64>, query: ArrayView1<'_, f64>, k: usize, metric: Metric) -> Vec<f64> {
    let mut dists: Vec<f64> = data
        .outer_iter()
        .map(|row| metric.try_distance(query, row).unwrap())
        .collect();
    dists.sort_by(|a, b| a.partial_cmp(b).unwrap());
    dists.truncate(k);
    dists
}

fn builders() -> Vec<PivotTreeBuilder> {
    let mut out = Vec::new();
    for &strategy in &[PivotStrategy::Random, PivotStrategy::FarthestFirst] {
        for &pruning in &[PruningRule::RangeTable, PruningRule::BinaryRadius] {
            for &reuse in &[false, true] {
                out.push(
                    PivotTreeBuilder::new()
                        .pivot_strategy(strategy)
                        .pruning(pruning)
                        .reuse_pivots(reuse),
                );
            }
        }
    }
    out
}

#[test]
fn matches_brute_force() {
    let data = uniform(400, 6, 42);
    let queries = uniform(15, 6, 7);

    for &metric in &[Metric::Euclidean, Metric::Manhattan, Metric::Chebyshev] {
        for builder in builders() {
            let tree = builder.metric(metric).build(data.clone()).unwrap();

            for query in queries.outer_iter() {
                for &k in &[1, 3, 10] {
                    let expected = brute_force(&data, query, k, metric);
                    let result = tree.search(query, k).unwrap();
                    let found: Vec<f64> = result.neighbours().iter().map(|n| n.dist()).collect();

                    assert_eq!(expected.len(), found.len(), "{:?}", builder);
                    for (e, f) in expected.iter().zip(found.iter()) {
                        assert_abs_diff_eq!(e, f, epsilon = 1e-12);
                    }

                    for nb in result.neighbours() {
                        let point = tree.point(nb.index()).unwrap();
                        assert_abs_diff_eq!(
                            metric.try_distance(query, point).unwrap(),
                            nb.dist(),
                            epsilon = 1e-12
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn matches_linear_search() {
    let data = uniform(250, 3, 3);
    let tree = PivotTreeBuilder::new()
        .pivot_strategy(PivotStrategy::FarthestFirst)
        .max_pivots(8)
        .leaf_size(2)
        .build(data)
        .unwrap();

    for query in uniform(10, 3, 99).outer_iter() {
        let tree_result = tree.search(query, 5).unwrap();
        let scan_result = tree.linear_search(query, 5).unwrap();

        let a: Vec<f64> = tree_result.neighbours().iter().map(|n| n.dist()).collect();
        let b: Vec<f64> = scan_result.neighbours().iter().map(|n| n.dist()).collect();
        assert_eq!(b, a);
        assert_eq!(tree.size(), scan_result.distance_calls());
    }
}

#[test]
fn five_point_example() {
    let tree = PivotTreeBuilder::new()
        .leaf_size(4)
        .metric(Metric::Euclidean)
        .build(array![[0., 0.], [1., 0.], [0., 1.], [10., 10.], [11., 10.]])
        .unwrap();
    assert_eq!(1, tree.stats().internal_nodes);

    let result = tree.search(array![0.5, 0.5].view(), 2).unwrap();
    assert_eq!(2, result.neighbours().len());
    for nb in result.neighbours() {
        assert!(nb.index() < 3);
        assert_abs_diff_eq!(0.5f64.sqrt(), nb.dist(), epsilon = 1e-12);
    }
}

#[test]
fn ties_keep_first_seen() {
    let tree = PivotTreeBuilder::new()
        .build_from_points(&[vec![1., 0.], vec![0., 1.], vec![-1., 0.], vec![0., -1.]])
        .unwrap();

    let result = tree.search(array![0., 0.].view(), 2).unwrap();
    let found: Vec<usize> = result.neighbours().iter().map(|n| n.index()).collect();
    assert_eq!(vec![0, 1], found);
}

#[test]
fn ties_survive_eviction() {
    let tree = PivotTreeBuilder::new()
        .build_from_points(&[vec![1., 0.], vec![0., 1.], vec![0.5, 0.]])
        .unwrap();
    assert_eq!(1, tree.stats().leaves);

    for result in &[
        tree.search(array![0., 0.].view(), 2).unwrap(),
        tree.linear_search(array![0., 0.].view(), 2).unwrap(),
    ] {
        let found: Vec<usize> = result.neighbours().iter().map(|n| n.index()).collect();
        assert_eq!(vec![2, 0], found);
    }
}

#[test]
fn overflowing_distances_are_kept() {
    for &metric in &[Metric::Euclidean, Metric::Manhattan, Metric::Chebyshev] {
        let tree = PivotTreeBuilder::new()
            .metric(metric)
            .build(array![[1e308], [-1e308]])
            .unwrap();
        let query = array![1e308];

        for result in &[
            tree.search(query.view(), 5).unwrap(),
            tree.linear_search(query.view(), 5).unwrap(),
        ] {
            let found: Vec<(usize, f64)> = result
                .neighbours()
                .iter()
                .map(|n| (n.index(), n.dist()))
                .collect();
            assert_eq!(vec![(0, 0.), (1, f64::INFINITY)], found, "{:?}", metric);
        }
    }
}

#[test]
fn k_larger_than_dataset() {
    for builder in builders() {
        let tree = builder.build(uniform(37, 2, 5)).unwrap();
        let result = tree.search(array![0., 0.].view(), 100).unwrap();

        let mut found: Vec<usize> = result.neighbours().iter().map(|n| n.index()).collect();
        found.sort_unstable();
        assert_eq!((0..37).collect::<Vec<_>>(), found);
    }
}

#[test]
fn small_dataset_is_one_leaf() {
    let tree = PivotTreeBuilder::new()
        .leaf_size(4)
        .build(uniform(4, 3, 1))
        .unwrap();

    assert_eq!(0, tree.stats().internal_nodes);
    assert_eq!(1, tree.stats().leaves);
    assert_eq!(0, tree.stats().pivots);
}

#[test]
fn empty_dataset() {
    let tree = PivotTreeBuilder::new().build(Array2::zeros((0, 3))).unwrap();
    assert!(tree.is_empty());
    assert_eq!(0, tree.size());

    let result = tree.search(array![1., 2., 3.].view(), 3).unwrap();
    assert!(result.neighbours().is_empty());

    let wrong_dim = Some(Error::InvalidDimension {
        expected: 3,
        found: 2,
    });
    assert_eq!(wrong_dim, tree.search(array![1., 2.].view(), 3).err());
    assert_eq!(wrong_dim, tree.linear_search(array![1., 2.].view(), 3).err());

    let tree = PivotTreeBuilder::new().build_from_points(&[]).unwrap();
    assert!(tree.is_empty());
    assert!(tree.search(array![1.].view(), 1).unwrap().neighbours().is_empty());
}

#[test]
fn queries_are_idempotent() {
    let tree = PivotTreeBuilder::new()
        .pruning(PruningRule::BinaryRadius)
        .reuse_pivots(true)
        .build(uniform(300, 4, 12))
        .unwrap();
    let query = array![0.5, -1., 2., 3.];

    let first = tree.search(query.view(), 7).unwrap();
    for _ in 0..5 {
        let again = tree.search(query.view(), 7).unwrap();
        assert_eq!(first.neighbours(), again.neighbours());
        assert_eq!(first.distance_calls(), again.distance_calls());
    }
}

#[test]
fn equal_seeds_build_equal_trees() {
    let data = uniform(200, 3, 77);
    let build = |seed| {
        PivotTreeBuilder::new()
            .pivot_strategy(PivotStrategy::FarthestFirst)
            .seed(seed)
            .build(data.clone())
            .unwrap()
    };

    let (a, b) = (build(5), build(5));
    assert_eq!(a.stats(), b.stats());

    let query = array![1., 1., 1.];
    assert_eq!(
        a.search(query.view(), 4).unwrap().distance_calls(),
        b.search(query.view(), 4).unwrap().distance_calls()
    );
}

#[test]
fn pruning_skips_far_cluster() {
    let data = clusters(100, 17);

    for &pruning in &[PruningRule::RangeTable, PruningRule::BinaryRadius] {
        let tree: PivotTree = PivotTreeBuilder::new().pruning(pruning).build(data.clone()).unwrap();
        let result = tree.search(array![5., 5.].view(), 1).unwrap();

        assert!(result.neighbours()[0].index() < 100);
        assert!(result.pruned() > 0, "{:?} pruned nothing", pruning);
        assert!(result.distance_calls() < tree.size());
    }
}

#[test]
fn batch_search() {
    let tree = PivotTreeBuilder::new().build(uniform(300, 5, 4)).unwrap();
    let queries = uniform(40, 5, 8);

    let results = tree.search_batch(queries.view(), 3).unwrap();
    assert_eq!(40, results.len());

    for (ii, result) in results.iter().enumerate() {
        assert_eq!(ii, result.index());
        let single = tree.search(queries.row(ii), 3).unwrap();
        assert_eq!(single.neighbours(), result.neighbours());
    }
}

#[test]
fn invalid_input() {
    let tree = PivotTreeBuilder::new().build(uniform(20, 3, 2)).unwrap();

    assert_eq!(Some(Error::InvalidK), tree.search(array![0., 0., 0.].view(), 0).err());
    assert_eq!(
        Some(Error::InvalidDimension {
            expected: 3,
            found: 2
        }),
        tree.search(array![0., 0.].view(), 1).err()
    );
    assert_eq!(
        Some(Error::NonFiniteQuery),
        tree.search(array![0., f64::NAN, 0.].view(), 1).err()
    );
    assert!(tree.search_batch(Array2::zeros((3, 4)).view(), 1).is_err());

    assert_eq!(
        Some(Error::InvalidDimension {
            expected: 2,
            found: 3
        }),
        PivotTreeBuilder::new()
            .build_from_points(&[vec![0., 0.], vec![1., 2., 3.]])
            .err()
    );
    assert_eq!(
        Some(Error::InvalidLeafSize),
        PivotTreeBuilder::new().leaf_size(0).build(uniform(5, 2, 1)).err()
    );
    assert_eq!(
        Some(Error::InvalidPivotCount(1)),
        PivotTreeBuilder::new().max_pivots(1).build(uniform(5, 2, 1)).err()
    );
    assert_eq!(
        Some(Error::CapacityExceeded {
            capacity: 10,
            found: 11
        }),
        PivotTreeBuilder::new().capacity(10).build(uniform(11, 2, 1)).err()
    );

    let mut data = uniform(5, 2, 1);
    data[[3, 1]] = f64::INFINITY;
    assert_eq!(
        Some(Error::NonFinite { point: 3 }),
        PivotTreeBuilder::new().build(data).err()
    );
}
