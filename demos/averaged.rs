use std::time::Instant;

use clap::{App, Arg};
use ndarray::{Array, Array1, Array2};
use ghtree::{Metric, PivotStrategy, PivotTree, PivotTreeBuilder, PruningRule};

// Builds every tree variant over a uniform dataset in [-10, 10), queries it with a random point
// and reports build time, search time and distance evaluations averaged over the iterations.
// Each answer is checked against a linear scan.

fn uniform(rng: &mut oorandom::Rand64, rows: usize, cols: usize) -> Array2<f64> {
    Array::from_shape_simple_fn((rows, cols), || rng.rand_float() * 20. - 10.)
}

#[derive(Debug, Default)]
struct Totals {
    build_us: u128,
    search_us: u128,
    build_calls: usize,
    search_calls: usize,
    pivots: usize,
    depth: usize,
    mismatches: usize,
}

fn parse<T: std::str::FromStr>(matches: &clap::ArgMatches<'_>, name: &str) -> T {
    match matches.value_of(name).map(str::parse) {
        Some(Ok(value)) => value,
        _ => {
            eprintln!("Invalid value for --{}", name);
            std::process::exit(1);
        }
    }
}

fn main() {
    let matches = App::new("averaged")
        .about("Averages the cost of pivot tree construction and k-NN search")
        .arg(
            Arg::with_name("points")
                .short("n")
                .long("points")
                .takes_value(true)
                .default_value("200"),
        )
        .arg(
            Arg::with_name("dim")
                .short("d")
                .long("dim")
                .takes_value(true)
                .default_value("10"),
        )
        .arg(Arg::with_name("k").short("k").takes_value(true).default_value("3"))
        .arg(
            Arg::with_name("iterations")
                .short("i")
                .long("iterations")
                .takes_value(true)
                .default_value("10"),
        )
        .arg(
            Arg::with_name("leaf-size")
                .long("leaf-size")
                .takes_value(true)
                .default_value("4"),
        )
        .arg(
            Arg::with_name("metric")
                .short("m")
                .long("metric")
                .possible_values(&["l1", "l2", "linf"])
                .default_value("l2"),
        )
        .arg(Arg::with_name("seed").long("seed").takes_value(true).default_value("0"))
        .get_matches();

    let n: usize = parse(&matches, "points");
    let dim: usize = parse(&matches, "dim");
    let k: usize = parse(&matches, "k");
    let iterations: usize = parse::<usize>(&matches, "iterations").max(1);
    let leaf_size: usize = parse(&matches, "leaf-size");
    let seed: u64 = parse(&matches, "seed");
    let metric = match matches.value_of("metric") {
        Some("l1") => Metric::Manhattan,
        Some("linf") => Metric::Chebyshev,
        _ => Metric::Euclidean,
    };

    let mut rng = oorandom::Rand64::new(seed as u128);
    let data = uniform(&mut rng, n, dim);

    let variants = [
        ("random pivoting (GHT)", PruningRule::BinaryRadius, PivotStrategy::Random, false),
        ("reusing pivots (MBT)", PruningRule::BinaryRadius, PivotStrategy::Random, true),
        ("GNAT", PruningRule::RangeTable, PivotStrategy::Random, false),
        ("GNAT max separation", PruningRule::RangeTable, PivotStrategy::FarthestFirst, false),
    ];

    println!("> Dataset: {} x {}, k = {}, {:?}", n, dim, k, metric);

    for &(name, pruning, strategy, reuse) in &variants {
        let mut totals = Totals::default();

        for iter in 0..iterations {
            let builder = PivotTreeBuilder::new()
                .metric(metric)
                .leaf_size(leaf_size)
                .pruning(pruning)
                .pivot_strategy(strategy)
                .reuse_pivots(reuse)
                .seed(seed.wrapping_add(iter as u64));

            let start = Instant::now();
            let tree = builder.build(data.clone()).unwrap();
            totals.build_us += start.elapsed().as_micros();

            let query = uniform(&mut rng, 1, dim).row(0).to_owned();

            let start = Instant::now();
            let result = tree.search(query.view(), k).unwrap();
            totals.search_us += start.elapsed().as_micros();

            let stats = tree.stats();
            totals.build_calls += stats.distance_calls;
            totals.pivots += stats.pivots;
            totals.depth += stats.depth;
            totals.search_calls += result.distance_calls();

            let expected = tree.linear_search(query.view(), k).unwrap();
            let same = result.neighbours().len() == expected.neighbours().len()
                && result
                    .neighbours()
                    .iter()
                    .zip(expected.neighbours())
                    .all(|(a, b)| a.dist() == b.dist());
            if !same {
                totals.mismatches += 1;
            }
        }

        let avg = |total: usize| total as f64 / iterations as f64;
        println!("\n{} averaged over {} iterations:", name, iterations);
        println!("  build time: {:.2} microseconds", totals.build_us as f64 / iterations as f64);
        println!("  search time: {:.2} microseconds", totals.search_us as f64 / iterations as f64);
        println!("  distance computations in building: {:.2}", avg(totals.build_calls));
        println!("  distance computations in searching: {:.2}", avg(totals.search_calls));
        println!("  pivots: {:.2}, depth: {:.2}", avg(totals.pivots), avg(totals.depth));
        println!("  answers differing from a linear scan: {}", totals.mismatches);
    }

    let tree = PivotTreeBuilder::new().metric(metric).build(data).unwrap();
    let query: Array1<f64> = uniform(&mut rng, 1, dim).row(0).to_owned();
    demo(&tree, &query, k);
}

fn demo(tree: &PivotTree, query: &Array1<f64>, k: usize) {
    println!("\nQuery point:\n{:.2}", query);

    let start = Instant::now();
    let result = tree.linear_search(query.view(), k).unwrap();
    let brute_us = start.elapsed().as_micros();

    println!("\n{} nearest neighbours:", k);
    for (rank, nb) in tree.search(query.view(), k).unwrap().neighbours().iter().enumerate() {
        if let Some(point) = tree.point(nb.index()) {
            println!("{}. {:.2}  dist={:.4}", rank + 1, point, nb.dist());
        }
    }

    println!("\nLinear scan ({} microseconds):", brute_us);
    for (rank, nb) in result.neighbours().iter().enumerate() {
        println!("{}. #{}  dist={:.4}", rank + 1, nb.index(), nb.dist());
    }
}
