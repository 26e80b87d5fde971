//! Input patterns for testing and benchmarking sorting algorithms.
//!
//! Integer patterns are `i32`; widened and float variants derive from the
//! same generators so a fixed seed reproduces the same shapes across element
//! types. The seed is chosen once per process and printed by the test
//! harness; set the `OVERRIDE_SEED` env var to replay a failure.

use std::env;
use std::str::FromStr;
use std::sync::Mutex;

use rand::prelude::*;

use zipf::ZipfDistribution;

// --- Public ---

/// Uniformly random values over the full `i32` range.
pub fn random(len: usize) -> Vec<i32> {
    random_vec(len)
}

/// Uniformly random values restricted to `range`.
pub fn random_uniform<R>(len: usize, range: R) -> Vec<i32>
where
    R: Into<rand::distributions::Uniform<i32>>,
{
    let mut rng = rand::rngs::StdRng::from(new_seed());
    let dist: rand::distributions::Uniform<i32> = range.into();

    (0..len).map(|_| dist.sample(&mut rng)).collect()
}

/// Zipf-distributed values: a few heavily repeated values dominate, a long
/// tail of rare ones follows. Great for exercising merges of equal runs.
pub fn random_zipf(len: usize, exponent: f64) -> Vec<i32> {
    let mut rng = rand::rngs::StdRng::from(new_seed());
    let dist = ZipfDistribution::new(len, exponent).unwrap();

    (0..len).map(|_| dist.sample(&mut rng) as i32).collect()
}

/// Random values where the first `sorted_percent` of the buffer is already
/// sorted, as after appending new entries to a sorted prefix.
pub fn random_sorted(len: usize, sorted_percent: f64) -> Vec<i32> {
    let mut v = random_vec(len);
    let sorted_len = ((len as f64) * (sorted_percent / 100.0)).round() as usize;

    v[0..sorted_len].sort_unstable();

    v
}

/// Uniformly random `f64` values in `[0, 1)`.
pub fn random_f64(len: usize) -> Vec<f64> {
    let mut rng = rand::rngs::StdRng::from(new_seed());

    (0..len).map(|_| rng.gen::<f64>()).collect()
}

/// `f64` values from random raw bit patterns: NaNs with random payloads,
/// infinities, both zeros, subnormals. Only a total order such as
/// `f64::total_cmp` sorts these; that is exactly the point.
pub fn random_f64_bits(len: usize) -> Vec<f64> {
    let mut rng = rand::rngs::StdRng::from(new_seed());

    (0..len).map(|_| f64::from_bits(rng.gen::<u64>())).collect()
}

pub fn all_equal(len: usize) -> Vec<i32> {
    (0..len).map(|_| 66).collect::<Vec<_>>()
}

pub fn ascending(len: usize) -> Vec<i32> {
    (0..len as i32).collect::<Vec<_>>()
}

pub fn descending(len: usize) -> Vec<i32> {
    (0..len as i32).rev().collect::<Vec<_>>()
}

/// Random values arranged into `saw_count` ascending stretches.
pub fn saw_ascending(len: usize, saw_count: usize) -> Vec<i32> {
    if len == 0 {
        return Vec::new();
    }

    let mut vals = random_vec(len);
    let chunks_size = len / saw_count.max(1);

    for chunk in vals.chunks_mut(chunks_size) {
        chunk.sort();
    }

    vals
}

/// Random values arranged into `saw_count` descending stretches.
pub fn saw_descending(len: usize, saw_count: usize) -> Vec<i32> {
    if len == 0 {
        return Vec::new();
    }

    let mut vals = random_vec(len);
    let chunks_size = len / saw_count.max(1);

    for chunk in vals.chunks_mut(chunks_size) {
        chunk.sort_by_key(|&e| std::cmp::Reverse(e));
    }

    vals
}

/// Stretches of random data sorted ascending or descending at random.
pub fn saw_mixed(len: usize, saw_count: usize) -> Vec<i32> {
    if len == 0 {
        return Vec::new();
    }

    let mut vals = random_vec(len);
    let chunks_size = len / saw_count.max(1);
    let saw_directions = random_uniform((len / chunks_size) + 1, 0..=1);

    for (i, chunk) in vals.chunks_mut(chunks_size).enumerate() {
        if saw_directions[i] == 0 {
            chunk.sort();
        } else {
            chunk.sort_by_key(|&e| std::cmp::Reverse(e));
        }
    }

    vals
}

/// Like [`saw_mixed`] with stretch lengths drawn from `range` instead of a
/// fixed chunk size.
pub fn saw_mixed_range(len: usize, range: std::ops::Range<usize>) -> Vec<i32> {
    if len == 0 {
        return Vec::new();
    }

    let mut vals = random_vec(len);

    let max_chunks = len / range.start;
    let saw_directions = random_uniform(max_chunks + 1, 0..=1);
    let chunk_sizes = random_uniform(max_chunks + 1, (range.start as i32)..(range.end as i32));

    let mut i = 0;
    let mut l = 0;
    while l < len {
        let chunk_size = chunk_sizes[i] as usize;
        let chunk_end = std::cmp::min(l + chunk_size, len);
        let chunk = &mut vals[l..chunk_end];

        if saw_directions[i] == 0 {
            chunk.sort();
        } else {
            chunk.sort_by_key(|&e| std::cmp::Reverse(e));
        }

        i += 1;
        l += chunk_size;
    }

    vals
}

/// First half ascending, second half descending.
pub fn pipe_organ(len: usize) -> Vec<i32> {
    let mut vals = random_vec(len);

    let first_half = &mut vals[0..(len / 2)];
    first_half.sort();

    let second_half = &mut vals[(len / 2)..len];
    second_half.sort_by_key(|&e| std::cmp::Reverse(e));

    vals
}

/// Overwrites the default behavior so that each call to a random derived
/// pattern yields new random values.
///
/// By default `patterns::random(4)` will yield the same values per process
/// invocation. For benchmarks it's advised to call this function.
pub fn use_random_seed_each_time() {
    let (seed_type, _) = get_or_init_seed_type_and_value();
    if seed_type == SeedType::ExternalOverride {
        panic!("Using use_random_seed_each_time conflicts with the external seed override.");
    }

    *SEED_TYPE_AND_VALUE.lock().unwrap() = Some((SeedType::RandomEachTime, 0));
}

pub fn random_init_seed() -> u64 {
    get_or_init_seed_type_and_value().1
}

// --- Private ---

#[derive(Copy, Clone, PartialEq, Eq)]
enum SeedType {
    RandomEachTime,
    RandomOncePerProcess,
    ExternalOverride,
}

static SEED_TYPE_AND_VALUE: Mutex<Option<(SeedType, u64)>> = Mutex::new(None);

fn get_or_init_seed_type_and_value() -> (SeedType, u64) {
    let (seed_type, seed_val) = *SEED_TYPE_AND_VALUE.lock().unwrap().get_or_insert_with(|| {
        if let Some(override_seed) = env::var("OVERRIDE_SEED")
            .ok()
            .map(|seed| u64::from_str(&seed).unwrap())
        {
            (SeedType::ExternalOverride, override_seed)
        } else {
            let per_process_seed = thread_rng().gen();
            (SeedType::RandomOncePerProcess, per_process_seed)
        }
    });

    if seed_type == SeedType::RandomEachTime {
        (SeedType::RandomEachTime, thread_rng().gen())
    } else {
        (seed_type, seed_val)
    }
}

fn new_seed() -> StdRng {
    rand::SeedableRng::seed_from_u64(random_init_seed())
}

fn random_vec(len: usize) -> Vec<i32> {
    let mut rng = rand::rngs::StdRng::from(new_seed());

    (0..len).map(|_| rng.gen::<i32>()).collect()
}
