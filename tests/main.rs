use std::cmp::Ordering;

use sort_test_tools::{instantiate_sort_tests, patterns, Sort};

use primsort::SortError;

struct SortImpl {}

impl Sort for SortImpl {
    fn name() -> String {
        "primsort_stable".into()
    }

    fn sort<T>(arr: &mut [T])
    where
        T: Ord + Copy,
    {
        primsort::sort(arr).unwrap();
    }

    fn sort_by<T, F>(arr: &mut [T], compare: F)
    where
        T: Copy,
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        primsort::sort_by(arr, compare).unwrap();
    }
}

instantiate_sort_tests!(SortImpl);

// --- Entry-point surface ---

#[test]
fn sort_vs_sort_by() {
    // Ensure that sort and sort_by produce the same result.
    let mut input_normal = [800, 3, -801, 5, -801, -3, 60, 200, 50, 7, 10];
    let expected = [-801, -801, -3, 3, 5, 7, 10, 50, 60, 200, 800];

    let mut input_sort_by = input_normal.to_vec();

    primsort::sort(&mut input_normal).unwrap();
    primsort::sort_by(&mut input_sort_by, |a, b| a.cmp(b)).unwrap();

    assert_eq!(input_normal, expected);
    assert_eq!(input_sort_by, expected);
}

#[test]
fn trivial_ranges_are_noops() {
    let mut empty: [i32; 0] = [];
    primsort::sort(&mut empty).unwrap();

    let mut single = [42];
    primsort::sort(&mut single).unwrap();
    assert_eq!(single, [42]);

    let mut v = [9, 1, 5];
    primsort::sort_range(&mut v, 1, 1).unwrap();
    assert_eq!(v, [9, 1, 5]);
    primsort::sort_range(&mut v, 2, 3).unwrap();
    assert_eq!(v, [9, 1, 5]);
    primsort::sort_range(&mut v, 3, 3).unwrap();
    assert_eq!(v, [9, 1, 5]);
}

#[test]
fn invalid_range_reported_before_any_mutation() {
    let original = [9, 1, 5, 3, 7];

    let mut v = original;
    assert_eq!(
        primsort::sort_range(&mut v, 5, 2),
        Err(SortError::InvalidRange {
            from: 5,
            to: 2,
            len: 5
        })
    );
    assert_eq!(v, original);

    assert_eq!(
        primsort::sort_range(&mut v, 0, 6),
        Err(SortError::InvalidRange {
            from: 0,
            to: 6,
            len: 5
        })
    );
    assert_eq!(v, original);

    assert_eq!(
        primsort::sort_range(&mut v, 7, 9),
        Err(SortError::InvalidRange {
            from: 7,
            to: 9,
            len: 5
        })
    );
    assert_eq!(v, original);
}

#[test]
fn range_sort_leaves_outside_untouched() {
    let mut v: Vec<i32> = patterns::random(500);
    let original = v.clone();

    primsort::sort_range(&mut v, 100, 400).unwrap();

    assert_eq!(v[..100], original[..100]);
    assert_eq!(v[400..], original[400..]);
    assert!(v[100..400].windows(2).all(|w| w[0] <= w[1]));

    let mut sorted_middle = original[100..400].to_vec();
    sorted_middle.sort();
    assert_eq!(v[100..400], sorted_middle);
}

#[test]
fn range_sort_isolation_is_bit_exact_for_f64() {
    // NaN payloads outside the range must survive untouched.
    let mut v = patterns::random_f64_bits(300);
    let original_bits: Vec<u64> = v.iter().map(|x| x.to_bits()).collect();

    primsort::sort_range_by(&mut v, 50, 250, |a, b| a.total_cmp(b)).unwrap();

    for i in (0..50).chain(250..300) {
        assert_eq!(v[i].to_bits(), original_bits[i]);
    }
    assert!(v[50..250].windows(2).all(|w| w[0].total_cmp(&w[1]) != Ordering::Greater));
}

// --- Algorithm properties ---

#[test]
fn idempotent_on_sorted_input() {
    for len in [0, 1, 2, 31, 32, 33, 500, 5_000] {
        let mut v = patterns::random(len);
        v.sort();
        let sorted = v.clone();

        primsort::sort(&mut v).unwrap();
        assert_eq!(v, sorted);
    }
}

#[test]
fn reversal_duality() {
    // Sorting ascending and then descending must equal sorting descending
    // directly.
    for len in [10, 100, 2_048, 10_000] {
        let original = patterns::random(len);

        let mut twice = original.clone();
        primsort::sort_by(&mut twice, |a, b| a.cmp(b)).unwrap();
        primsort::sort_by(&mut twice, |a, b| b.cmp(a)).unwrap();

        let mut once = original;
        primsort::sort_by(&mut once, |a, b| b.cmp(a)).unwrap();

        assert_eq!(twice, once);
    }
}

#[test]
fn descending_comparator() {
    let mut v = [1, 2, 3, 4, 5];
    primsort::sort_by(&mut v, |a, b| b.cmp(a)).unwrap();
    assert_eq!(v, [5, 4, 3, 2, 1]);
}

#[test]
fn small_fixed_input() {
    let mut v = [5, 3, 4, 1, 2];
    primsort::sort(&mut v).unwrap();
    assert_eq!(v, [1, 2, 3, 4, 5]);
}

#[test]
fn equal_keys_keep_input_order() {
    // Three logically equal 3s tagged by original position.
    let mut v = [(3, 'a'), (1, 'x'), (3, 'b'), (2, 'y'), (3, 'c')];
    primsort::sort_by(&mut v, |a, b| a.0.cmp(&b.0)).unwrap();
    assert_eq!(v, [(1, 'x'), (2, 'y'), (3, 'a'), (3, 'b'), (3, 'c')]);
}

#[test]
fn thousand_random_doubles() {
    let mut v = patterns::random_f64(1_000);
    let count_before = v.len();
    let sum_before: f64 = v.iter().sum();

    primsort::sort_by(&mut v, |a, b| a.total_cmp(b)).unwrap();

    assert_eq!(v.len(), count_before);
    assert!(v.windows(2).all(|w| w[0] <= w[1]));
    let sum_after: f64 = v.iter().sum();
    // Summation order changed; allow reassociation error.
    assert!((sum_before - sum_after).abs() < 1e-9 * count_before as f64);
}

#[test]
fn int_edge() {
    fn check<T: Ord + Copy + std::fmt::Debug>(v: &mut [T]) {
        let mut expected = v.to_vec();
        expected.sort();
        primsort::sort(v).unwrap();
        assert_eq!(v, &expected[..]);
    }

    check(&mut [i32::MIN, i32::MAX]);
    check(&mut [i32::MAX, i32::MIN]);
    check(&mut [i32::MIN, 3]);
    check(&mut [i32::MIN, -3, i32::MAX]);
    check(&mut [i32::MAX, 3, i32::MIN, 5, i32::MIN, -3, 60, 200, 50, 7, 10]);

    check(&mut [i64::MIN, i64::MAX]);
    check(&mut [i64::MAX, i64::MIN, 0, i64::MAX - 3, i64::MIN + 1]);

    let mut large = patterns::random(5_000);
    large.push(i32::MAX);
    large.push(i32::MIN);
    large.push(i32::MAX);
    check(&mut large);
}

// --- Comparator contract violations ---

#[test]
fn violate_ord_no_panic_and_ok_preserves_elements() {
    // A comparator that is not a total order may produce an unspecified
    // order or an invariant error; it must never panic, and whenever the
    // call still reports Ok the buffer must hold the original multiset.
    let random_orderings = patterns::random_uniform(5_000, 0..3);

    let mut random_idx = 0;
    let mut next_random_ordering = move || {
        let ridx = random_idx;
        random_idx += 1;
        if random_idx == random_orderings.len() {
            random_idx = 0;
        }
        [Ordering::Less, Ordering::Equal, Ordering::Greater][random_orderings[ridx] as usize]
    };

    let mut sampled_counter = 0_i32;
    let mut streak_counter = 0_usize;

    let mut broken_comparators: Vec<Box<dyn FnMut(&i32, &i32) -> Ordering>> = vec![
        Box::new(move |_a, _b| next_random_ordering()),
        Box::new(|_a, _b| Ordering::Less),
        Box::new(|_a, _b| Ordering::Equal),
        Box::new(|_a, _b| Ordering::Greater),
        Box::new(|a, b| {
            if a == b {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }),
        Box::new(move |a, b| {
            // 1% of comparisons reversed.
            sampled_counter += 1;
            if sampled_counter >= 100 {
                sampled_counter = 0;
                b.cmp(a)
            } else {
                a.cmp(b)
            }
        }),
        Box::new(move |a, b| {
            // Alternate long truthful and long lying streaks.
            const STREAK_LEN: usize = 50;
            streak_counter += 1;
            if streak_counter <= STREAK_LEN {
                a.cmp(b)
            } else {
                if streak_counter == STREAK_LEN * 2 {
                    streak_counter = 0;
                }
                Ordering::Less
            }
        }),
    ];

    let pattern_fns: [fn(usize) -> Vec<i32>; 4] = [
        patterns::random,
        patterns::ascending,
        patterns::descending,
        |size| patterns::saw_mixed(size, 5),
    ];

    for comp_fn in &mut broken_comparators {
        for pattern_fn in pattern_fns {
            for test_size in [2, 16, 33, 200, 500, 2_048] {
                let mut test_data = pattern_fn(test_size);
                let sum_before: i64 = test_data.iter().map(|x| *x as i64).sum();

                if primsort::sort_by(&mut test_data, &mut *comp_fn).is_ok() {
                    let sum_after: i64 = test_data.iter().map(|x| *x as i64).sum();
                    assert_eq!(sum_before, sum_after);
                }
            }
        }
    }
}

// --- Per-type instantiations ---

macro_rules! instantiate_prim_type_tests {
    ($($t:ident => $widen:expr),* $(,)?) => {
        $(
            paste::paste! {
                #[test]
                fn [<sorts_full_and_subrange_ $t>]() {
                    let widen = $widen;
                    for len in [0, 1, 2, 31, 32, 500, 5_000] {
                        let mut v: Vec<$t> =
                            patterns::random(len).into_iter().map(widen).collect();
                        let mut expected = v.clone();
                        expected.sort();

                        primsort::sort(&mut v).unwrap();
                        assert_eq!(v, expected);
                    }

                    let mut v: Vec<$t> =
                        patterns::random(300).into_iter().map(widen).collect();
                    let original = v.clone();
                    primsort::sort_range(&mut v, 20, 280).unwrap();
                    assert_eq!(v[..20], original[..20]);
                    assert_eq!(v[280..], original[280..]);
                    assert!(v[20..280].windows(2).all(|w| w[0] <= w[1]));
                }
            }
        )*
    };
}

instantiate_prim_type_tests!(
    i32 => |val: i32| val,
    i64 => |val: i32| (val as i64) * 1_000_000_007,
    u64 => |val: i32| ((val as i64) - (i32::MIN as i64)) as u64 * 7919,
);

#[test]
fn sorts_full_and_subrange_f64() {
    for len in [0, 1, 2, 31, 32, 500, 5_000] {
        let mut v = patterns::random_f64_bits(len);
        let mut expected = v.clone();
        expected.sort_by(|a, b| a.total_cmp(b));

        primsort::sort_by(&mut v, |a, b| a.total_cmp(b)).unwrap();
        assert!(v
            .iter()
            .zip(expected.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits()));
    }
}
