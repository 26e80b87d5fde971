#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut v = data.to_vec();
    primsort::sort_by(&mut v, |a, b| b.cmp(a)).unwrap();
    assert!(v.windows(2).all(|w| w[0] >= w[1]));
});
