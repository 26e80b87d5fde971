use std::cmp::Ordering;

use crate::error::SortError;
use crate::gallop;
use crate::run;

/// Ranges shorter than this are handled by binary insertion sort alone and
/// never touch the merge machinery.
pub(crate) const MIN_MERGE: usize = 32;

/// Initial threshold of consecutive one-sided wins before a merge switches
/// from element-at-a-time comparison to galloping.
const MIN_GALLOP: usize = 7;

/// Initial scratch allocation for buffers large enough to not get the
/// half-length allocation up front.
const INITIAL_TMP_STORAGE_LEN: usize = 256;

/// A pending run on the merge stack: `len` sorted elements starting at
/// `base`. Adjacent stack entries are contiguous in the buffer.
#[derive(Debug, Clone, Copy)]
struct Run {
    base: usize,
    len: usize,
}

/// Compute the minimum run length for a buffer of length `n`.
///
/// Returns `n` itself below `MIN_MERGE`; otherwise the top bits of `n` with
/// an OR-accumulated correction from the discarded low bits, landing in
/// `MIN_MERGE/2..=MIN_MERGE`. The choice makes `n / min_run` a power of two
/// or slightly below, which is what keeps the later merges balanced.
pub(crate) fn min_run_length(mut n: usize) -> usize {
    let mut r = 0;
    while n >= MIN_MERGE {
        r |= n & 1;
        n >>= 1;
    }
    n + r
}

/// Sort `v` with the merge-insertion hybrid. The entry points guarantee
/// `v.len() >= 2`.
pub(crate) fn sort<T, F>(v: &mut [T], compare: &mut F) -> Result<(), SortError>
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    debug_assert!(v.len() >= 2);

    if v.len() < MIN_MERGE {
        // The whole range fits one padded run; no stack, no scratch.
        let run_len = run::count_run_and_make_ascending(v, compare);
        run::binary_insertion_sort(v, run_len, compare);
        return Ok(());
    }

    let min_run = min_run_length(v.len());
    let mut state = MergeState::new(v, compare);
    state.drive(min_run)
}

/// Per-call engine state. Created fresh on the stack of every sort
/// invocation and dropped when it returns; nothing survives across calls.
struct MergeState<'a, T, F> {
    v: &'a mut [T],
    compare: &'a mut F,
    /// Adaptive gallop threshold. Lowered while galloping pays off, raised
    /// when a gallop round fails to move a block.
    min_gallop: usize,
    /// Scratch space for the shorter side of a merge.
    tmp: Vec<T>,
    /// Stack of pending runs awaiting merge.
    runs: Vec<Run>,
}

impl<'a, T, F> MergeState<'a, T, F>
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    fn new(v: &'a mut [T], compare: &'a mut F) -> Self {
        let len = v.len();
        let tmp_len = if len < 2 * INITIAL_TMP_STORAGE_LEN {
            len / 2
        } else {
            INITIAL_TMP_STORAGE_LEN
        };

        MergeState {
            v,
            compare,
            min_gallop: MIN_GALLOP,
            tmp: Vec::with_capacity(tmp_len),
            runs: Vec::new(),
        }
    }

    /// Main loop: detect the next run, pad it to `min_run` if short, push it
    /// and restore the stack invariants, until the buffer is consumed; then
    /// force-collapse to a single run spanning everything.
    fn drive(&mut self, min_run: usize) -> Result<(), SortError> {
        let len = self.v.len();
        let mut lo = 0;
        let mut remaining = len;

        while remaining > 0 {
            let mut run_len = run::count_run_and_make_ascending(&mut self.v[lo..], self.compare);

            if run_len < min_run {
                let force = remaining.min(min_run);
                run::binary_insertion_sort(&mut self.v[lo..lo + force], run_len, self.compare);
                run_len = force;
            }

            self.runs.push(Run {
                base: lo,
                len: run_len,
            });
            self.merge_collapse()?;

            lo += run_len;
            remaining -= run_len;
        }
        debug_assert_eq!(lo, len);

        self.merge_force_collapse()?;
        if self.runs.len() != 1 {
            return Err(SortError::UnbalancedMergeStack {
                remaining: self.runs.len(),
            });
        }
        debug_assert!(self.runs[0].base == 0 && self.runs[0].len == len);
        Ok(())
    }

    /// Re-establish the stack invariants after a push:
    /// `len[n-1] > len[n] + len[n+1]` and `len[n] > len[n+1]` for the top of
    /// the stack. Merging on every violation bounds total merge work to
    /// O(n log n). When both adjacent pairs are in violation, the pair whose
    /// second run is smaller merges first.
    fn merge_collapse(&mut self) -> Result<(), SortError> {
        while self.runs.len() > 1 {
            let n = self.runs.len() - 2;

            if n > 0 && self.runs[n - 1].len <= self.runs[n].len + self.runs[n + 1].len {
                let at = if self.runs[n - 1].len < self.runs[n + 1].len {
                    n - 1
                } else {
                    n
                };
                self.merge_at(at)?;
            } else if self.runs[n].len <= self.runs[n + 1].len {
                self.merge_at(n)?;
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Collapse everything that remains into one run.
    fn merge_force_collapse(&mut self) -> Result<(), SortError> {
        while self.runs.len() > 1 {
            let mut n = self.runs.len() - 2;
            if n > 0 && self.runs[n - 1].len < self.runs[n + 1].len {
                n -= 1;
            }
            self.merge_at(n)?;
        }
        Ok(())
    }

    /// Merge the adjacent runs at stack positions `i` and `i + 1`.
    ///
    /// Gallops first from both ends to strip the elements that are already
    /// in place: leading elements of run 1 below run 2's head, and trailing
    /// elements of run 2 above run 1's tail. On nearly-sorted input the
    /// surviving overlap is tiny or empty. The shorter survivor is copied to
    /// scratch and merged back front-to-back (`merge_lo`) or back-to-front
    /// (`merge_hi`), whichever moves fewer elements.
    fn merge_at(&mut self, i: usize) -> Result<(), SortError> {
        debug_assert!(self.runs.len() >= 2);
        debug_assert!(i == self.runs.len() - 2 || i == self.runs.len() - 3);

        let Run {
            base: base1,
            len: len1,
        } = self.runs[i];
        let Run {
            base: base2,
            len: len2,
        } = self.runs[i + 1];

        if len1 == 0 || len2 == 0 {
            return Err(SortError::ZeroLenRun {
                base: if len1 == 0 { base1 } else { base2 },
            });
        }
        debug_assert_eq!(base1 + len1, base2);

        // The stack records the merged run whatever the merge below does.
        self.runs[i].len = len1 + len2;
        self.runs.remove(i + 1);

        // Leading elements of run 1 that are <= run 2's first element are
        // already in place.
        let k = gallop::gallop_right(self.v[base2], &self.v[base1..base1 + len1], 0, self.compare);
        let base1 = base1 + k;
        let len1 = len1 - k;
        if len1 == 0 {
            return Ok(());
        }

        // Trailing elements of run 2 that are >= run 1's last element are
        // already in place.
        let len2 = gallop::gallop_left(
            self.v[base1 + len1 - 1],
            &self.v[base2..base2 + len2],
            len2 - 1,
            self.compare,
        );
        if len2 == 0 {
            return Ok(());
        }

        if len1 <= len2 {
            self.merge_lo(base1, len1, base2, len2)
        } else {
            self.merge_hi(base1, len1, base2, len2)
        }
    }

    /// Merge with run 1 in scratch, writing left to right into the vacated
    /// front. Requires `len1 <= len2`; the caller has already established
    /// that run 2's first element is less than run 1's first, and run 1's
    /// last is greater than run 2's last.
    fn merge_lo(
        &mut self,
        base1: usize,
        len1: usize,
        base2: usize,
        len2: usize,
    ) -> Result<(), SortError> {
        debug_assert!(len1 > 0 && len2 > 0 && base1 + len1 == base2);

        self.ensure_capacity(len1);
        self.tmp.clear();
        self.tmp.extend_from_slice(&self.v[base1..base1 + len1]);

        let mut len1 = len1;
        let mut len2 = len2;
        let mut cursor1 = 0; // next element of run 1, in tmp
        let mut cursor2 = base2; // next element of run 2, in v
        let mut dest = base1; // next write position

        // Run 2's head is known to win the first comparison.
        self.v[dest] = self.v[cursor2];
        dest += 1;
        cursor2 += 1;
        len2 -= 1;

        if len2 == 0 {
            self.v[dest..dest + len1].copy_from_slice(&self.tmp[cursor1..cursor1 + len1]);
            return Ok(());
        }
        if len1 == 1 {
            self.v.copy_within(cursor2..cursor2 + len2, dest);
            self.v[dest + len2] = self.tmp[cursor1];
            return Ok(());
        }

        let mut min_gallop = self.min_gallop;
        'outer: loop {
            let mut count1 = 0; // consecutive wins for run 1
            let mut count2 = 0; // consecutive wins for run 2

            // Linear mode: one element at a time until one side starts
            // winning consistently. Ties go to run 1, which keeps equal
            // elements in input order.
            loop {
                if (self.compare)(&self.v[cursor2], &self.tmp[cursor1]) == Ordering::Less {
                    self.v[dest] = self.v[cursor2];
                    dest += 1;
                    cursor2 += 1;
                    len2 -= 1;
                    count2 += 1;
                    count1 = 0;
                    if len2 == 0 {
                        break 'outer;
                    }
                } else {
                    self.v[dest] = self.tmp[cursor1];
                    dest += 1;
                    cursor1 += 1;
                    len1 -= 1;
                    count1 += 1;
                    count2 = 0;
                    if len1 == 1 {
                        break 'outer;
                    }
                }
                if (count1 | count2) >= min_gallop {
                    break;
                }
            }

            // Galloping mode: search the winning side for the crossover and
            // move whole blocks. Stay here while the blocks keep being long
            // enough to pay for the searches.
            loop {
                count1 = gallop::gallop_right(
                    self.v[cursor2],
                    &self.tmp[cursor1..cursor1 + len1],
                    0,
                    self.compare,
                );
                if count1 != 0 {
                    self.v[dest..dest + count1]
                        .copy_from_slice(&self.tmp[cursor1..cursor1 + count1]);
                    dest += count1;
                    cursor1 += count1;
                    len1 -= count1;
                    // len1 == 0 here means the comparator contradicted
                    // itself; the epilogue reports it.
                    if len1 <= 1 {
                        break 'outer;
                    }
                }
                self.v[dest] = self.v[cursor2];
                dest += 1;
                cursor2 += 1;
                len2 -= 1;
                if len2 == 0 {
                    break 'outer;
                }

                count2 = gallop::gallop_left(
                    self.tmp[cursor1],
                    &self.v[cursor2..cursor2 + len2],
                    0,
                    self.compare,
                );
                if count2 != 0 {
                    self.v.copy_within(cursor2..cursor2 + count2, dest);
                    dest += count2;
                    cursor2 += count2;
                    len2 -= count2;
                    if len2 == 0 {
                        break 'outer;
                    }
                }
                self.v[dest] = self.tmp[cursor1];
                dest += 1;
                cursor1 += 1;
                len1 -= 1;
                if len1 == 1 {
                    break 'outer;
                }

                min_gallop = min_gallop.saturating_sub(1);
                if count1 < MIN_GALLOP && count2 < MIN_GALLOP {
                    // Neither side sustained a streak; galloping is
                    // thrashing. Back to linear mode at a raised threshold.
                    min_gallop += 2;
                    continue 'outer;
                }
            }
        }
        self.min_gallop = min_gallop.max(1);

        if len1 == 1 {
            debug_assert!(len2 > 0);
            self.v.copy_within(cursor2..cursor2 + len2, dest);
            // The last element of run 1 goes after run 2's remainder.
            self.v[dest + len2] = self.tmp[cursor1];
            Ok(())
        } else if len1 == 0 {
            Err(SortError::ComparatorViolation)
        } else {
            debug_assert_eq!(len2, 0);
            self.v[dest..dest + len1].copy_from_slice(&self.tmp[cursor1..cursor1 + len1]);
            Ok(())
        }
    }

    /// Mirror of `merge_lo` with run 2 in scratch, writing right to left
    /// into the vacated tail. Requires `len1 > len2`.
    ///
    /// Read and write positions are derived from the remaining lengths
    /// (run 1's next element is `v[base1 + len1 - 1]`, run 2's is
    /// `tmp[len2 - 1]`, the write slot is `v[base1 + len1 + len2 - 1]`), so
    /// no cursor ever has to step below its base.
    fn merge_hi(
        &mut self,
        base1: usize,
        len1: usize,
        base2: usize,
        len2: usize,
    ) -> Result<(), SortError> {
        debug_assert!(len1 > 0 && len2 > 0 && base1 + len1 == base2);

        self.ensure_capacity(len2);
        self.tmp.clear();
        self.tmp.extend_from_slice(&self.v[base2..base2 + len2]);

        let mut len1 = len1;
        let mut len2 = len2;

        // Run 1's tail is known to win the first comparison.
        self.v[base1 + len1 + len2 - 1] = self.v[base1 + len1 - 1];
        len1 -= 1;

        if len1 == 0 {
            self.v[base1..base1 + len2].copy_from_slice(&self.tmp[..len2]);
            return Ok(());
        }
        if len2 == 1 {
            self.v.copy_within(base1..base1 + len1, base1 + 1);
            self.v[base1] = self.tmp[0];
            return Ok(());
        }

        let mut min_gallop = self.min_gallop;
        'outer: loop {
            let mut count1 = 0;
            let mut count2 = 0;

            // Linear mode, from the top down. Ties go to run 2 here: when
            // the tails compare equal, run 2's element must land above
            // run 1's.
            loop {
                if (self.compare)(&self.tmp[len2 - 1], &self.v[base1 + len1 - 1]) == Ordering::Less
                {
                    self.v[base1 + len1 + len2 - 1] = self.v[base1 + len1 - 1];
                    len1 -= 1;
                    count1 += 1;
                    count2 = 0;
                    if len1 == 0 {
                        break 'outer;
                    }
                } else {
                    self.v[base1 + len1 + len2 - 1] = self.tmp[len2 - 1];
                    len2 -= 1;
                    count2 += 1;
                    count1 = 0;
                    if len2 == 1 {
                        break 'outer;
                    }
                }
                if (count1 | count2) >= min_gallop {
                    break;
                }
            }

            // Galloping mode, mirrored.
            loop {
                count1 = len1
                    - gallop::gallop_right(
                        self.tmp[len2 - 1],
                        &self.v[base1..base1 + len1],
                        len1 - 1,
                        self.compare,
                    );
                if count1 != 0 {
                    self.v.copy_within(
                        base1 + len1 - count1..base1 + len1,
                        base1 + len1 + len2 - count1,
                    );
                    len1 -= count1;
                    if len1 == 0 {
                        break 'outer;
                    }
                }
                self.v[base1 + len1 + len2 - 1] = self.tmp[len2 - 1];
                len2 -= 1;
                if len2 == 1 {
                    break 'outer;
                }

                count2 = len2
                    - gallop::gallop_left(
                        self.v[base1 + len1 - 1],
                        &self.tmp[..len2],
                        len2 - 1,
                        self.compare,
                    );
                if count2 != 0 {
                    self.v[base1 + len1 + len2 - count2..base1 + len1 + len2]
                        .copy_from_slice(&self.tmp[len2 - count2..len2]);
                    len2 -= count2;
                    // len2 == 0 here means the comparator contradicted
                    // itself; the epilogue reports it.
                    if len2 <= 1 {
                        break 'outer;
                    }
                }
                self.v[base1 + len1 + len2 - 1] = self.v[base1 + len1 - 1];
                len1 -= 1;
                if len1 == 0 {
                    break 'outer;
                }

                min_gallop = min_gallop.saturating_sub(1);
                if count1 < MIN_GALLOP && count2 < MIN_GALLOP {
                    min_gallop += 2;
                    continue 'outer;
                }
            }
        }
        self.min_gallop = min_gallop.max(1);

        if len2 == 1 {
            debug_assert!(len1 > 0);
            self.v.copy_within(base1..base1 + len1, base1 + 1);
            // The first element of run 2 goes below run 1's remainder.
            self.v[base1] = self.tmp[0];
            Ok(())
        } else if len2 == 0 {
            Err(SortError::ComparatorViolation)
        } else {
            debug_assert_eq!(len1, 0);
            self.v[base1..base1 + len2].copy_from_slice(&self.tmp[..len2]);
            Ok(())
        }
    }

    /// Grow the scratch buffer to hold at least `min_capacity` elements:
    /// next power of two, capped at half the buffer (a merge's shorter run
    /// never exceeds that). Only ever grows within a call.
    fn ensure_capacity(&mut self, min_capacity: usize) {
        debug_assert!(min_capacity <= self.v.len() / 2);

        if self.tmp.capacity() < min_capacity {
            let new_len = min_capacity.next_power_of_two().min(self.v.len() / 2);
            debug_assert!(new_len >= min_capacity);
            self.tmp = Vec::with_capacity(new_len);
        }
    }
}
