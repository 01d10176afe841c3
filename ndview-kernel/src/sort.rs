//! Sorting, permutation and shuffling.

use ndview_view::{NdView, Result, Viewable, ViewError};
use rand::Rng;

const VISITED: usize = usize::MAX;

/// Stable sorting permutation of a 1-D view.
///
/// Ties keep their original relative order in both directions. NaN sorts after every
/// number when ascending.
pub fn arg_sort(v: &NdView, reverse: bool) -> Result<Vec<usize>> {
    v.lane_1d()?;
    let values = v.to_vec();
    let mut perm: Vec<usize> = (0..values.len()).collect();
    if reverse {
        perm.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    } else {
        perm.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    }
    Ok(perm)
}

fn check_permutation(indices: &[usize], len: usize) -> Result<()> {
    if indices.len() != len {
        return Err(ViewError::InvalidArgument(format!(
            "permutation of length {} for {len} elements",
            indices.len()
        )));
    }
    let mut seen = vec![false; len];
    for &i in indices {
        if i >= len || seen[i] {
            return Err(ViewError::InvalidArgument(format!(
                "{indices:?} is not a permutation of 0..{len}"
            )));
        }
        seen[i] = true;
    }
    Ok(())
}

/// Permute a 1-D view in place: afterwards `v[j]` is the old `v[indices[j]]`.
///
/// Runs in O(n) moves by following the permutation's cycles; a scratch copy of
/// `indices` marks visited positions.
pub fn reorder(v: &NdView, indices: &[usize]) -> Result<()> {
    let lane = v.lane_1d()?;
    check_permutation(indices, lane.len)?;
    let mut next = indices.to_vec();
    v.buffer().with_mut(|data| {
        for start in 0..next.len() {
            if next[start] == VISITED {
                continue;
            }
            let held = data[lane.index(start)];
            let mut cur = start;
            loop {
                let src = next[cur];
                next[cur] = VISITED;
                if src == start {
                    data[lane.index(cur)] = held;
                    break;
                }
                data[lane.index(cur)] = data[lane.index(src)];
                cur = src;
            }
        }
    });
    Ok(())
}

/// Permute the sub-views along `axis`: afterwards sub-view `j` holds the old sub-view
/// `indices[j]`. One sub-view is held in temporary storage per cycle.
pub fn reorder_along(v: &NdView, indices: &[usize], axis: usize) -> Result<()> {
    let rank = v.ndim();
    if axis >= rank {
        return Err(ViewError::InvalidAxis { axis, rank });
    }
    if rank == 1 {
        return reorder(v, indices);
    }
    check_permutation(indices, v.shape()[axis])?;

    let mut next = indices.to_vec();
    for start in 0..next.len() {
        if next[start] == VISITED {
            continue;
        }
        let held = v.index_axis(start, axis)?.copy();
        let mut cur = start;
        loop {
            let src = next[cur];
            next[cur] = VISITED;
            let dst = v.index_axis(cur, axis)?;
            if src == start {
                dst.assign(&held)?;
                break;
            }
            dst.assign(&v.index_axis(src, axis)?)?;
            cur = src;
        }
    }
    Ok(())
}

/// Sort a 1-D view in place.
pub fn sort(v: &NdView, reverse: bool) -> Result<()> {
    let perm = arg_sort(v, reverse)?;
    reorder(v, &perm)
}

/// Fisher–Yates shuffle of a 1-D view.
pub fn shuffle(v: &NdView) -> Result<()> {
    shuffle_with(v, &mut rand::thread_rng())
}

/// [`shuffle`] with an explicit randomness source.
pub fn shuffle_with<R: Rng + ?Sized>(v: &NdView, rng: &mut R) -> Result<()> {
    let lane = v.lane_1d()?;
    let n = lane.len;
    v.buffer().with_mut(|data| {
        for i in 0..n.saturating_sub(1) {
            let j = rng.gen_range(i..n);
            data.swap(lane.index(i), lane.index(j));
        }
    });
    Ok(())
}
