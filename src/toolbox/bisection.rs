/*
Copyright 2021 Jakub Lewandowski

This file is part of MOM6 Tools (m6tools).

MOM6 Tools (m6tools) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

MOM6 Tools (m6tools) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with MOM6 Tools (m6tools). If not, see https://www.gnu.org/licenses/.
*/

//! Module containg methods for conducting
//! binary search (bisection) of elements closests
//! to searched values in monotonic coordinates,
//! such as latitudes of grid rows or depths of model levels.

use crate::errors::SearchError;

/// Edges of searched array, checked for emptiness
/// and for containing the searched value.
fn bounds<T: PartialOrd + Copy>(array: &[T], x: T) -> Result<(T, T), SearchError> {
    let (first, last) = match (array.first(), array.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(SearchError::EmptyArray),
    };

    if x < first && x < last || x > first && x > last {
        return Err(SearchError::OutOfBounds);
    }

    Ok((first, last))
}

/// Core bisection function, an implementation of binary search
/// adapted to searching values in-between the set items.
///
/// Returns the first index at which the array reaches `x`
/// (from below for ascending arrays, from above for descending ones).
fn binary_search<T: PartialOrd + Copy>(array: &[T], x: T) -> Result<usize, SearchError> {
    let (first, last) = bounds(array, x)?;

    let mut lo = 0;
    let mut hi = array.len() - 1;

    // if the array is sorted descendingly we use a function with reversed signs
    if first < last {
        while lo < hi {
            let mid = (lo + hi) / 2;

            if array[mid] >= x {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
    } else {
        while lo < hi {
            let mid = (lo + hi) / 2;

            if array[mid] <= x {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
    }

    Ok(lo)
}

/// Finds the index of the closest item to the left
/// of the searched value (or the item equal to it).
pub fn find_left_closest<T: PartialOrd + Copy>(array: &[T], x: T) -> Result<usize, SearchError> {
    let (first, last) = bounds(array, x)?;
    let found_index = binary_search(array, x)?;

    let exact = if first < last {
        array[found_index] <= x
    } else {
        array[found_index] >= x
    };

    if exact || found_index == 0 {
        Ok(found_index)
    } else {
        Ok(found_index - 1)
    }
}

/// Finds the index of the closest item to the right
/// of the searched value (or the item equal to it).
pub fn find_right_closest<T: PartialOrd + Copy>(array: &[T], x: T) -> Result<usize, SearchError> {
    binary_search(array, x)
}

/// Finds the inclusive index window of an ascending array
/// with values in `lo..=hi`. Limits outside the array are clamped
/// to its edges.
///
/// Returns `None` when no item falls into the window.
pub fn inclusive_window<T: PartialOrd + Copy>(
    array: &[T],
    lo: T,
    hi: T,
) -> Result<Option<(usize, usize)>, SearchError> {
    let (first, last) = match (array.first(), array.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(SearchError::EmptyArray),
    };

    if hi < lo || hi < first || lo > last {
        return Ok(None);
    }

    let start = if lo <= first {
        0
    } else {
        find_right_closest(array, lo)?
    };

    let end = if hi >= last {
        array.len() - 1
    } else {
        find_left_closest(array, hi)?
    };

    if start > end {
        return Ok(None);
    }

    Ok(Some((start, end)))
}

#[cfg(test)]
mod tests {
    use super::{find_left_closest, find_right_closest, inclusive_window};
    use crate::errors::SearchError;

    #[test]
    fn ascending_search() {
        let levels = [2.5, 10.0, 20.0, 32.5, 51.0];

        assert_eq!(find_left_closest(&levels, 15.0), Ok(1));
        assert_eq!(find_right_closest(&levels, 15.0), Ok(2));
        assert_eq!(find_left_closest(&levels, 20.0), Ok(2));
        assert_eq!(find_right_closest(&levels, 20.0), Ok(2));
        assert_eq!(find_left_closest(&levels, 2.5), Ok(0));
    }

    #[test]
    fn descending_search() {
        let heights = [0.0, -10.0, -20.0, -40.0];

        assert_eq!(find_left_closest(&heights, -15.0), Ok(1));
        assert_eq!(find_right_closest(&heights, -15.0), Ok(2));
    }

    #[test]
    fn search_errors() {
        let empty: [f64; 0] = [];

        assert_eq!(find_left_closest(&empty, 1.0), Err(SearchError::EmptyArray));
        assert_eq!(
            find_right_closest(&[1.0, 2.0], 3.0),
            Err(SearchError::OutOfBounds)
        );
    }

    #[test]
    fn window_is_clamped() {
        let lats = [-60.0, -30.0, 0.0, 30.0, 60.0];

        assert_eq!(inclusive_window(&lats, -90.0, -30.0), Ok(Some((0, 1))));
        assert_eq!(inclusive_window(&lats, 25.0, 90.0), Ok(Some((3, 4))));
        assert_eq!(inclusive_window(&lats, 5.0, 10.0), Ok(None));
        assert_eq!(inclusive_window(&lats, 70.0, 80.0), Ok(None));
    }
}
