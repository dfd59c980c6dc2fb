//! Lock-free sharing of weight matrices between training threads.

use ndarray::{Array2, ArrayView1, ArrayViewMut1};

/// Matrix that is shared between threads without synchronization.
///
/// Training uses asynchronous stochastic gradient descent (*Hogwild!*):
/// every worker reads and updates rows of the weight matrices without
/// taking a lock. Two workers can update the same row at the same time,
/// in which case one of the updates may be partially lost.
///
/// Row views are constructed from a pointer to the matrix data, the
/// matrix itself is never borrowed while workers run. The wrapper only
/// lives for the duration of a training run, the matrix is unwrapped
/// again with `into_inner` when all workers have been joined.
pub(crate) struct HogwildArray2 {
    array: Array2<f32>,
    data: *mut f32,
    nrows: usize,
    ncols: usize,
}

// Only rows are accessed concurrently, see the type documentation.
unsafe impl Send for HogwildArray2 {}
unsafe impl Sync for HogwildArray2 {}

impl HogwildArray2 {
    pub fn new(array: Array2<f32>) -> Self {
        // Rows are addressed as contiguous slices of the data.
        let mut array = if array.is_standard_layout() {
            array
        } else {
            array.as_standard_layout().into_owned()
        };

        let (nrows, ncols) = array.dim();
        let data = array.as_mut_ptr();

        HogwildArray2 {
            array,
            data,
            nrows,
            ncols,
        }
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.array
    }

    fn row_ptr(&self, idx: usize) -> *mut f32 {
        assert!(
            idx < self.nrows,
            "Row {} out of bounds for a matrix with {} rows",
            idx,
            self.nrows
        );

        unsafe { self.data.add(idx * self.ncols) }
    }

    /// Get a view of row `idx`.
    pub fn row(&self, idx: usize) -> ArrayView1<f32> {
        unsafe { ArrayView1::from_shape_ptr(self.ncols, self.row_ptr(idx)) }
    }

    /// Get a mutable view of row `idx`.
    ///
    /// Other threads may concurrently write to the same row.
    #[allow(clippy::mut_from_ref)]
    pub fn row_mut(&self, idx: usize) -> ArrayViewMut1<f32> {
        unsafe { ArrayViewMut1::from_shape_ptr(self.ncols, self.row_ptr(idx)) }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use ndarray::Array2;

    use super::HogwildArray2;

    #[test]
    fn disjoint_rows_from_threads() {
        let hogwild = HogwildArray2::new(Array2::zeros((4, 3)));

        thread::scope(|s| {
            for row in 0..4 {
                let hogwild = &hogwild;
                s.spawn(move || {
                    for _ in 0..100 {
                        hogwild.row_mut(row).map_inplace(|v| *v += 1.);
                    }
                });
            }
        });

        assert_eq!(hogwild.nrows(), 4);
        assert_eq!(hogwild.ncols(), 3);
        let array = hogwild.into_inner();
        assert!(array.iter().all(|&v| v == 100.));
    }

    #[test]
    fn rows_address_matrix_data() {
        let array = Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f32);
        let hogwild = HogwildArray2::new(array.clone());
        for idx in 0..3 {
            assert_eq!(hogwild.row(idx), array.row(idx));
        }

        hogwild.row_mut(1).fill(-1.);
        let updated = hogwild.into_inner();
        assert!(updated.row(1).iter().all(|&v| v == -1.));
        assert_eq!(updated.row(0), array.row(0));
        assert_eq!(updated.row(2), array.row(2));
    }

    #[test]
    fn transposed_matrix_rows() {
        let array = Array2::from_shape_fn((4, 3), |(r, c)| (r * 3 + c) as f32);
        let transposed = array.t().to_owned();
        let hogwild = HogwildArray2::new(array.reversed_axes());
        assert_eq!(hogwild.nrows(), 3);
        for idx in 0..3 {
            assert_eq!(hogwild.row(idx), transposed.row(idx));
        }
    }

    #[test]
    #[should_panic]
    fn row_out_of_bounds() {
        let hogwild = HogwildArray2::new(Array2::zeros((2, 3)));
        hogwild.row(2);
    }
}
