use ndarray::{Array2, ArrayView2, Axis, s};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// A supervised dataset: one sample per row of `x` paired with the same row of `y`.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array2<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Errors
    /// `SizeMismatch` if `x` and `y` have a different amount of rows, `EmptyDataset` if there
    /// are no rows at all.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dataset rows",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        if x.nrows() == 0 {
            return Err(MlErr::EmptyDataset);
        }

        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView2<'_, f32> {
        self.y.view()
    }

    /// Shuffles the samples in place, keeping every `x` row paired with its `y` row.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);

        self.x = self.x.select(Axis(0), &order);
        self.y = self.y.select(Axis(0), &order);
    }

    /// Splits off the last `fraction` of the samples into a second dataset.
    ///
    /// # Returns
    /// The training and validation datasets, the latter being `None` when it would be empty.
    pub fn split(self, fraction: f32) -> Result<(Self, Option<Self>)> {
        let held_out = (self.len() as f32 * fraction.clamp(0., 1.)).floor() as usize;

        if held_out == 0 {
            return Ok((self, None));
        }

        let cut = self.len() - held_out;
        let train = Self::new(
            self.x.slice(s![..cut, ..]).to_owned(),
            self.y.slice(s![..cut, ..]).to_owned(),
        )?;
        let val = Self::new(
            self.x.slice(s![cut.., ..]).to_owned(),
            self.y.slice(s![cut.., ..]).to_owned(),
        )?;

        Ok((train, Some(val)))
    }

    /// Iterates the dataset in batches of at most `batch_size` rows.
    pub fn batches(
        &self,
        batch_size: usize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        let batch_size = batch_size.max(1);

        self.x
            .axis_chunks_iter(Axis(0), batch_size)
            .zip(self.y.axis_chunks_iter(Axis(0), batch_size))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn dataset() -> Dataset {
        let x = array![[0., 0.], [1., 1.], [2., 2.], [3., 3.], [4., 4.]];
        let y = array![[0.], [1.], [2.], [3.], [4.]];
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let x = array![[0.], [1.]];
        let y = array![[0.]];
        assert!(matches!(
            Dataset::new(x, y),
            Err(MlErr::SizeMismatch { .. })
        ));
    }

    #[test]
    fn shuffle_keeps_pairs_together() {
        let mut data = dataset();
        data.shuffle(&mut StdRng::seed_from_u64(3));

        for (x, y) in data.x().rows().into_iter().zip(data.y().rows()) {
            assert_eq!(x[0], y[0]);
        }
    }

    #[test]
    fn batches_cover_all_rows() {
        let data = dataset();
        let sizes: Vec<usize> = data.batches(2).map(|(x, _)| x.nrows()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn split_holds_out_the_tail() {
        let (train, val) = dataset().split(0.4).unwrap();
        let val = val.unwrap();

        assert_eq!(train.len(), 3);
        assert_eq!(val.len(), 2);
        assert_eq!(val.y(), array![[3.], [4.]]);
    }

    #[test]
    fn split_of_nothing_keeps_everything() {
        let (train, val) = dataset().split(0.).unwrap();
        assert_eq!(train.len(), 5);
        assert!(val.is_none());
    }
}
