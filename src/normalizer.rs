use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::{
    Result, ZooError,
    config::{NormMode, OneOrMany},
};

/// The statistics a `Normalizer` centers and scales with.
#[derive(Debug, Clone, PartialEq)]
pub struct NormStats {
    pub mean: OneOrMany<f32>,
    pub std: OneOrMany<f32>,
}

/// Centers and scales data according to a `NormMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    mode: NormMode,
}

impl Normalizer {
    pub fn new(mode: NormMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> NormMode {
        self.mode
    }

    /// Computes the statistics of `data`.
    ///
    /// # Arguments
    /// * `data` - One sample per row.
    ///
    /// # Returns
    /// Scalar statistics for the global modes and one entry per column otherwise.
    pub fn fit(&self, data: ArrayView2<f32>) -> Result<NormStats> {
        let (mean, std) = match self.mode {
            NormMode::NONE => (vec![0.], vec![1.]),
            NormMode::IMAGE => (vec![0.], vec![255.]),
            NormMode::GLOBAL => {
                let mean = data.mean().ok_or_else(|| empty(self.mode))?;
                let std = data.std(0.);
                (vec![mean], vec![nonzero(std)])
            }
            NormMode::PER_FEATURE => {
                let mean = data.mean_axis(Axis(0)).ok_or_else(|| empty(self.mode))?;
                let std = data.std_axis(Axis(0), 0.).mapv(nonzero);
                (mean.to_vec(), std.to_vec())
            }
            NormMode::CENTER => {
                let mean = data.mean_axis(Axis(0)).ok_or_else(|| empty(self.mode))?;
                let std = vec![1.; mean.len()];
                (mean.to_vec(), std)
            }
            NormMode(mode) => return Err(unknown(mode)),
        };

        Ok(NormStats {
            mean: mean.into(),
            std: std.into(),
        })
    }

    /// Applies `(x - mean) / std` column-wise.
    pub fn normalize(&self, data: ArrayView2<f32>, stats: &NormStats) -> Result<Array2<f32>> {
        self.check_mode()?;
        let (mean, std) = broadcast(data.ncols(), stats)?;
        Ok((&data - &mean) / &std)
    }

    /// Undoes `normalize`.
    pub fn denormalize(&self, data: ArrayView2<f32>, stats: &NormStats) -> Result<Array2<f32>> {
        self.check_mode()?;
        let (mean, std) = broadcast(data.ncols(), stats)?;
        Ok(&data * &std + &mean)
    }

    fn check_mode(&self) -> Result<()> {
        match self.mode {
            NormMode::NONE
            | NormMode::GLOBAL
            | NormMode::PER_FEATURE
            | NormMode::CENTER
            | NormMode::IMAGE => Ok(()),
            NormMode(mode) => Err(unknown(mode)),
        }
    }
}

fn nonzero(std: f32) -> f32 {
    if std == 0. {
        1.
    } else {
        std
    }
}

fn empty(mode: NormMode) -> ZooError {
    ZooError::InvalidConfig(format!(
        "cannot compute normalization statistics (mode {}) of empty data",
        mode.0
    ))
}

fn unknown(mode: u8) -> ZooError {
    ZooError::InvalidConfig(format!("unknown normalization mode {mode}"))
}

fn broadcast(ncols: usize, stats: &NormStats) -> Result<(Array1<f32>, Array1<f32>)> {
    let expand = |values: Vec<f32>, what: &str| match values.len() {
        1 => Ok(Array1::from_elem(ncols, values[0])),
        n if n == ncols => Ok(Array1::from(values)),
        n => Err(ZooError::InvalidConfig(format!(
            "{what} has {n} entries but the data has {ncols} columns"
        ))),
    };

    Ok((
        expand(stats.mean.to_vec(), "mean")?,
        expand(stats.std.to_vec(), "std")?,
    ))
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn per_feature_normalization_round_trips() {
        let data = array![[1., 10.], [3., 10.]];
        let normalizer = Normalizer::new(NormMode::PER_FEATURE);

        let stats = normalizer.fit(data.view()).unwrap();
        assert_eq!(stats.mean, OneOrMany::Many(vec![2., 10.]));
        // constant columns keep a unit std
        assert_eq!(stats.std, OneOrMany::Many(vec![1., 1.]));

        let normalized = normalizer.normalize(data.view(), &stats).unwrap();
        assert_eq!(normalized, array![[-1., 0.], [1., 0.]]);

        let restored = normalizer.denormalize(normalized.view(), &stats).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn global_mode_uses_scalars() {
        let data = array![[0., 2.], [2., 4.]];
        let stats = Normalizer::new(NormMode::GLOBAL).fit(data.view()).unwrap();

        assert_eq!(stats.mean, OneOrMany::One(2.));
        assert!(matches!(stats.std, OneOrMany::One(_)));
    }

    #[test]
    fn image_mode_scales_by_255() {
        let data = array![[255., 0.]];
        let normalizer = Normalizer::new(NormMode::IMAGE);
        let stats = normalizer.fit(data.view()).unwrap();

        let normalized = normalizer.normalize(data.view(), &stats).unwrap();
        assert_eq!(normalized, array![[1., 0.]]);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let data = array![[1.]];
        let result = Normalizer::new(NormMode(7)).fit(data.view());
        assert!(matches!(result, Err(ZooError::InvalidConfig(_))));
    }

    #[test]
    fn mismatched_statistics_are_rejected() {
        let data = array![[1., 2., 3.]];
        let stats = NormStats {
            mean: OneOrMany::Many(vec![0., 0.]),
            std: OneOrMany::One(1.),
        };

        let result = Normalizer::new(NormMode::PER_FEATURE).normalize(data.view(), &stats);
        assert!(matches!(result, Err(ZooError::InvalidConfig(_))));
    }
}
