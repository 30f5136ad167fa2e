use lotguard_core::{LotError, LotResult, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Which original rows ended up in each partition, in partition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Result of [`train_test_split`].
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Tensor<f64>,
    pub x_test: Tensor<f64>,
    pub y_train: Tensor<f64>,
    pub y_test: Tensor<f64>,
    pub indices: SplitIndices,
}

/// Shuffle rows with a seeded RNG and hold out `round(n * test_ratio)` of them.
pub fn train_test_split(
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    test_ratio: f64,
    seed: u64,
) -> LotResult<Split> {
    let n = x.nrows();
    if n != y.numel() {
        return Err(LotError::schema(format!(
            "feature rows ({n}) and labels ({}) differ in length",
            y.numel()
        )));
    }
    if !(0.0..1.0).contains(&test_ratio) {
        return Err(LotError::schema(format!("test ratio {test_ratio} must be in [0, 1)")));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let test_size = (n as f64 * test_ratio).round() as usize;
    let train_size = n - test_size;
    let indices = SplitIndices {
        train: order[..train_size].to_vec(),
        test: order[train_size..].to_vec(),
    };

    Ok(Split {
        x_train: x.select_rows(&indices.train)?,
        x_test: x.select_rows(&indices.test)?,
        y_train: y.select_rows(&indices.train)?,
        y_test: y.select_rows(&indices.test)?,
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Tensor<f64>, Tensor<f64>) {
        let x = Tensor::from_vec2d(&[
            vec![1.0, 2.0],
            vec![3.0, 4.0],
            vec![5.0, 6.0],
            vec![7.0, 8.0],
            vec![9.0, 10.0],
        ])
        .unwrap();
        let y = Tensor::from_slice(&[0.0, 1.0, 0.0, 1.0, 0.0]);
        (x, y)
    }

    #[test]
    fn test_train_test_split() {
        let (x, y) = data();
        let split = train_test_split(&x, &y, 0.4, 42).unwrap();

        assert_eq!(split.x_train.nrows(), 3);
        assert_eq!(split.x_test.nrows(), 2);
        assert_eq!(split.y_train.numel(), 3);
        assert_eq!(split.y_test.numel(), 2);

        // each partition row is the original row it claims to be
        for (pos, &orig) in split.indices.train.iter().enumerate() {
            assert_eq!(split.x_train.row(pos).unwrap(), x.row(orig).unwrap());
            assert_eq!(split.y_train.data()[pos], y.data()[orig]);
        }
    }

    #[test]
    fn test_split_is_reproducible() {
        let (x, y) = data();
        let a = train_test_split(&x, &y, 0.4, 42).unwrap();
        let b = train_test_split(&x, &y, 0.4, 42).unwrap();
        assert_eq!(a.indices, b.indices);
    }

    #[test]
    fn test_split_length_mismatch() {
        let (x, _) = data();
        let y = Tensor::from_slice(&[0.0, 1.0]);
        assert!(train_test_split(&x, &y, 0.3, 42).unwrap_err().is_schema());
    }
}
