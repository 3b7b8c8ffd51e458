use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::matrix::Matrix;
use crate::error::NetworkError;

/// Values retained from the most recent forward pass for the following backward pass.
#[derive(Debug, Clone)]
struct ForwardCache {
    x: Matrix,
    z1: Matrix,
    a1: Matrix,
}

/// Two-layer Q-value regressor.
///
/// ```text
/// Input:  [batch, input_size]
/// Z1 = X·W1 + b1        [batch, hidden_size]
/// A1 = relu(Z1)
/// Z2 = A1·W2 + b2       [batch, output_size]  (raw Q-values, one per action)
/// ```
///
/// Trained by plain gradient descent on the mean squared error between
/// predicted and target Q-rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QNetwork {
    w1: Matrix,
    b1: Vec<f32>,
    w2: Matrix,
    b2: Vec<f32>,
    #[serde(skip)]
    cache: Option<ForwardCache>,
}

/// Read-only view of the network parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters<'a> {
    pub w1: &'a Matrix,
    pub b1: &'a [f32],
    pub w2: &'a Matrix,
    pub b2: &'a [f32],
}

impl QNetwork {
    /// He-initialised network: weights ~ N(0, sqrt(2 / fan_in)), zero biases.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        rng: &mut R,
    ) -> Self {
        QNetwork {
            w1: he_matrix(input_size, hidden_size, rng),
            b1: vec![0.0; hidden_size],
            w2: he_matrix(hidden_size, output_size, rng),
            b2: vec![0.0; output_size],
            cache: None,
        }
    }

    /// Build a network from explicit parameters.
    pub fn from_parameters(w1: Matrix, b1: Vec<f32>, w2: Matrix, b2: Vec<f32>) -> Self {
        assert_eq!(w1.cols(), b1.len(), "b1 must match hidden width");
        assert_eq!(w1.cols(), w2.rows(), "w2 rows must match hidden width");
        assert_eq!(w2.cols(), b2.len(), "b2 must match output width");
        QNetwork {
            w1,
            b1,
            w2,
            b2,
            cache: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.w1.rows()
    }

    pub fn hidden_size(&self) -> usize {
        self.w1.cols()
    }

    pub fn output_size(&self) -> usize {
        self.w2.cols()
    }

    pub fn parameters(&self) -> Parameters<'_> {
        Parameters {
            w1: &self.w1,
            b1: &self.b1,
            w2: &self.w2,
            b2: &self.b2,
        }
    }

    /// Independent copy of the parameters with no forward cache.
    pub fn snapshot(&self) -> QNetwork {
        QNetwork {
            w1: self.w1.clone(),
            b1: self.b1.clone(),
            w2: self.w2.clone(),
            b2: self.b2.clone(),
            cache: None,
        }
    }

    /// Forward pass over a batch of encoded states, one row per example.
    ///
    /// Overwrites the activation cache used by [`QNetwork::backward`].
    pub fn forward(&mut self, x: &Matrix) -> Result<Matrix, NetworkError> {
        if x.cols() != self.input_size() {
            return Err(NetworkError::InputWidth {
                expected: self.input_size(),
                actual: x.cols(),
            });
        }

        let mut z1 = x.dot(&self.w1);
        z1.add_row(&self.b1);
        let a1 = z1.map(relu);
        let mut z2 = a1.dot(&self.w2);
        z2.add_row(&self.b2);

        self.cache = Some(ForwardCache {
            x: x.clone(),
            z1,
            a1,
        });
        Ok(z2)
    }

    /// One gradient-descent step on MSE(q_predicted, q_target).
    ///
    /// Precondition: both batches are row-aligned with the immediately
    /// preceding [`QNetwork::forward`] call. The cache is consumed, so a
    /// second `backward` without a new `forward` fails with
    /// [`NetworkError::StaleCache`]. Returns the loss before the update.
    pub fn backward(
        &mut self,
        q_predicted: &Matrix,
        q_target: &Matrix,
        learning_rate: f32,
    ) -> Result<f32, NetworkError> {
        let cache = self.cache.take().ok_or(NetworkError::StaleCache)?;
        let expected = (cache.x.rows(), self.output_size());
        for (what, m) in [("q_predicted", q_predicted), ("q_target", q_target)] {
            if m.shape() != expected {
                return Err(NetworkError::ShapeMismatch {
                    what,
                    expected,
                    actual: m.shape(),
                });
            }
        }

        let m = q_predicted.rows() as f32;
        let dz2 = q_predicted.sub(q_target);
        let loss = dz2.mean_square();

        let mut dw2 = cache.a1.t_dot(&dz2);
        dw2.scale(1.0 / m);
        let db2: Vec<f32> = dz2.col_sums().into_iter().map(|s| s / m).collect();

        let da1 = dz2.dot_t(&self.w2);
        let mut dz1 = da1;
        for r in 0..dz1.rows() {
            for c in 0..dz1.cols() {
                if cache.z1.get(r, c) <= 0.0 {
                    dz1.set(r, c, 0.0);
                }
            }
        }

        let mut dw1 = cache.x.t_dot(&dz1);
        dw1.scale(1.0 / m);
        let db1: Vec<f32> = dz1.col_sums().into_iter().map(|s| s / m).collect();

        self.w2.descend(&dw2, learning_rate);
        descend_vec(&mut self.b2, &db2, learning_rate);
        self.w1.descend(&dw1, learning_rate);
        descend_vec(&mut self.b1, &db1, learning_rate);

        Ok(loss)
    }
}

fn relu(v: f32) -> f32 {
    v.max(0.0)
}

fn descend_vec(param: &mut [f32], grad: &[f32], rate: f32) {
    for (p, g) in param.iter_mut().zip(grad) {
        *p -= rate * g;
    }
}

fn he_matrix<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Matrix {
    let scale = (2.0 / fan_in.max(1) as f32).sqrt();
    let data = (0..fan_in * fan_out)
        .map(|_| {
            let z: f32 = StandardNormal.sample(rng);
            z * scale
        })
        .collect();
    Matrix::from_vec(fan_in, fan_out, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded(input: usize, hidden: usize, output: usize) -> QNetwork {
        let mut rng = StdRng::seed_from_u64(7);
        QNetwork::new(input, hidden, output, &mut rng)
    }

    #[test]
    fn test_output_shape() {
        let mut net = seeded(9, 16, 9);
        let x = Matrix::zeros(4, 9);
        let q = net.forward(&x).unwrap();
        assert_eq!(q.shape(), (4, 9));
    }

    #[test]
    fn test_initialisation_scale() {
        let net = seeded(64, 256, 4);
        let w1 = net.parameters().w1.as_slice();
        let var = w1.iter().map(|w| w * w).sum::<f32>() / w1.len() as f32;
        // He variance for fan_in = 64 is 2/64.
        assert!((var - 2.0 / 64.0).abs() < 0.005, "variance {var}");
        assert!(net.parameters().b1.iter().all(|&b| b == 0.0));
        assert!(net.parameters().b2.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_forward_matches_hand_computation() {
        // 1 -> 2 -> 1 with one negative hidden pre-activation.
        let mut net = QNetwork::from_parameters(
            Matrix::from_vec(1, 2, vec![1.0, -1.0]),
            vec![0.5, 0.0],
            Matrix::from_vec(2, 1, vec![2.0, 3.0]),
            vec![0.25],
        );
        let q = net.forward(&Matrix::from_vec(1, 1, vec![2.0])).unwrap();
        // z1 = [2.5, -2.0], a1 = [2.5, 0], z2 = 5.0 + 0.25
        assert!((q.get(0, 0) - 5.25).abs() < 1e-6);
    }

    #[test]
    fn test_forward_rejects_wrong_width() {
        let mut net = seeded(3, 4, 2);
        let err = net.forward(&Matrix::zeros(1, 5)).unwrap_err();
        assert_eq!(
            err,
            NetworkError::InputWidth {
                expected: 3,
                actual: 5
            }
        );
    }

    #[test]
    fn test_backward_without_forward_fails() {
        let mut net = seeded(2, 4, 2);
        let q = Matrix::zeros(1, 2);
        assert_eq!(net.backward(&q, &q, 0.1), Err(NetworkError::StaleCache));
    }

    #[test]
    fn test_backward_consumes_cache() {
        let mut net = seeded(2, 4, 2);
        let x = Matrix::from_vec(1, 2, vec![1.0, 0.5]);
        let q = net.forward(&x).unwrap();
        net.backward(&q, &q, 0.1).unwrap();
        assert_eq!(net.backward(&q, &q, 0.1), Err(NetworkError::StaleCache));
    }

    #[test]
    fn test_backward_rejects_misaligned_batch() {
        let mut net = seeded(2, 4, 2);
        net.forward(&Matrix::zeros(3, 2)).unwrap();
        let q = Matrix::zeros(2, 2);
        assert!(matches!(
            net.backward(&q, &q, 0.1),
            Err(NetworkError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_error_leaves_parameters_unchanged() {
        let mut net = seeded(3, 8, 3);
        let before = net.snapshot();
        let x = Matrix::from_vec(2, 3, vec![1.0, 0.0, -1.0, 0.5, 0.5, 0.5]);
        let q = net.forward(&x).unwrap();
        let loss = net.backward(&q, &q, 0.5).unwrap();
        assert_eq!(loss, 0.0);
        assert_eq!(net.parameters(), before.parameters());
    }

    #[test]
    fn test_gradient_matches_hand_computation() {
        let mut net = QNetwork::from_parameters(
            Matrix::from_vec(1, 2, vec![1.0, -1.0]),
            vec![0.0, 0.0],
            Matrix::from_vec(2, 1, vec![2.0, 3.0]),
            vec![0.0],
        );
        let x = Matrix::from_vec(1, 1, vec![1.0]);
        let q = net.forward(&x).unwrap(); // z1 = [1, -1], a1 = [1, 0], q = 2
        let target = Matrix::from_vec(1, 1, vec![1.0]);
        net.backward(&q, &target, 0.1).unwrap();

        // dz2 = 1; dW2 = a1ᵗ·dz2 = [1, 0]; db2 = 1
        // dA1 = dz2·W2ᵗ = [2, 3]; masked by z1 > 0 -> [2, 0]
        // dW1 = xᵗ·dz1 = [2, 0]; db1 = [2, 0]
        let p = net.parameters();
        assert!((p.w2.get(0, 0) - 1.9).abs() < 1e-6);
        assert!((p.w2.get(1, 0) - 3.0).abs() < 1e-6);
        assert!((p.b2[0] + 0.1).abs() < 1e-6);
        assert!((p.w1.get(0, 0) - 0.8).abs() < 1e-6);
        assert!((p.w1.get(0, 1) + 1.0).abs() < 1e-6);
        assert!((p.b1[0] + 0.2).abs() < 1e-6);
        assert_eq!(p.b1[1], 0.0);
    }

    #[test]
    fn test_loss_decreases_on_fixed_example() {
        let mut net = seeded(2, 8, 3);
        let x = Matrix::from_vec(1, 2, vec![1.0, 0.5]);
        let target = Matrix::from_vec(1, 3, vec![1.0, -1.0, 0.5]);

        let mut losses = Vec::new();
        for _ in 0..200 {
            let q = net.forward(&x).unwrap();
            losses.push(net.backward(&q, &target, 0.01).unwrap());
        }
        for pair in losses.windows(2) {
            assert!(pair[1] < pair[0], "loss went from {} to {}", pair[0], pair[1]);
        }
        assert!(losses[199] < losses[0] * 0.5);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut net = seeded(2, 4, 2);
        let frozen = net.snapshot();
        let x = Matrix::from_vec(1, 2, vec![1.0, 1.0]);
        let q = net.forward(&x).unwrap();
        let target = q.map(|v| v + 1.0);
        net.backward(&q, &target, 0.1).unwrap();
        assert_ne!(net.parameters(), frozen.parameters());
    }

    #[test]
    fn test_serde_roundtrip_drops_cache() {
        let mut net = seeded(2, 3, 2);
        net.forward(&Matrix::zeros(1, 2)).unwrap();
        let json = serde_json::to_string(&net).unwrap();
        let mut restored: QNetwork = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.parameters(), net.parameters());
        let q = Matrix::zeros(1, 2);
        assert_eq!(restored.backward(&q, &q, 0.1), Err(NetworkError::StaleCache));
    }
}
