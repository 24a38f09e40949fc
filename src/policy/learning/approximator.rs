//! State to action-value regressors.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Regression target for a single chosen action.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub state: Vec<f64>,
    pub action: usize,
    pub target: f64,
}

/// Maps a state vector to one value per discrete action.
pub trait ValueApproximator {
    /// Predicted value of every action in `state`.
    fn predict(&self, state: &[f64]) -> Vec<f64>;

    /// One gradient step on the mean squared error of the chosen actions.
    ///
    /// The per-example error is clipped to `±td_clip` before it is
    /// back-propagated. Returns the unclipped mean squared error measured
    /// before the update.
    fn update(&mut self, batch: &[TrainingExample], learning_rate: f64, td_clip: f64) -> f64;
}

/// Fully connected layer, `weights[out][in]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Dense {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl Dense {
    fn zeros(inputs: usize, outputs: usize) -> Self {
        Self {
            weights: vec![vec![0.0; inputs]; outputs],
            bias: vec![0.0; outputs],
        }
    }

    /// He-normal weights, zero bias.
    fn he<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let std_dev = (2.0 / inputs.max(1) as f64).sqrt();
        let weights = match Normal::new(0.0, std_dev) {
            Ok(normal) => (0..outputs)
                .map(|_| (0..inputs).map(|_| normal.sample(rng)).collect())
                .collect(),
            Err(_) => vec![vec![0.0; inputs]; outputs],
        };
        Self {
            weights,
            bias: vec![0.0; outputs],
        }
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }

    fn apply(&mut self, grad: &Dense, learning_rate: f64) {
        for (row, g_row) in self.weights.iter_mut().zip(&grad.weights) {
            for (w, g) in row.iter_mut().zip(g_row) {
                *w -= learning_rate * g;
            }
        }
        for (b, g) in self.bias.iter_mut().zip(&grad.bias) {
            *b -= learning_rate * g;
        }
    }

    fn outputs(&self) -> usize {
        self.bias.len()
    }

    fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }
}

fn clipped_error(prediction: f64, target: f64, td_clip: f64) -> (f64, f64) {
    let raw = prediction - target;
    (raw, raw.clamp(-td_clip, td_clip))
}

/// One linear map per action, initialised to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    layer: Dense,
}

impl LinearModel {
    pub fn new(state_dim: usize, actions: usize) -> Self {
        Self {
            layer: Dense::zeros(state_dim, actions),
        }
    }
}

impl ValueApproximator for LinearModel {
    fn predict(&self, state: &[f64]) -> Vec<f64> {
        self.layer.forward(state)
    }

    fn update(&mut self, batch: &[TrainingExample], learning_rate: f64, td_clip: f64) -> f64 {
        if batch.is_empty() {
            return 0.0;
        }
        let n = batch.len() as f64;
        let mut grad = Dense::zeros(self.layer.inputs(), self.layer.outputs());
        let mut loss = 0.0;

        for ex in batch {
            let Some(row) = self.layer.weights.get(ex.action) else {
                continue;
            };
            let q = row.iter().zip(&ex.state).map(|(w, x)| w * x).sum::<f64>()
                + self.layer.bias[ex.action];
            let (raw, err) = clipped_error(q, ex.target, td_clip);
            loss += raw * raw;
            for (g, x) in grad.weights[ex.action].iter_mut().zip(&ex.state) {
                *g += err * x / n;
            }
            grad.bias[ex.action] += err / n;
        }

        self.layer.apply(&grad, learning_rate);
        loss / n
    }
}

/// Multi-layer perceptron with ReLU hidden layers and a linear output layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    layers: Vec<Dense>,
}

impl Mlp {
    /// Builds `state_dim -> hidden[0] -> ... -> actions` with He-normal weights.
    pub fn new<R: Rng + ?Sized>(
        state_dim: usize,
        hidden: &[usize],
        actions: usize,
        rng: &mut R,
    ) -> Self {
        let mut widths = Vec::with_capacity(hidden.len() + 2);
        widths.push(state_dim);
        widths.extend_from_slice(hidden);
        widths.push(actions);
        let layers = widths
            .windows(2)
            .map(|w| Dense::he(w[0], w[1], rng))
            .collect();
        Self { layers }
    }

    /// Activations of every layer, input first. Hidden layers are post-ReLU.
    fn activations(&self, state: &[f64]) -> Vec<Vec<f64>> {
        let mut acts = Vec::with_capacity(self.layers.len() + 1);
        acts.push(state.to_vec());
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            let mut z = layer.forward(&acts[i]);
            if i < last {
                z.iter_mut().for_each(|v| *v = v.max(0.0));
            }
            acts.push(z);
        }
        acts
    }
}

impl ValueApproximator for Mlp {
    fn predict(&self, state: &[f64]) -> Vec<f64> {
        self.activations(state).pop().unwrap_or_default()
    }

    fn update(&mut self, batch: &[TrainingExample], learning_rate: f64, td_clip: f64) -> f64 {
        if batch.is_empty() || self.layers.is_empty() {
            return 0.0;
        }
        let n = batch.len() as f64;
        let mut grads: Vec<Dense> = self
            .layers
            .iter()
            .map(|l| Dense::zeros(l.inputs(), l.outputs()))
            .collect();
        let mut loss = 0.0;

        for ex in batch {
            let acts = self.activations(&ex.state);
            let Some(&q) = acts.last().and_then(|out| out.get(ex.action)) else {
                continue;
            };
            let (raw, err) = clipped_error(q, ex.target, td_clip);
            loss += raw * raw;

            let mut delta = vec![0.0; self.layers[self.layers.len() - 1].outputs()];
            delta[ex.action] = err / n;

            for l in (0..self.layers.len()).rev() {
                let input = &acts[l];
                let g = &mut grads[l];
                for (j, d) in delta.iter().enumerate() {
                    if *d == 0.0 {
                        continue;
                    }
                    for (gw, x) in g.weights[j].iter_mut().zip(input) {
                        *gw += d * x;
                    }
                    g.bias[j] += d;
                }
                if l == 0 {
                    break;
                }
                // Propagate through the weights, then the ReLU of layer l-1.
                let layer = &self.layers[l];
                delta = (0..layer.inputs())
                    .map(|i| {
                        if input[i] <= 0.0 {
                            0.0
                        } else {
                            layer
                                .weights
                                .iter()
                                .zip(&delta)
                                .map(|(row, d)| row[i] * d)
                                .sum()
                        }
                    })
                    .collect();
            }
        }

        for (layer, grad) in self.layers.iter_mut().zip(&grads) {
            layer.apply(grad, learning_rate);
        }
        loss / n
    }
}

/// Serializable choice of regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Approximator {
    Linear(LinearModel),
    Mlp(Mlp),
}

impl ValueApproximator for Approximator {
    fn predict(&self, state: &[f64]) -> Vec<f64> {
        match self {
            Self::Linear(m) => m.predict(state),
            Self::Mlp(m) => m.predict(state),
        }
    }

    fn update(&mut self, batch: &[TrainingExample], learning_rate: f64, td_clip: f64) -> f64 {
        match self {
            Self::Linear(m) => m.update(batch, learning_rate, td_clip),
            Self::Mlp(m) => m.update(batch, learning_rate, td_clip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn example(state: Vec<f64>, action: usize, target: f64) -> TrainingExample {
        TrainingExample {
            state,
            action,
            target,
        }
    }

    #[test]
    fn linear_starts_at_zero() {
        let m = LinearModel::new(3, 4);
        assert_eq!(m.predict(&[1.0, 2.0, 3.0]), vec![0.0; 4]);
    }

    #[test]
    fn linear_fits_constant_target() {
        let mut m = LinearModel::new(2, 2);
        let batch = vec![example(vec![1.0, 0.5], 1, 0.8)];
        let mut last = f64::INFINITY;
        for _ in 0..200 {
            last = m.update(&batch, 0.1, 10.0);
        }
        assert!(last < 1e-6, "loss {last}");
        let q = m.predict(&[1.0, 0.5]);
        assert!((q[1] - 0.8).abs() < 1e-3);
        // untouched action stays at zero
        assert_eq!(q[0], 0.0);
    }

    #[test]
    fn loss_is_unclipped_mse() {
        let mut m = LinearModel::new(1, 1);
        let loss = m.update(&[example(vec![1.0], 0, 4.0)], 0.0, 1.0);
        assert_eq!(loss, 16.0);
    }

    #[test]
    fn mlp_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let m = Mlp::new(10, &[8, 4], 22, &mut rng);
        assert_eq!(m.predict(&[0.1; 10]).len(), 22);
    }

    #[test]
    fn mlp_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut m = Mlp::new(3, &[16], 2, &mut rng);
        let batch = vec![
            example(vec![1.0, 0.0, 0.5], 0, 1.0),
            example(vec![0.0, 1.0, 0.5], 1, -1.0),
        ];
        let first = m.update(&batch, 0.05, 10.0);
        let mut last = first;
        for _ in 0..300 {
            last = m.update(&batch, 0.05, 10.0);
        }
        assert!(last < first, "loss {first} -> {last}");
    }

    #[test]
    fn seeded_init_is_reproducible() {
        let a = Mlp::new(4, &[6], 3, &mut StdRng::seed_from_u64(9));
        let b = Mlp::new(4, &[6], 3, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn approximator_json_is_tagged() {
        let a = Approximator::Linear(LinearModel::new(1, 1));
        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains("\"kind\":\"linear\""));
        let back: Approximator = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}
