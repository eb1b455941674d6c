//! Dense linear algebra for the small (q ≤ ~16) Gram systems that show up
//! in the leaf solver and the split finder. No external linalg crate: the
//! teacher doesn't depend on one, and a q×q Cholesky is a few dozen lines.

/// Minimum regularisation enforced regardless of the caller-supplied λ, so
/// a zero-regularisation request still yields a well-posed solve.
pub const MIN_LAMBDA: f64 = 1e-12;

/// Row-major symmetric q×q matrix, accumulated as a Gram matrix Σ zᵢzᵢᵀ.
#[derive(Debug, Clone)]
pub struct GramMatrix {
    data: Vec<f64>,
    q: usize,
}

impl GramMatrix {
    pub fn zeros(q: usize) -> Self {
        Self {
            data: vec![0.0; q * q],
            q,
        }
    }

    pub fn q(&self) -> usize {
        self.q
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.q + c]
    }

    #[inline]
    fn set(&mut self, r: usize, c: usize, v: f64) {
        self.data[r * self.q + c] = v;
    }

    /// Adds `z * zᵀ` in place.
    pub fn add_outer(&mut self, z: &[f64]) {
        for r in 0..self.q {
            let zr = z[r];
            if zr == 0.0 {
                continue;
            }
            for c in 0..self.q {
                let v = self.get(r, c) + zr * z[c];
                self.set(r, c, v);
            }
        }
    }

    pub fn add_assign(&mut self, other: &GramMatrix) {
        for i in 0..self.data.len() {
            self.data[i] += other.data[i];
        }
    }

    pub fn sub_assign(&mut self, other: &GramMatrix) {
        for i in 0..self.data.len() {
            self.data[i] -= other.data[i];
        }
    }

    pub fn clone_into(&self, dst: &mut GramMatrix) {
        dst.data.copy_from_slice(&self.data);
    }
}

/// Solves `(H + λI)β = g` via Cholesky decomposition.
///
/// Returns `(β, singular)`. `singular` is set, and `β` is the zero vector,
/// when a pivot collapses to (numerically) zero even after regularisation —
/// the caller turns this into a no-op leaf rather than surfacing a
/// [`crate::errors::BoostError`].
pub fn solve_regularized(h: &GramMatrix, g: &[f64], lambda: f64) -> (Vec<f64>, bool) {
    let q = h.q();
    let lambda = lambda.max(MIN_LAMBDA);

    let mut a = vec![0.0; q * q];
    for r in 0..q {
        for c in 0..q {
            a[r * q + c] = h.get(r, c) + if r == c { lambda } else { 0.0 };
        }
    }

    match cholesky(&mut a, q) {
        Some(l) => {
            let beta = cholesky_solve(&l, q, g);
            (beta, false)
        }
        None => (vec![0.0; q], true),
    }
}

/// In-place lower-triangular Cholesky factor of a symmetric q×q matrix
/// stored row-major in `a`. Returns `None` if a pivot is non-positive.
fn cholesky(a: &mut [f64], q: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0; q * q];
    for i in 0..q {
        for j in 0..=i {
            let mut sum = a[i * q + j];
            for k in 0..j {
                sum -= l[i * q + k] * l[j * q + k];
            }
            if i == j {
                if sum <= 1e-300 {
                    return None;
                }
                l[i * q + j] = sum.sqrt();
            } else {
                l[i * q + j] = sum / l[j * q + j];
            }
        }
    }
    Some(l)
}

fn cholesky_solve(l: &[f64], q: usize, g: &[f64]) -> Vec<f64> {
    // Forward solve L y = g
    let mut y = vec![0.0; q];
    for i in 0..q {
        let mut sum = g[i];
        for k in 0..i {
            sum -= l[i * q + k] * y[k];
        }
        y[i] = sum / l[i * q + i];
    }
    // Back solve Lᵀ β = y
    let mut beta = vec![0.0; q];
    for i in (0..q).rev() {
        let mut sum = y[i];
        for k in (i + 1)..q {
            sum -= l[k * q + i] * beta[k];
        }
        beta[i] = sum / l[i * q + i];
    }
    beta
}

/// `gᵀ(H+λI)⁻¹g / 2` — the split-scoring quality function.
pub fn gain_of(h: &GramMatrix, g: &[f64], lambda: f64) -> f64 {
    let (beta, singular) = solve_regularized(h, g, lambda);
    if singular {
        return 0.0;
    }
    0.5 * dot(g, &beta)
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
