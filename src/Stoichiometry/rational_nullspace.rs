//! Exact linear algebra over arbitrary precision rationals: reduced row echelon form, null space
//! basis and normalization of a rational vector to minimal integers.
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

pub type RationalMatrix = Vec<Vec<BigRational>>;

pub fn from_integer_rows(rows: &[Vec<i64>]) -> RationalMatrix {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|x| BigRational::from_integer(BigInt::from(*x)))
                .collect()
        })
        .collect()
}

/// Brings `m` to reduced row echelon form in place and returns the pivot columns in order.
pub fn rref(m: &mut RationalMatrix) -> Vec<usize> {
    let n_rows = m.len();
    let n_cols = m.first().map_or(0, |row| row.len());
    let mut pivots = Vec::new();
    let mut r = 0;
    for c in 0..n_cols {
        if r >= n_rows {
            break;
        }
        let Some(p) = (r..n_rows).find(|&i| !m[i][c].is_zero()) else {
            continue;
        };
        m.swap(r, p);
        let pivot = m[r][c].clone();
        for x in m[r].iter_mut() {
            *x = &*x / &pivot;
        }
        let pivot_row = m[r].clone();
        for (i, row) in m.iter_mut().enumerate() {
            if i == r || row[c].is_zero() {
                continue;
            }
            let factor = row[c].clone();
            for (x, p) in row.iter_mut().zip(&pivot_row) {
                *x -= &factor * p;
            }
        }
        pivots.push(c);
        r += 1;
    }
    pivots
}

/// Basis of {v : m v = 0}, one vector per free column of the echelon form.
/// The free variable of each vector is 1, the other free variables 0.
pub fn nullspace(m: &RationalMatrix, n_cols: usize) -> Vec<Vec<BigRational>> {
    let mut reduced = m.clone();
    let pivots = rref(&mut reduced);
    (0..n_cols)
        .filter(|c| !pivots.contains(c))
        .map(|free| {
            let mut v = vec![BigRational::zero(); n_cols];
            v[free] = BigRational::one();
            for (row, &p) in pivots.iter().enumerate() {
                v[p] = -reduced[row][free].clone();
            }
            v
        })
        .collect()
}

/// Scales by the lcm of the denominators and normalizes the result.
pub fn to_minimal_integers(v: &[BigRational]) -> Vec<BigInt> {
    let lcm = v
        .iter()
        .fold(BigInt::one(), |acc, x| acc.lcm(x.denom()));
    let scaled: Vec<BigInt> = v
        .iter()
        .map(|x| (x * BigRational::from_integer(lcm.clone())).to_integer())
        .collect();
    normalize_integers(scaled)
}

/// Divides by the gcd of the entries and flips the sign when no entry is positive.
/// The zero vector is returned as is.
pub fn normalize_integers(v: Vec<BigInt>) -> Vec<BigInt> {
    let gcd = v.iter().fold(BigInt::zero(), |acc, x| acc.gcd(x));
    if gcd.is_zero() {
        return v;
    }
    let mut ints: Vec<BigInt> = v.into_iter().map(|x| x / &gcd).collect();
    if ints.iter().all(|x| !x.is_positive()) {
        ints = ints.into_iter().map(|x| -x).collect();
    }
    ints
}
