//! Pairwise correlation between resampled properties.

use std::collections::BTreeMap;

use serde::Serialize;

use super::resample::ResampledSeries;

/// Square matrix of Pearson coefficients, indexed like `labels`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// None where the series share fewer than two buckets or one of them is
    /// constant over the shared buckets
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        self.values[i][j]
    }
}

/// Correlate every pair of series over the bucket starts they share.
pub fn correlation_matrix(series: &[(&str, &ResampledSeries)]) -> CorrelationMatrix {
    let n = series.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(series[i].1, series[j].1);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        labels: series.iter().map(|(l, _)| l.to_string()).collect(),
        values,
    }
}

fn pearson(a: &ResampledSeries, b: &ResampledSeries) -> Option<f64> {
    let lookup: BTreeMap<i64, f64> = a.buckets().iter().map(|x| (x.start, x.mean)).collect();
    let pairs: Vec<(f64, f64)> = b
        .buckets()
        .iter()
        .filter_map(|y| lookup.get(&y.start).map(|x| (*x, y.mean)))
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}
