//! Tree ensemble model - prediction and TreeSHAP attribution
//!
//! Each tree mirrors the flat node arrays of a fitted decision tree:
//! `children_left[i] == -1` marks node `i` as a leaf, samples go left when
//! `x[feature[i]] <= threshold[i]`, and `cover[i]` is the training weight
//! that reached node `i`. Gradient boosting exports sum their trees onto a
//! base score; random forest exports average them.

use std::path::Path;

use serde::Deserialize;

use super::{check_layout, read_artifact, ModelError, PredictionError};

/// Relative tolerance when checking that child covers add up to the parent
const COVER_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Output is a log-odds margin
    BinaryLogistic,
    /// Output is the predicted value
    Regression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Mean,
}

// ============================================================================
// SINGLE TREE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<f64>,
    cover: Vec<f64>,
}

impl Tree {
    fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] < 0
    }

    fn left(&self, node: usize) -> usize {
        self.children_left[node] as usize
    }

    fn right(&self, node: usize) -> usize {
        self.children_right[node] as usize
    }

    fn split_feature(&self, node: usize) -> usize {
        self.feature[node] as usize
    }

    /// Child followed by `x` at an internal node
    fn goes_left(&self, node: usize, x: &[f64]) -> bool {
        x[self.split_feature(node)] <= self.threshold[node]
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        let n = self.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        let lengths = [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
            self.cover.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(format!("node arrays disagree in length ({} nodes)", n));
        }

        for node in 0..n {
            if !(self.cover[node] > 0.0) {
                return Err(format!("node {} has non-positive cover", node));
            }
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left < 0 || right < 0 {
                if left >= 0 || right >= 0 {
                    return Err(format!("node {} has exactly one child", node));
                }
                if !self.value[node].is_finite() {
                    return Err(format!("leaf {} has a non-finite value", node));
                }
                continue;
            }
            // children always come after their parent, which rules out cycles
            for child in [left, right] {
                if child as usize <= node || child as usize >= n {
                    return Err(format!("node {} has out-of-order child {}", node, child));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {} splits on unknown feature {}", node, feature));
            }
            let children = self.cover[left as usize] + self.cover[right as usize];
            if (children - self.cover[node]).abs() > COVER_TOLERANCE * self.cover[node] {
                return Err(format!("node {} cover does not match its children", node));
            }
        }
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> f64 {
        let mut node = 0;
        while !self.is_leaf(node) {
            node = if self.goes_left(node, x) { self.left(node) } else { self.right(node) };
        }
        self.value[node]
    }

    /// Cover-weighted mean of the leaf values
    fn expected_value(&self, node: usize) -> f64 {
        if self.is_leaf(node) {
            return self.value[node];
        }
        let (left, right) = (self.left(node), self.right(node));
        (self.cover[left] * self.expected_value(left) + self.cover[right] * self.expected_value(right))
            / self.cover[node]
    }

    /// Add this tree's SHAP values, multiplied by `weight`, into `phi`
    fn shap_values(&self, x: &[f64], weight: f64, phi: &mut [f64]) {
        let path = Vec::with_capacity(16);
        self.shap_recurse(0, x, weight, phi, path, 1.0, 1.0, None);
    }

    #[allow(clippy::too_many_arguments)]
    fn shap_recurse(
        &self,
        node: usize,
        x: &[f64],
        weight: f64,
        phi: &mut [f64],
        mut path: Vec<PathElement>,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        if self.is_leaf(node) {
            let depth = path.len() - 1;
            for i in 1..=depth {
                let element = path[i];
                if let Some(f) = element.feature {
                    let w = unwound_path_sum(&path, i);
                    phi[f] += w * (element.one_fraction - element.zero_fraction) * self.value[node] * weight;
                }
            }
            return;
        }

        let split = self.split_feature(node);
        let (hot, cold) = if self.goes_left(node, x) {
            (self.left(node), self.right(node))
        } else {
            (self.right(node), self.left(node))
        };

        // a feature seen higher up the path is merged, not counted twice
        let mut incoming_zero = 1.0;
        let mut incoming_one = 1.0;
        if let Some(k) = path.iter().position(|e| e.feature == Some(split)) {
            incoming_zero = path[k].zero_fraction;
            incoming_one = path[k].one_fraction;
            unwind_path(&mut path, k);
        }

        let hot_zero = self.cover[hot] / self.cover[node];
        let cold_zero = self.cover[cold] / self.cover[node];

        self.shap_recurse(hot, x, weight, phi, path.clone(), hot_zero * incoming_zero, incoming_one, Some(split));
        self.shap_recurse(cold, x, weight, phi, path, cold_zero * incoming_zero, 0.0, Some(split));
    }
}

// ============================================================================
// TREESHAP PATH BOOKKEEPING
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero_fraction * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with element `index` removed
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * (depth - i) as f64 / denom;
        } else {
            total += path[i].pweight / zero_fraction / ((depth - i) as f64 / denom);
        }
    }
    total
}

// ============================================================================
// ENSEMBLE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    n_features: usize,
    objective: Objective,
    aggregation: Aggregation,
    #[serde(default)]
    base_score: f64,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Load and check an ensemble exported to JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let ensemble: Self = read_artifact(path.as_ref())?;
        ensemble.validate()?;
        Ok(ensemble)
    }

    /// Build from an in-memory JSON document
    pub fn from_value(value: serde_json::Value) -> Result<Self, ModelError> {
        let ensemble: Self = serde_json::from_value(value)
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        ensemble.validate()?;
        Ok(ensemble)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Malformed("ensemble has no trees".to_string()));
        }
        if !self.base_score.is_finite() {
            return Err(ModelError::Malformed("base_score is not finite".to_string()));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.n_features {
                return Err(ModelError::Malformed(format!(
                    "{} feature names for {} features",
                    names.len(),
                    self.n_features
                )));
            }
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| ModelError::Malformed(format!("tree {}: {}", i, e)))?;
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Reject artifacts trained on a different layout
    pub fn check_layout(&self, expected: &[&str]) -> Result<(), ModelError> {
        if self.n_features != expected.len() {
            return Err(ModelError::Malformed(format!(
                "model expects {} features, layout has {}",
                self.n_features,
                expected.len()
            )));
        }
        check_layout(expected, self.feature_names())
    }

    fn tree_weight(&self) -> f64 {
        match self.aggregation {
            Aggregation::Sum => 1.0,
            Aggregation::Mean => 1.0 / self.trees.len() as f64,
        }
    }

    fn check_input(&self, x: &[f64]) -> Result<(), PredictionError> {
        if x.len() != self.n_features {
            return Err(PredictionError::FeatureCount {
                expected: self.n_features,
                actual: x.len(),
            });
        }
        Ok(())
    }

    /// Raw ensemble output: a log-odds margin or a regression value
    pub fn predict(&self, x: &[f64]) -> Result<f64, PredictionError> {
        self.check_input(x)?;
        let total: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        let output = self.base_score + total * self.tree_weight();
        if !output.is_finite() {
            return Err(PredictionError::NonFiniteOutput);
        }
        Ok(output)
    }

    /// Mean output over the training distribution, as seen by the covers
    pub fn expected_value(&self) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.expected_value(0)).sum();
        self.base_score + total * self.tree_weight()
    }

    /// Path-dependent TreeSHAP: one contribution per feature, summing with
    /// [`expected_value`](Self::expected_value) to [`predict`](Self::predict)
    pub fn shap_values(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError> {
        self.check_input(x)?;
        let weight = self.tree_weight();
        let mut phi = vec![0.0; self.n_features];
        for tree in &self.trees {
            tree.shap_values(x, weight, &mut phi);
        }
        if phi.iter().any(|v| !v.is_finite()) {
            return Err(PredictionError::NonFiniteOutput);
        }
        Ok(phi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Three features, with f0 split twice on one path
    fn sample_tree() -> serde_json::Value {
        json!({
            "children_left":  [1, 3, 5, -1, 7, -1, -1, -1, -1],
            "children_right": [2, 4, 6, -1, 8, -1, -1, -1, -1],
            "feature":        [0, 1, 0, -2, 2, -2, -2, -2, -2],
            "threshold":      [0.5, 0.5, 1.5, -2.0, 0.5, -2.0, -2.0, -2.0, -2.0],
            "value":          [0.0, 0.0, 0.0, 1.0, 0.0, 3.0, -2.0, 0.5, 4.0],
            "cover":          [10.0, 6.0, 4.0, 2.0, 4.0, 3.0, 1.0, 1.0, 3.0]
        })
    }

    fn stump(feature: i64, left: f64, right: f64) -> serde_json::Value {
        json!({
            "children_left":  [1, -1, -1],
            "children_right": [2, -1, -1],
            "feature":        [feature, -2, -2],
            "threshold":      [0.5, -2.0, -2.0],
            "value":          [0.0, left, right],
            "cover":          [4.0, 1.0, 3.0]
        })
    }

    fn ensemble(aggregation: &str, base_score: f64, trees: Vec<serde_json::Value>) -> TreeEnsemble {
        TreeEnsemble::from_value(json!({
            "feature_names": ["a", "b", "c"],
            "n_features": 3,
            "objective": "regression",
            "aggregation": aggregation,
            "base_score": base_score,
            "trees": trees
        }))
        .unwrap()
    }

    /// E[f(x) | x_S] following the covers for features outside S
    fn conditional(tree: &Tree, node: usize, x: &[f64], subset: u32) -> f64 {
        if tree.is_leaf(node) {
            return tree.value[node];
        }
        let f = tree.split_feature(node);
        let (l, r) = (tree.left(node), tree.right(node));
        if subset & (1 << f) != 0 {
            let next = if tree.goes_left(node, x) { l } else { r };
            conditional(tree, next, x, subset)
        } else {
            (tree.cover[l] * conditional(tree, l, x, subset) + tree.cover[r] * conditional(tree, r, x, subset))
                / tree.cover[node]
        }
    }

    fn factorial(n: u32) -> f64 {
        (1..=n).map(f64::from).product()
    }

    /// Exact Shapley values by enumerating every feature subset
    fn brute_force_shap(tree: &Tree, x: &[f64], n: u32) -> Vec<f64> {
        let mut phi = vec![0.0; n as usize];
        for i in 0..n {
            for subset in 0..(1u32 << n) {
                if subset & (1 << i) != 0 {
                    continue;
                }
                let size = subset.count_ones();
                let weight = factorial(size) * factorial(n - size - 1) / factorial(n);
                let with = conditional(tree, 0, x, subset | (1 << i));
                let without = conditional(tree, 0, x, subset);
                phi[i as usize] += weight * (with - without);
            }
        }
        phi
    }

    #[test]
    fn test_predict_follows_thresholds() {
        let model = ensemble("sum", 0.0, vec![sample_tree()]);
        assert_eq!(model.predict(&[0.0, 0.0, 0.0]).unwrap(), 1.0);
        assert_eq!(model.predict(&[0.0, 1.0, 0.0]).unwrap(), 0.5);
        assert_eq!(model.predict(&[0.0, 1.0, 1.0]).unwrap(), 4.0);
        assert_eq!(model.predict(&[1.0, 9.0, 9.0]).unwrap(), 3.0);
        assert_eq!(model.predict(&[2.0, 9.0, 9.0]).unwrap(), -2.0);
        // threshold is inclusive on the left
        assert_eq!(model.predict(&[0.5, 0.5, 0.5]).unwrap(), 0.5);
    }

    #[test]
    fn test_aggregation_and_base_score() {
        let summed = ensemble("sum", 1.0, vec![stump(0, 0.0, 2.0), stump(1, 4.0, 8.0)]);
        assert_eq!(summed.predict(&[1.0, 0.0, 0.0]).unwrap(), 1.0 + 2.0 + 4.0);

        let averaged = ensemble("mean", 0.0, vec![stump(0, 0.0, 2.0), stump(1, 4.0, 8.0)]);
        assert_eq!(averaged.predict(&[1.0, 0.0, 0.0]).unwrap(), 3.0);
    }

    #[test]
    fn test_stump_shap_by_hand() {
        let model = ensemble("sum", 0.0, vec![stump(0, 0.0, 1.0)]);
        // expected = (1 * 0 + 3 * 1) / 4
        assert!((model.expected_value() - 0.75).abs() < 1e-12);

        let phi = model.shap_values(&[1.0, 5.0, 5.0]).unwrap();
        assert!((phi[0] - 0.25).abs() < 1e-12);
        assert_eq!(phi[1], 0.0);
        assert_eq!(phi[2], 0.0);
    }

    #[test]
    fn test_shap_matches_brute_force() {
        let model = ensemble("sum", 0.0, vec![sample_tree()]);
        let tree = &model.trees[0];
        let points = [
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 1.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 1.0],
            [2.0, 1.0, 0.0],
            [0.5, 0.5, 0.5],
        ];

        for x in &points {
            let fast = model.shap_values(x).unwrap();
            let exact = brute_force_shap(tree, x, 3);
            for (f, e) in fast.iter().zip(&exact) {
                assert!((f - e).abs() < 1e-9, "x={:?} fast={:?} exact={:?}", x, fast, exact);
            }
        }
    }

    #[test]
    fn test_shap_sums_to_prediction() {
        let model = ensemble("mean", 0.25, vec![sample_tree(), stump(2, -1.0, 1.0), stump(0, 3.0, 0.0)]);
        for x in [[0.0, 0.0, 0.0], [2.0, 1.0, 1.0], [1.0, 0.0, 0.7]] {
            let phi = model.shap_values(&x).unwrap();
            let total = model.expected_value() + phi.iter().sum::<f64>();
            assert!((total - model.predict(&x).unwrap()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rejects_wrong_input_length() {
        let model = ensemble("sum", 0.0, vec![stump(0, 0.0, 1.0)]);
        assert!(matches!(
            model.predict(&[1.0]),
            Err(PredictionError::FeatureCount { expected: 3, actual: 1 })
        ));
        assert!(model.shap_values(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_overflowing_contributions_are_rejected() {
        let model = ensemble("sum", 0.0, vec![stump(0, 1.7e308, -1.7e308)]);
        let x = [0.0, 0.0, 0.0];

        assert_eq!(model.predict(&x).unwrap(), 1.7e308);
        assert!(matches!(model.shap_values(&x), Err(PredictionError::NonFiniteOutput)));
    }

    #[test]
    fn test_overflowing_prediction_is_rejected() {
        let big = stump(0, 1.7e308, 0.0);
        let model = ensemble("sum", 0.0, vec![big.clone(), big]);
        assert!(matches!(model.predict(&[0.0, 0.0, 0.0]), Err(PredictionError::NonFiniteOutput)));
    }

    #[test]
    fn test_rejects_malformed_trees() {
        let mut cyclic = stump(0, 0.0, 1.0);
        cyclic["children_left"] = json!([0, -1, -1]);
        let mut bad_feature = stump(0, 0.0, 1.0);
        bad_feature["feature"] = json!([7, -2, -2]);
        let mut bad_cover = stump(0, 0.0, 1.0);
        bad_cover["cover"] = json!([4.0, 1.0, 1.0]);
        let mut short = stump(0, 0.0, 1.0);
        short["value"] = json!([0.0, 1.0]);

        for tree in [cyclic, bad_feature, bad_cover, short] {
            let result = TreeEnsemble::from_value(json!({
                "n_features": 3,
                "objective": "regression",
                "aggregation": "sum",
                "trees": [tree]
            }));
            assert!(matches!(result, Err(ModelError::Malformed(_))));
        }

        let empty = TreeEnsemble::from_value(json!({
            "n_features": 3, "objective": "regression", "aggregation": "sum", "trees": []
        }));
        assert!(empty.is_err());
    }

    #[test]
    fn test_layout_check() {
        let model = ensemble("sum", 0.0, vec![stump(0, 0.0, 1.0)]);
        assert!(model.check_layout(&["a", "b", "c"]).is_ok());
        assert!(matches!(
            model.check_layout(&["a", "c", "b"]),
            Err(ModelError::LayoutMismatch { .. })
        ));
        assert!(model.check_layout(&["a", "b"]).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(
            &path,
            json!({
                "n_features": 3,
                "objective": "binary_logistic",
                "aggregation": "sum",
                "base_score": -0.5,
                "trees": [stump(1, -1.0, 1.0)]
            })
            .to_string(),
        )
        .unwrap();

        let model = TreeEnsemble::from_file(&path).unwrap();
        assert_eq!(model.objective(), Objective::BinaryLogistic);
        assert_eq!(model.n_trees(), 1);
        assert_eq!(model.predict(&[0.0, 1.0, 0.0]).unwrap(), 0.5);

        let missing = TreeEnsemble::from_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ModelError::Io { .. })));
    }
}
