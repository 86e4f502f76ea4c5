//! Gradient-boosted tree ensemble in XGBoost's JSON model format
//!
//! Only the parts of the format needed for prediction are typed; every other
//! field is carried through untouched so a model saved by XGBoost survives a
//! load/save cycle.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from booster parsing, validation and prediction
#[derive(Error, Debug)]
pub enum BoosterError {
    #[error("Booster file I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid booster JSON: {0}")]
    Format(#[from] serde_json::Error),
    #[error("Invalid booster model: {0}")]
    InvalidModel(String),
    #[error("Unsupported objective for prediction: {0}")]
    UnsupportedObjective(String),
}

/// Result type for booster operations
pub type BoosterResult<T> = Result<T, BoosterError>;

/// Learning objective, as far as prediction is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveKind {
    /// Identity link (`reg:squarederror`, `reg:absoluteerror`, ...)
    Identity,
    /// Logistic link (`binary:logistic`, `reg:logistic`)
    Logistic,
    /// Log link (`count:poisson`, `reg:gamma`, `reg:tweedie`)
    Log,
}

impl ObjectiveKind {
    fn from_name(name: &str) -> BoosterResult<Self> {
        match name {
            "reg:squarederror" | "reg:squaredlogerror" | "reg:absoluteerror"
            | "reg:pseudohubererror" | "reg:linear" => Ok(Self::Identity),
            "binary:logistic" | "reg:logistic" => Ok(Self::Logistic),
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Ok(Self::Log),
            other => Err(BoosterError::UnsupportedObjective(other.to_string())),
        }
    }

    fn margin(self, base_score: f32) -> f32 {
        match self {
            Self::Identity => base_score,
            Self::Logistic => (base_score / (1.0 - base_score)).ln(),
            Self::Log => base_score.ln(),
        }
    }

    fn transform(self, margin: f32) -> f32 {
        match self {
            Self::Identity => margin,
            Self::Logistic => 1.0 / (1.0 + (-margin).exp()),
            Self::Log => margin.exp(),
        }
    }
}

/// `default_left` entries are written as integers by older releases and as
/// booleans by newer ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultLeft(pub bool);

impl Serialize for DefaultLeft {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(self.0))
    }
}

impl<'de> Deserialize<'de> for DefaultLeft {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Int(i64),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bool(flag) => Self(flag),
            Repr::Int(flag) => Self(flag != 0),
        })
    }
}

/// A single regression tree in array form
///
/// Node `i` is a leaf when `left_children[i] == -1`; its value is then
/// `split_conditions[i]`. Otherwise rows with `x[split_indices[i]] <
/// split_conditions[i]` go left, missing values follow `default_left[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegTree {
    pub left_children: Vec<i32>,
    pub right_children: Vec<i32>,
    pub split_indices: Vec<u32>,
    pub split_conditions: Vec<f32>,
    pub default_left: Vec<DefaultLeft>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegTree {
    /// A tree made of a single leaf
    pub fn leaf(value: f32) -> Self {
        Self {
            left_children: vec![-1],
            right_children: vec![-1],
            split_indices: vec![0],
            split_conditions: vec![value],
            default_left: vec![DefaultLeft(false)],
            extra: Map::new(),
        }
    }

    /// A depth-one tree splitting on `feature < threshold`
    pub fn stump(feature: u32, threshold: f32, left: f32, right: f32, missing_left: bool) -> Self {
        Self {
            left_children: vec![1, -1, -1],
            right_children: vec![2, -1, -1],
            split_indices: vec![feature, 0, 0],
            split_conditions: vec![threshold, left, right],
            default_left: vec![DefaultLeft(missing_left), DefaultLeft(false), DefaultLeft(false)],
            extra: Map::new(),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.left_children.len()
    }

    fn validate(&self, index: usize) -> BoosterResult<()> {
        let n = self.left_children.len();
        if n == 0 {
            return Err(BoosterError::InvalidModel(format!("tree {} has no nodes", index)));
        }
        if self.right_children.len() != n
            || self.split_indices.len() != n
            || self.split_conditions.len() != n
            || self.default_left.len() != n
        {
            return Err(BoosterError::InvalidModel(format!(
                "tree {} has node arrays of different lengths",
                index
            )));
        }

        for node in 0..n {
            let (left, right) = (self.left_children[node], self.right_children[node]);
            if left == -1 {
                continue;
            }
            // Children always follow their parent, so traversal terminates.
            for child in [left, right] {
                if child <= node as i32 || child as usize >= n {
                    return Err(BoosterError::InvalidModel(format!(
                        "tree {} node {} has invalid child {}",
                        index, node, child
                    )));
                }
            }
        }
        Ok(())
    }

    fn leaf_value(&self, row: &[f32]) -> BoosterResult<f32> {
        let malformed =
            |node: usize| BoosterError::InvalidModel(format!("tree node {} is malformed", node));

        let mut node = 0usize;
        loop {
            let left = *self.left_children.get(node).ok_or_else(|| malformed(node))?;
            let condition = *self.split_conditions.get(node).ok_or_else(|| malformed(node))?;
            if left == -1 {
                return Ok(condition);
            }
            let right = *self.right_children.get(node).ok_or_else(|| malformed(node))?;
            let feature = *self.split_indices.get(node).ok_or_else(|| malformed(node))?;
            let missing_left = self.default_left.get(node).ok_or_else(|| malformed(node))?.0;

            let value = row.get(feature as usize).copied().unwrap_or(f32::NAN);
            let go_left = if value.is_nan() {
                missing_left
            } else {
                value < condition
            };
            let next = if go_left { left } else { right };
            // Forward-only walk; anything else would not terminate.
            if next <= node as i32 {
                return Err(malformed(node));
            }
            node = next as usize;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GbTreeModel {
    trees: Vec<RegTree>,
    #[serde(default)]
    tree_info: Vec<i32>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GradientBooster {
    name: String,
    model: GbTreeModel,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Objective {
    name: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    num_feature: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Learner {
    learner_model_param: LearnerModelParam,
    objective: Objective,
    gradient_booster: GradientBooster,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Gradient-boosted tree ensemble
///
/// Deserializing validates the trees, so a `Booster` obtained from JSON is
/// always structurally sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoosterRepr")]
pub struct Booster {
    learner: Learner,
    version: Vec<u32>,
}

#[derive(Deserialize)]
struct BoosterRepr {
    learner: Learner,
    version: Vec<u32>,
}

impl TryFrom<BoosterRepr> for Booster {
    type Error = BoosterError;

    fn try_from(repr: BoosterRepr) -> BoosterResult<Self> {
        let booster = Self {
            learner: repr.learner,
            version: repr.version,
        };
        booster.validate()?;
        Ok(booster)
    }
}

impl Booster {
    /// Create an empty tree booster
    pub fn new(objective: &str, base_score: f32, num_feature: usize) -> Self {
        Self {
            learner: Learner {
                learner_model_param: LearnerModelParam {
                    base_score: base_score.to_string(),
                    num_feature: num_feature.to_string(),
                    extra: Map::new(),
                },
                objective: Objective {
                    name: objective.to_string(),
                    extra: Map::new(),
                },
                gradient_booster: GradientBooster {
                    name: "gbtree".to_string(),
                    model: GbTreeModel {
                        trees: vec![],
                        tree_info: vec![],
                        extra: Map::new(),
                    },
                    extra: Map::new(),
                },
                extra: Map::new(),
            },
            version: vec![2, 0, 0],
        }
    }

    /// Append a tree to the ensemble
    pub fn push_tree(&mut self, tree: RegTree) {
        let model = &mut self.learner.gradient_booster.model;
        model.trees.push(tree);
        model.tree_info.push(0);
    }

    pub fn with_tree(mut self, tree: RegTree) -> Self {
        self.push_tree(tree);
        self
    }

    pub fn num_trees(&self) -> usize {
        self.learner.gradient_booster.model.trees.len()
    }

    pub fn objective(&self) -> &str {
        &self.learner.objective.name
    }

    pub fn num_features(&self) -> BoosterResult<usize> {
        self.learner
            .learner_model_param
            .num_feature
            .parse()
            .map_err(|_| {
                BoosterError::InvalidModel(format!(
                    "num_feature '{}' is not an integer",
                    self.learner.learner_model_param.num_feature
                ))
            })
    }

    pub fn base_score(&self) -> BoosterResult<f32> {
        self.learner
            .learner_model_param
            .base_score
            .parse()
            .map_err(|_| {
                BoosterError::InvalidModel(format!(
                    "base_score '{}' is not a number",
                    self.learner.learner_model_param.base_score
                ))
            })
    }

    /// Check structural invariants of every tree
    pub fn validate(&self) -> BoosterResult<()> {
        if self.learner.gradient_booster.name != "gbtree" {
            return Err(BoosterError::InvalidModel(format!(
                "unsupported booster '{}'",
                self.learner.gradient_booster.name
            )));
        }
        for (index, tree) in self.learner.gradient_booster.model.trees.iter().enumerate() {
            tree.validate(index)?;
        }
        Ok(())
    }

    /// Predict one row; missing features are `NaN` or absent
    pub fn predict_row(&self, row: &[f32]) -> BoosterResult<f32> {
        self.validate()?;
        let objective = ObjectiveKind::from_name(self.objective())?;
        let base = objective.margin(self.base_score()?);
        Ok(objective.transform(self.margin(base, row)?))
    }

    /// Predict a batch of rows
    pub fn predict(&self, rows: &[Vec<f32>]) -> BoosterResult<Vec<f32>> {
        self.validate()?;
        let objective = ObjectiveKind::from_name(self.objective())?;
        let base = objective.margin(self.base_score()?);
        rows.iter()
            .map(|row| Ok(objective.transform(self.margin(base, row)?)))
            .collect()
    }

    fn margin(&self, base: f32, row: &[f32]) -> BoosterResult<f32> {
        self.learner
            .gradient_booster
            .model
            .trees
            .iter()
            .try_fold(base, |acc, tree| Ok(acc + tree.leaf_value(row)?))
    }

    /// Parse and validate a model from JSON bytes
    pub fn from_json_slice(bytes: &[u8]) -> BoosterResult<Self> {
        let repr: BoosterRepr = serde_json::from_slice(bytes)?;
        Self::try_from(repr)
    }

    pub fn to_json_vec(&self) -> BoosterResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Load a model from a local JSON file
    pub fn load_model(path: impl AsRef<Path>) -> BoosterResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| BoosterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_slice(&bytes)
    }

    /// Save the model to a local JSON file
    pub fn save_model(&self, path: impl AsRef<Path>) -> BoosterResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_vec()?).map_err(|source| BoosterError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn regression_model() -> Booster {
        Booster::new("reg:squarederror", 0.5, 2)
            .with_tree(RegTree::stump(0, 1.0, -0.25, 0.75, true))
            .with_tree(RegTree::stump(1, 0.0, 0.1, -0.1, false))
    }

    #[test]
    fn test_regression_prediction() {
        let booster = regression_model();
        let predictions = booster
            .predict(&[vec![0.5, -1.0], vec![2.0, 3.0]])
            .unwrap();

        assert!((predictions[0] - (0.5 - 0.25 + 0.1)).abs() < 1e-6);
        assert!((predictions[1] - (0.5 + 0.75 - 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_missing_values_follow_default_direction() {
        let booster = regression_model();
        // Feature 0 missing goes left, feature 1 absent goes right.
        let prediction = booster.predict_row(&[f32::NAN]).unwrap();
        assert!((prediction - (0.5 - 0.25 - 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_logistic_prediction() {
        let booster = Booster::new("binary:logistic", 0.5, 1).with_tree(RegTree::leaf(0.0));
        let prediction = booster.predict_row(&[1.0]).unwrap();
        assert!((prediction - 0.5).abs() < 1e-6);

        let booster = Booster::new("binary:logistic", 0.5, 1).with_tree(RegTree::leaf(2.0));
        let prediction = booster.predict_row(&[1.0]).unwrap();
        assert!((prediction - 1.0 / (1.0 + (-2.0f32).exp())).abs() < 1e-6);
    }

    #[test]
    fn test_unsupported_objective() {
        let booster = Booster::new("multi:softprob", 0.5, 1);
        assert!(matches!(
            booster.predict_row(&[0.0]),
            Err(BoosterError::UnsupportedObjective(_))
        ));
    }

    #[test]
    fn test_parses_xgboost_json_and_keeps_unknown_fields() {
        let document = json!({
            "learner": {
                "attributes": {},
                "feature_names": [],
                "feature_types": [],
                "learner_model_param": {
                    "base_score": "5E-1",
                    "boost_from_average": "1",
                    "num_class": "0",
                    "num_feature": "1",
                    "num_target": "1"
                },
                "objective": {
                    "name": "reg:squarederror",
                    "reg_loss_param": {"scale_pos_weight": "1"}
                },
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "gbtree_model_param": {"num_parallel_tree": "1", "num_trees": "1"},
                        "tree_info": [0],
                        "trees": [{
                            "id": 0,
                            "base_weights": [0.0, -0.2, 0.3],
                            "left_children": [1, -1, -1],
                            "right_children": [2, -1, -1],
                            "split_indices": [0, 0, 0],
                            "split_conditions": [3.0, -0.2, 0.3],
                            "default_left": [1, 0, 0],
                            "tree_param": {"num_nodes": "3"}
                        }]
                    }
                }
            },
            "version": [2, 0, 3]
        });

        let bytes = serde_json::to_vec(&document).unwrap();
        let booster = Booster::from_json_slice(&bytes).unwrap();
        assert_eq!(booster.num_trees(), 1);
        assert_eq!(booster.num_features().unwrap(), 1);
        assert!((booster.predict_row(&[1.0]).unwrap() - 0.3).abs() < 1e-6);

        let saved: Value = serde_json::from_slice(&booster.to_json_vec().unwrap()).unwrap();
        assert_eq!(saved["learner"]["learner_model_param"]["num_target"], "1");
        assert_eq!(saved["learner"]["gradient_booster"]["model"]["trees"][0]["id"], 0);
        assert_eq!(saved["version"], json!([2, 0, 3]));
    }

    #[test]
    fn test_boolean_default_left_accepted() {
        let mut document = serde_json::to_value(regression_model()).unwrap();
        document["learner"]["gradient_booster"]["model"]["trees"][0]["default_left"] =
            json!([true, false, false]);

        let booster: Booster = serde_json::from_value(document).unwrap();
        assert_eq!(booster, regression_model());
    }

    #[test]
    fn test_validation_rejects_broken_trees() {
        let mut tree = RegTree::stump(0, 1.0, 0.0, 1.0, false);
        tree.right_children[0] = 0;
        let booster = Booster::new("reg:squarederror", 0.5, 1).with_tree(tree);
        assert!(matches!(booster.validate(), Err(BoosterError::InvalidModel(_))));

        let mut tree = RegTree::leaf(1.0);
        tree.split_conditions.clear();
        let booster = Booster::new("reg:squarederror", 0.5, 1).with_tree(tree);
        assert!(matches!(booster.validate(), Err(BoosterError::InvalidModel(_))));
    }

    #[test]
    fn test_prediction_on_malformed_tree_is_an_error() {
        let mut tree = RegTree::stump(0, 1.0, 0.0, 1.0, false);
        tree.right_children[0] = 7;
        let booster = Booster::new("reg:squarederror", 0.5, 1).with_tree(tree);
        assert!(matches!(
            booster.predict_row(&[5.0]),
            Err(BoosterError::InvalidModel(_))
        ));
        assert!(matches!(
            booster.predict(&[vec![5.0]]),
            Err(BoosterError::InvalidModel(_))
        ));

        let mut tree = RegTree::stump(0, 1.0, 0.0, 1.0, false);
        tree.left_children[1] = 0;
        tree.right_children[1] = 0;
        let cyclic = Booster::new("reg:squarederror", 0.5, 1).with_tree(tree.clone());
        assert!(matches!(
            cyclic.predict_row(&[0.0]),
            Err(BoosterError::InvalidModel(_))
        ));
        assert!(matches!(
            tree.leaf_value(&[0.0]),
            Err(BoosterError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_malformed_tree() {
        let mut document = serde_json::to_value(regression_model()).unwrap();
        document["learner"]["gradient_booster"]["model"]["trees"][0]["right_children"] =
            json!([9, -1, -1]);

        assert!(serde_json::from_value::<Booster>(document.clone()).is_err());
        let bytes = serde_json::to_vec(&document).unwrap();
        assert!(matches!(
            Booster::from_json_slice(&bytes),
            Err(BoosterError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Booster::load_model("/definitely/not/here/model.json").unwrap_err();
        assert!(matches!(err, BoosterError::Io { .. }));
    }
}
