//! Feature derivation and schema alignment shared by training and serving.
//!
//! Both sides go through the same two functions:
//! 1. `derive_features` computes the ratio columns and one-hot indicators
//! 2. `align` projects the result onto the model's ordered feature list
//!
//! The feature list and category levels come from the trained artifact, so
//! the serving side can never drift from what the model was fit on.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{RawRow, RawValue};
use crate::pipeline::PipelineError;

/// A derived column computed as `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioFeature {
    pub name: &'static str,
    pub numerator: &'static str,
    pub denominator: &'static str,
}

pub const RATIO_FEATURES: [RatioFeature; 4] = [
    RatioFeature {
        name: "ANNUITY_INCOME_PERCENT",
        numerator: "AMT_ANNUITY",
        denominator: "AMT_INCOME_TOTAL",
    },
    RatioFeature {
        name: "CREDIT_INCOME_PERCENT",
        numerator: "AMT_CREDIT",
        denominator: "AMT_INCOME_TOTAL",
    },
    RatioFeature {
        name: "CREDIT_TERM",
        numerator: "AMT_CREDIT",
        denominator: "AMT_ANNUITY",
    },
    RatioFeature {
        name: "DAYS_EMPLOYED_PERCENT",
        numerator: "DAYS_EMPLOYED",
        denominator: "DAYS_BIRTH",
    },
];

/// Columns one-hot encoded with the first (reference) level dropped.
pub const CATEGORICAL_COLUMNS: [&str; 8] = [
    "CODE_GENDER",
    "EMERGENCYSTATE_MODE",
    "FLAG_OWN_CAR",
    "FLAG_OWN_REALTY",
    "NAME_CONTRACT_TYPE",
    "NAME_EDUCATION_TYPE",
    "OCCUPATION_TYPE",
    "ORGANIZATION_TYPE",
];

/// Feature list the trainer writes into new artifacts.
pub const DEFAULT_MODEL_FEATURES: [&str; 13] = [
    "ANNUITY_INCOME_PERCENT",
    "CODE_GENDER_M",
    "CODE_GENDER_XNA",
    "CREDIT_INCOME_PERCENT",
    "CREDIT_TERM",
    "DAYS_EMPLOYED_PERCENT",
    "EMERGENCYSTATE_MODE_Yes",
    "FLAG_OWN_CAR_Y",
    "FLAG_OWN_REALTY_Y",
    "NAME_CONTRACT_TYPE_Cash loans",
    "NAME_EDUCATION_TYPE_Secondary / secondary special",
    "OCCUPATION_TYPE_Laborers",
    "ORGANIZATION_TYPE_Business Entity Type 3",
];

/// Sorted distinct values per categorical column. Index 0 is the reference level.
pub type CategoryLevels = BTreeMap<String, Vec<String>>;

/// Raw row augmented with derived and indicator columns, all numeric.
pub type DerivedRow = HashMap<String, f64>;

pub fn default_feature_list() -> Vec<String> {
    DEFAULT_MODEL_FEATURES.iter().map(|s| s.to_string()).collect()
}

/// Ordered numeric values matching a model feature list.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// Name → value view, so an aligned vector can be fed back to `align`.
    pub fn to_row(&self) -> DerivedRow {
        self.names
            .iter()
            .cloned()
            .zip(self.values.iter().copied())
            .collect()
    }
}

/// Categorical column a one-hot feature name belongs to (longest prefix wins).
pub fn categorical_source(feature: &str) -> Option<&'static str> {
    CATEGORICAL_COLUMNS
        .iter()
        .copied()
        .filter(|col| {
            feature.len() > col.len() + 1
                && feature.starts_with(col)
                && feature.as_bytes()[col.len()] == b'_'
        })
        .max_by_key(|col| col.len())
}

/// Model features whose value is computed from raw `column`.
pub fn dependents_of(column: &str, feature_list: &[String]) -> Vec<String> {
    feature_list
        .iter()
        .filter(|feature| {
            RATIO_FEATURES.iter().any(|ratio| {
                ratio.name == feature.as_str()
                    && (ratio.numerator == column || ratio.denominator == column)
            }) || categorical_source(feature) == Some(column)
        })
        .cloned()
        .collect()
}

/// Computes ratio features and one-hot indicators for `row`.
///
/// Derivations whose outputs are all pinned or unused by the model are
/// skipped; pinned features are written as `0.0`. Division is unguarded, so a
/// zero denominator yields `inf` or `NaN` in the output rather than an error.
///
/// Every absent raw column is collected before failing, so one
/// `MissingColumns` error names all features that need pinning.
pub fn derive_features(
    row: &RawRow,
    levels: &CategoryLevels,
    feature_list: &[String],
    pinned: &BTreeSet<String>,
) -> Result<DerivedRow, PipelineError> {
    let mut derived: DerivedRow = row
        .columns()
        .filter(|(_, value)| !matches!(value, RawValue::Text(_)))
        .map(|(name, value)| (name.clone(), value.as_f64()))
        .collect();
    let mut missing: BTreeSet<&str> = BTreeSet::new();

    for ratio in RATIO_FEATURES.iter() {
        if pinned.contains(ratio.name) || !feature_list.iter().any(|f| f == ratio.name) {
            continue;
        }
        match (row.get(ratio.numerator), row.get(ratio.denominator)) {
            (Some(numerator), Some(denominator)) => {
                derived.insert(
                    ratio.name.to_string(),
                    numerator.as_f64() / denominator.as_f64(),
                );
            }
            (numerator, denominator) => {
                if numerator.is_none() {
                    missing.insert(ratio.numerator);
                }
                if denominator.is_none() {
                    missing.insert(ratio.denominator);
                }
            }
        }
    }

    for column in CATEGORICAL_COLUMNS.iter() {
        let outputs = dependents_of(column, feature_list);
        if outputs.iter().all(|f| pinned.contains(f)) {
            continue;
        }
        let Some(value) = row.get(column) else {
            missing.insert(*column);
            continue;
        };
        let category = value.as_category();
        let column_levels = levels.get(*column).map(Vec::as_slice).unwrap_or(&[]);

        for level in column_levels.iter().skip(1) {
            let indicator = if category.as_deref() == Some(level.as_str()) {
                1.0
            } else {
                0.0
            };
            derived.insert(format!("{}_{}", column, level), indicator);
        }

        // Values unseen at training time still get an indicator; the
        // aligner drops it unless the model happens to know the name.
        if let Some(category) = category {
            let is_reference = column_levels.first() == Some(&category);
            if !is_reference && !column_levels.contains(&category) {
                derived.insert(format!("{}_{}", column, category), 1.0);
            }
        }
    }

    for feature in pinned {
        derived.insert(feature.clone(), 0.0);
    }

    if missing.is_empty() {
        return Ok(derived);
    }

    let dependents: BTreeSet<String> = missing
        .iter()
        .flat_map(|column| dependents_of(column, feature_list))
        .collect();
    let affected = feature_list
        .iter()
        .filter(|feature| {
            dependents.contains(*feature)
                || derived.get(feature.as_str()).is_some_and(|v| !v.is_finite())
        })
        .cloned()
        .collect();

    Err(PipelineError::MissingColumns {
        columns: missing.into_iter().map(str::to_string).collect(),
        affected,
    })
}

/// Projects `derived` onto `feature_list`, zero-filling absent names.
///
/// The output order is always the feature list order.
pub fn align(derived: &DerivedRow, feature_list: &[String]) -> FeatureVector {
    let values = feature_list
        .iter()
        .map(|name| derived.get(name).copied().unwrap_or(0.0))
        .collect();

    FeatureVector {
        names: feature_list.to_vec(),
        values,
    }
}

/// Collects the sorted distinct non-null values of every categorical column.
pub fn collect_category_levels<'a, I>(rows: I) -> CategoryLevels
where
    I: IntoIterator<Item = &'a RawRow>,
{
    let mut seen: BTreeMap<String, BTreeSet<String>> = CATEGORICAL_COLUMNS
        .iter()
        .map(|col| (col.to_string(), BTreeSet::new()))
        .collect();

    for row in rows {
        for column in CATEGORICAL_COLUMNS.iter() {
            if let Some(category) = row.get(column).and_then(RawValue::as_category) {
                if let Some(values) = seen.get_mut(*column) {
                    values.insert(category);
                }
            }
        }
    }

    seen.into_iter()
        .map(|(col, values)| (col, values.into_iter().collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> CategoryLevels {
        let mut levels = CategoryLevels::new();
        levels.insert(
            "CODE_GENDER".into(),
            vec!["F".into(), "M".into(), "XNA".into()],
        );
        levels.insert("FLAG_OWN_CAR".into(), vec!["N".into(), "Y".into()]);
        levels
    }

    fn features(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ratio_division_by_zero_propagates() {
        let row = RawRow::new()
            .with("AMT_CREDIT", RawValue::Number(1000.0))
            .with("AMT_ANNUITY", RawValue::Number(0.0));
        let list = features(&["CREDIT_TERM"]);

        let derived = derive_features(&row, &levels(), &list, &BTreeSet::new()).unwrap();
        assert!(derived["CREDIT_TERM"].is_infinite());
    }

    #[test]
    fn test_null_operand_yields_nan() {
        let row = RawRow::new()
            .with("AMT_ANNUITY", RawValue::Null)
            .with("AMT_INCOME_TOTAL", RawValue::Number(100.0));
        let list = features(&["ANNUITY_INCOME_PERCENT"]);

        let derived = derive_features(&row, &levels(), &list, &BTreeSet::new()).unwrap();
        assert!(derived["ANNUITY_INCOME_PERCENT"].is_nan());
    }

    #[test]
    fn test_one_hot_drops_reference_level() {
        let list = features(&["CODE_GENDER_M", "CODE_GENDER_XNA"]);
        let female = RawRow::new().with("CODE_GENDER", RawValue::Text("F".into()));
        let male = RawRow::new().with("CODE_GENDER", RawValue::Text("M".into()));

        let derived = derive_features(&female, &levels(), &list, &BTreeSet::new()).unwrap();
        assert!(!derived.contains_key("CODE_GENDER_F"));
        assert_eq!(derived["CODE_GENDER_M"], 0.0);
        assert_eq!(derived["CODE_GENDER_XNA"], 0.0);

        let derived = derive_features(&male, &levels(), &list, &BTreeSet::new()).unwrap();
        assert_eq!(derived["CODE_GENDER_M"], 1.0);
        assert_eq!(derived["CODE_GENDER_XNA"], 0.0);
    }

    #[test]
    fn test_missing_column_reports_dependents() {
        let row = RawRow::new()
            .with("AMT_CREDIT", RawValue::Number(1000.0))
            .with("AMT_INCOME_TOTAL", RawValue::Number(100.0));
        let list = features(&["ANNUITY_INCOME_PERCENT", "CREDIT_INCOME_PERCENT", "CREDIT_TERM"]);

        let err = derive_features(&row, &levels(), &list, &BTreeSet::new()).unwrap_err();
        match err {
            PipelineError::MissingColumns { columns, affected } => {
                assert_eq!(columns, features(&["AMT_ANNUITY"]));
                assert_eq!(affected, features(&["ANNUITY_INCOME_PERCENT", "CREDIT_TERM"]));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_all_missing_columns_reported_together() {
        let row = RawRow::new()
            .with("AMT_CREDIT", RawValue::Number(1000.0))
            .with("AMT_ANNUITY", RawValue::Number(50.0))
            .with("DAYS_EMPLOYED", RawValue::Number(-200.0))
            .with("DAYS_BIRTH", RawValue::Null);
        let list = features(&[
            "ANNUITY_INCOME_PERCENT",
            "CODE_GENDER_M",
            "CREDIT_INCOME_PERCENT",
            "CREDIT_TERM",
            "DAYS_EMPLOYED_PERCENT",
        ]);

        let err = derive_features(&row, &levels(), &list, &BTreeSet::new()).unwrap_err();
        match err {
            PipelineError::MissingColumns { columns, affected } => {
                assert_eq!(columns, features(&["AMT_INCOME_TOTAL", "CODE_GENDER"]));
                // DAYS_EMPLOYED_PERCENT is present but NaN from the null birth date
                assert_eq!(
                    affected,
                    features(&[
                        "ANNUITY_INCOME_PERCENT",
                        "CODE_GENDER_M",
                        "CREDIT_INCOME_PERCENT",
                        "DAYS_EMPLOYED_PERCENT",
                    ])
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_pinned_features_skip_derivation() {
        let row = RawRow::new().with("AMT_CREDIT", RawValue::Number(1000.0));
        let list = features(&["CREDIT_TERM"]);
        let pinned: BTreeSet<String> = ["CREDIT_TERM".to_string()].into_iter().collect();

        let derived = derive_features(&row, &levels(), &list, &pinned).unwrap();
        assert_eq!(derived["CREDIT_TERM"], 0.0);
    }

    #[test]
    fn test_categorical_source_prefers_longest_prefix() {
        assert_eq!(categorical_source("FLAG_OWN_CAR_Y"), Some("FLAG_OWN_CAR"));
        assert_eq!(
            categorical_source("NAME_CONTRACT_TYPE_Cash loans"),
            Some("NAME_CONTRACT_TYPE")
        );
        assert_eq!(categorical_source("CREDIT_TERM"), None);
        assert_eq!(categorical_source("CODE_GENDER"), None);
    }

    #[test]
    fn test_align_orders_and_zero_fills() {
        let mut derived = DerivedRow::new();
        derived.insert("B".into(), 2.0);
        derived.insert("EXTRA".into(), 9.0);
        let list = features(&["A", "B"]);

        let vector = align(&derived, &list);
        assert_eq!(vector.names, list);
        assert_eq!(vector.values, vec![0.0, 2.0]);
        assert_eq!(align(&vector.to_row(), &list), vector);
    }

    #[test]
    fn test_collect_category_levels_sorted() {
        let rows = vec![
            RawRow::new().with("CODE_GENDER", RawValue::Text("M".into())),
            RawRow::new().with("CODE_GENDER", RawValue::Text("F".into())),
            RawRow::new().with("CODE_GENDER", RawValue::Null),
        ];
        let levels = collect_category_levels(&rows);
        assert_eq!(levels["CODE_GENDER"], vec!["F".to_string(), "M".to_string()]);
        assert!(levels["FLAG_OWN_CAR"].is_empty());
    }
}
