//! Narrow interface to the downstream mixed-effects regression stage.
//!
//! The regression library itself is outside this workspace. What lives here
//! is the contract: a table ([`ModelFrame`]) and a formula
//! (`response ~ fixed + ... + (1 | group)`) go in, fitted coefficients come
//! out. Formulas are checked against the table header before anything is
//! handed over.

use anet_core::{annual::AnnualAssimilation, error::CoreError, schema::is_missing_token};
use csv::{ReaderBuilder, Trim};
use std::{fmt, io::Read, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormulaError {
    #[error("formula must contain exactly one `~`")]
    MissingTilde,

    #[error("formula has an empty response")]
    EmptyResponse,

    #[error("formula has an empty term")]
    EmptyTerm,

    #[error("random effect term `{0}` must look like `(1 | group)`")]
    MalformedRandomTerm(String),

    #[error("formula has no predictors")]
    NoPredictors,

    #[error("columns not found in table: {}", .0.join(", "))]
    UnknownColumns(Vec<String>),
}

/// `response ~ fixed + ... + (1 | group)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFormula {
    pub response: String,
    pub fixed_effects: Vec<String>,
    /// Grouping factors of random intercepts.
    pub random_intercepts: Vec<String>,
}

fn split_top_level(rhs: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in rhs.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            '+' if depth == 0 => {
                terms.push(&rhs[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&rhs[start..]);
    terms
}

fn is_intercept(term: &str) -> bool {
    term == "1" || term == "0"
}

impl ModelFormula {
    pub fn parse(formula: &str) -> Result<Self, FormulaError> {
        let mut sides = formula.split('~');
        let (Some(lhs), Some(rhs), None) = (sides.next(), sides.next(), sides.next()) else {
            return Err(FormulaError::MissingTilde);
        };
        let response = lhs.trim();
        if response.is_empty() {
            return Err(FormulaError::EmptyResponse);
        }

        let mut fixed_effects = Vec::new();
        let mut random_intercepts = Vec::new();
        for term in split_top_level(rhs) {
            let term = term.trim();
            if term.is_empty() {
                return Err(FormulaError::EmptyTerm);
            }
            if let Some(inner) = term.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
                match inner.split_once('|') {
                    Some((lhs, group)) if lhs.trim() == "1" && !group.trim().is_empty() => {
                        random_intercepts.push(group.trim().to_string());
                    }
                    _ => return Err(FormulaError::MalformedRandomTerm(term.to_string())),
                }
            } else if !is_intercept(term) {
                fixed_effects.push(term.split_whitespace().collect::<String>());
            }
        }
        if fixed_effects.is_empty() && random_intercepts.is_empty() {
            return Err(FormulaError::NoPredictors);
        }

        Ok(ModelFormula {
            response: response.to_string(),
            fixed_effects,
            random_intercepts,
        })
    }

    /// Every column the formula reads, response first, without duplicates.
    /// Interaction terms (`a:b`, `a*b`) contribute each of their variables.
    pub fn variables(&self) -> Vec<&str> {
        let mut variables: Vec<&str> = vec![self.response.as_str()];
        let fixed = self
            .fixed_effects
            .iter()
            .flat_map(|term| term.split([':', '*']));
        for variable in fixed.chain(self.random_intercepts.iter().map(String::as_str)) {
            if !variables.contains(&variable) {
                variables.push(variable);
            }
        }
        variables
    }

    /// Check that every variable of the formula is a column of the table.
    pub fn check_columns<I, S>(&self, columns: I) -> Result<(), FormulaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns: Vec<S> = columns.into_iter().collect();
        let unknown: Vec<String> = self
            .variables()
            .into_iter()
            .filter(|v| !columns.iter().any(|c| c.as_ref() == *v))
            .map(str::to_string)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(FormulaError::UnknownColumns(unknown))
        }
    }
}

impl FromStr for ModelFormula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelFormula::parse(s)
    }
}

impl fmt::Display for ModelFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .fixed_effects
            .iter()
            .cloned()
            .chain(self.random_intercepts.iter().map(|g| format!("(1 | {g})")))
            .collect();
        write!(f, "{} ~ {}", self.response, terms.join(" + "))
    }
}

/// A table handed to the regression stage: a header and text cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ModelFrame {
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, CoreError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        let columns = rdr.headers()?.iter().map(str::to_string).collect();
        let rows = rdr
            .records()
            .map(|r| r.map(|record| record.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        Ok(ModelFrame { columns, rows })
    }

    /// Frame of an annual table, with the same columns as its CSV form.
    pub fn from_annual(rows: &[AnnualAssimilation]) -> Result<Self, CoreError> {
        let mut buffer = Vec::new();
        AnnualAssimilation::write_annual_csv(rows, &mut buffer)?;
        ModelFrame::read_csv(buffer.as_slice())
    }

    /// Rows with a defined value in every column the formula reads, i.e. the
    /// rows a fitter will actually use.
    pub fn complete_cases(&self, formula: &ModelFormula) -> Result<usize, FormulaError> {
        formula.check_columns(&self.columns)?;
        let positions: Vec<usize> = formula
            .variables()
            .iter()
            .filter_map(|v| self.columns.iter().position(|c| c.as_str() == *v))
            .collect();
        Ok(self
            .rows
            .iter()
            .filter(|row| {
                positions
                    .iter()
                    .all(|&p| row.get(p).is_some_and(|cell| !is_missing_token(cell)))
            })
            .count())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    pub formula: ModelFormula,
    pub observations: usize,
    pub coefficients: Vec<Coefficient>,
}

impl FittedModel {
    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.term == term)
    }
}

/// The external mixed-effects regression library.
pub trait MixedModelFitter {
    fn fit(&self, frame: &ModelFrame, formula: &ModelFormula) -> anyhow::Result<FittedModel>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_formula() {
        let formula =
            ModelFormula::parse("eos ~ net_assimilation_sum + year + (1 | site_id)").unwrap();
        assert_eq!(formula.response, "eos");
        assert_eq!(formula.fixed_effects, vec!["net_assimilation_sum", "year"]);
        assert_eq!(formula.random_intercepts, vec!["site_id"]);
        assert_eq!(
            formula.to_string(),
            "eos ~ net_assimilation_sum + year + (1 | site_id)"
        );
    }

    #[test]
    fn test_interactions_and_intercept() {
        let formula = ModelFormula::parse("eos ~ 1 + sos * net_assimilation_sum + (1|site_id)")
            .unwrap();
        assert_eq!(formula.fixed_effects, vec!["sos*net_assimilation_sum"]);
        assert_eq!(
            formula.variables(),
            vec!["eos", "sos", "net_assimilation_sum", "site_id"]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ModelFormula::parse("eos"), Err(FormulaError::MissingTilde));
        assert_eq!(ModelFormula::parse("a ~ b ~ c"), Err(FormulaError::MissingTilde));
        assert_eq!(ModelFormula::parse(" ~ b"), Err(FormulaError::EmptyResponse));
        assert_eq!(ModelFormula::parse("a ~ b + "), Err(FormulaError::EmptyTerm));
        assert_eq!(ModelFormula::parse("a ~ 1"), Err(FormulaError::NoPredictors));
        assert_eq!(
            ModelFormula::parse("a ~ b + (x | g)"),
            Err(FormulaError::MalformedRandomTerm("(x | g)".to_string()))
        );
    }

    #[test]
    fn test_check_columns() {
        let formula: ModelFormula = "eos ~ net_assimilation_sum + (1 | site_id)".parse().unwrap();
        assert!(formula
            .check_columns(&["site_id", "eos", "net_assimilation_sum"])
            .is_ok());
        assert_eq!(
            formula.check_columns(&["site_id", "net_assimilation_sum"]),
            Err(FormulaError::UnknownColumns(vec!["eos".to_string()]))
        );
    }

    #[test]
    fn test_complete_cases_skip_missing() {
        let frame = ModelFrame::read_csv(
            "site_id,year,eos,net_assimilation_sum\nA,2010,290,3.0\nA,2011,NA,2.5\nB,2010,300,NA\nB,2011,295,1.0\n"
                .as_bytes(),
        )
        .unwrap();
        let formula = ModelFormula::parse("eos ~ net_assimilation_sum + (1 | site_id)").unwrap();
        assert_eq!(frame.complete_cases(&formula).unwrap(), 2);

        let unknown = ModelFormula::parse("eos ~ anet + (1 | site_id)").unwrap();
        assert!(frame.complete_cases(&unknown).is_err());
    }

    #[test]
    fn test_frame_from_annual_rows() {
        let rows = vec![AnnualAssimilation {
            site_id: "A".to_string(),
            latitude: 46.5,
            longitude: 7.5,
            year: 2010,
            net_assimilation_sum: None,
            respiration_sum: Some(1.0),
            days: 365,
            gated_days: 200,
            missing_production_days: 365,
            gated_fraction_of_year: 200.0 / 365.0,
        }];
        let frame = ModelFrame::from_annual(&rows).unwrap();
        assert_eq!(frame.rows.len(), 1);
        let formula = ModelFormula::parse("net_assimilation_sum ~ year + (1 | site_id)").unwrap();
        assert_eq!(frame.complete_cases(&formula).unwrap(), 0);
    }

    struct MeanResponse;

    impl MixedModelFitter for MeanResponse {
        fn fit(&self, frame: &ModelFrame, formula: &ModelFormula) -> anyhow::Result<FittedModel> {
            formula.check_columns(&frame.columns)?;
            let column = frame
                .columns
                .iter()
                .position(|c| *c == formula.response)
                .ok_or_else(|| anyhow::anyhow!("response column missing"))?;
            let values: Vec<f64> = frame
                .rows
                .iter()
                .filter_map(|row| row[column].parse::<f64>().ok())
                .collect();
            let estimate = values.iter().sum::<f64>() / values.len() as f64;
            Ok(FittedModel {
                formula: formula.clone(),
                observations: values.len(),
                coefficients: vec![Coefficient {
                    term: "(Intercept)".to_string(),
                    estimate,
                    std_error: None,
                }],
            })
        }
    }

    #[test]
    fn test_fitter_seam() {
        let frame =
            ModelFrame::read_csv("site_id,eos,anet\nA,290,1\nB,300,2\n".as_bytes()).unwrap();
        let formula = ModelFormula::parse("eos ~ anet + (1 | site_id)").unwrap();
        let fitted = MeanResponse.fit(&frame, &formula).unwrap();
        assert_eq!(fitted.observations, 2);
        assert_eq!(fitted.coefficient("(Intercept)").unwrap().estimate, 295.0);
        assert!(fitted.coefficient("anet").is_none());
    }
}
