//! Run file schema.

use crate::ConfigResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use th_background::LcdmParams;
use th_rates::tabulated::EscapeCorrection;
use th_rates::{AnalyticRates, RateProvider, TabulatedRates};
use th_thermo::ThermoParams;

/// One thermal history run: background, rate provider, physics and output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunFile {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub background: LcdmParams,
    #[serde(default)]
    pub rates: RatesDef,
    #[serde(default)]
    pub thermo: ThermoParams,
    #[serde(default)]
    pub output: OutputDef,
}

impl RunFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: crate::LATEST_VERSION,
            name: name.into(),
            background: LcdmParams::default(),
            rates: RatesDef::default(),
            thermo: ThermoParams::default(),
            output: OutputDef::default(),
        }
    }
}

/// Recombination rate provider selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum RatesDef {
    Analytic {
        #[serde(default = "default_analytic_fudge")]
        fudge_h: f64,
    },
    Tabulated {
        #[serde(default = "default_tabulated_fudge")]
        fudge_h: f64,
        /// Apply the Lyman-alpha escape correction
        #[serde(default = "default_true")]
        escape_correction: bool,
    },
}

fn default_analytic_fudge() -> f64 {
    1.14
}

fn default_tabulated_fudge() -> f64 {
    1.125
}

fn default_true() -> bool {
    true
}

impl Default for RatesDef {
    fn default() -> Self {
        Self::Analytic {
            fudge_h: default_analytic_fudge(),
        }
    }
}

impl RatesDef {
    pub fn name(&self) -> &'static str {
        match self {
            RatesDef::Analytic { .. } => "analytic",
            RatesDef::Tabulated { .. } => "tabulated",
        }
    }

    pub fn fudge_h(&self) -> f64 {
        match self {
            RatesDef::Analytic { fudge_h } | RatesDef::Tabulated { fudge_h, .. } => *fudge_h,
        }
    }

    pub fn build(&self) -> ConfigResult<Box<dyn RateProvider>> {
        let provider: Box<dyn RateProvider> = match self {
            RatesDef::Analytic { fudge_h } => Box::new(AnalyticRates::new(*fudge_h)?),
            RatesDef::Tabulated {
                fudge_h,
                escape_correction,
            } => Box::new(
                TabulatedRates::new()?
                    .with_fudge(*fudge_h)
                    .with_correction(escape_correction.then(EscapeCorrection::default)),
            ),
        };
        Ok(provider)
    }
}

/// Where and how densely the table is written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDef {
    /// Write every n-th row; the last row is always written
    pub every: usize,
    /// Table destination; standard output when absent
    pub path: Option<PathBuf>,
}

impl Default for OutputDef {
    fn default() -> Self {
        Self { every: 1, path: None }
    }
}
