//! Turning a validated run file into live models.

use crate::schema::RunFile;
use crate::{ConfigResult, validate_run};
use th_background::Lcdm;
use th_rates::RateProvider;
use th_thermo::{ThermoHistory, ThermoParams, ThermoRun};
use tracing::info;

/// Background and provider built from a run file, ready to solve.
pub struct Prepared {
    pub name: String,
    pub background: Lcdm,
    pub rates: Box<dyn RateProvider>,
    pub params: ThermoParams,
}

impl RunFile {
    pub fn prepare(&self) -> ConfigResult<Prepared> {
        validate_run(self)?;
        let background = Lcdm::new(&self.background)?;
        let rates = self.rates.build()?;
        info!(name = %self.name, provider = self.rates.name(), "run prepared");
        Ok(Prepared {
            name: self.name.clone(),
            background,
            rates,
            params: self.thermo.clone(),
        })
    }
}

impl Prepared {
    /// Run every check that precedes integration without integrating.
    pub fn check(&self) -> ConfigResult<()> {
        ThermoRun::new(&self.background, self.rates.as_ref(), &self.params)?;
        Ok(())
    }

    pub fn solve(&self) -> ConfigResult<ThermoHistory> {
        Ok(th_thermo::solve(&self.background, self.rates.as_ref(), &self.params)?)
    }
}
