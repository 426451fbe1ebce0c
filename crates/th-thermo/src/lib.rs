//! Thermal and ionization history of the homogeneous universe.
//!
//! Provides:
//! - Regime schedule with smooth hand-over between closed forms and integrated unknowns
//! - Stiff integration of hydrogen, helium and matter temperature in `-z`
//! - Exotic energy injection (annihilation, decay)
//! - Reionization profiles and optical-depth shooting
//! - Interpolation table with visibility function, sound speed, damping and drag epochs

pub mod derivs;
pub mod error;
pub mod history;
pub mod injection;
pub mod params;
pub mod reionization;
pub mod run;
pub mod saha;
pub mod schedule;
pub mod shooting;
pub mod state;
pub mod table;

pub use error::{ThermoError, ThermoResult};
pub use history::{CharacteristicEpochs, Column, InterpMode, TableCursor, ThermoHistory, ThermoRow};
pub use injection::EnergyInjection;
pub use params::{
    HeatingParameters, NamedLevel, Precision, ReionizationInput, ReionizationModel, ThermoParams,
    XeLevel,
};
pub use reionization::ReionizationProfile;
pub use run::{ThermoRun, solve};
pub use saha::Plasma;
pub use schedule::{ApproximationSchedule, Interval, Regime};
pub use shooting::Shot;
pub use state::{Ionization, Shape, StateVector};
