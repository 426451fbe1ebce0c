//! Approximation schedule: which unknowns are integrated where, and the
//! closed forms used for the others.

use crate::error::{ThermoError, ThermoResult};
use crate::params::Precision;
use crate::saha::Plasma;
use crate::state::Shape;
use tracing::debug;

/// Approximation regimes, from early to late.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Regime {
    /// Everything fully ionized, only the matter temperature evolves.
    BeforeRecombination,
    /// HeIII -> HeII in Saha equilibrium.
    HeliumFirst,
    /// Hydrogen and singly ionized helium, nothing else.
    AfterHeliumFirst,
    /// HeII -> HeI in Saha equilibrium.
    HeliumSecond,
    /// Helium integrated, hydrogen in Saha equilibrium.
    Hydrogen,
    /// Hydrogen and helium both integrated.
    FullRecombination,
    /// Full recombination under an imposed reionization profile.
    Reionization,
    /// Same, for providers that do not track early helium separately.
    ReionizationHighPrecision,
}

impl Regime {
    pub fn shape(self) -> Shape {
        match self {
            Regime::BeforeRecombination
            | Regime::HeliumFirst
            | Regime::AfterHeliumFirst
            | Regime::HeliumSecond => Shape::TemperatureOnly,
            Regime::Hydrogen => Shape::HeliumTemperature,
            Regime::FullRecombination | Regime::Reionization | Regime::ReionizationHighPrecision => {
                Shape::Full
            }
        }
    }

    pub fn is_reionization(self) -> bool {
        matches!(self, Regime::Reionization | Regime::ReionizationHighPrecision)
    }

    /// Singly ionized helium, `None` where it is integrated.
    pub(crate) fn closed_x_he(self, plasma: &Plasma, z: f64) -> Option<f64> {
        match self {
            Regime::BeforeRecombination | Regime::HeliumFirst | Regime::AfterHeliumFirst => Some(1.0),
            Regime::HeliumSecond => Some(plasma.he_ii(z)),
            _ => None,
        }
    }

    /// Doubly ionized share of the singly ionized helium.
    pub(crate) fn he_iii_factor(self, plasma: &Plasma, z: f64) -> f64 {
        match self {
            Regime::BeforeRecombination => 1.0,
            Regime::AfterHeliumFirst | Regime::HeliumSecond => 0.0,
            _ => plasma.he_iii(z),
        }
    }

    /// Ionized hydrogen, `None` where it is integrated.
    pub(crate) fn closed_x_h(self, plasma: &Plasma, z: f64, helium_electrons: f64) -> Option<f64> {
        match self {
            Regime::Hydrogen => Some(plasma.hydrogen(z, helium_electrons)),
            Regime::FullRecombination | Regime::Reionization | Regime::ReionizationHighPrecision => None,
            _ => Some(1.0),
        }
    }
}

/// One regime between two redshifts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    pub regime: Regime,
    /// Upper (earlier) boundary
    pub z_start: f64,
    /// Lower (later) boundary
    pub z_end: f64,
    /// Smoothing width of the transition at `z_start`; `None` for the first
    /// interval.
    pub width: Option<f64>,
}

impl Interval {
    pub fn contains(&self, z: f64) -> bool {
        z <= self.z_start && z >= self.z_end
    }

    /// Whether `z` lies in the entry transition window `[z_start − 2δ, z_start]`.
    pub fn in_transition(&self, z: f64) -> bool {
        self.width.is_some_and(|w| z <= self.z_start && z > self.z_start - 2.0 * w)
    }
}

/// Ordered regimes with strictly decreasing boundaries, ending at z = 0.
#[derive(Clone, Debug, PartialEq)]
pub struct ApproximationSchedule {
    intervals: Vec<Interval>,
}

impl ApproximationSchedule {
    /// Lay out the regimes for one run.
    ///
    /// Providers that track helium get the five-stage early sequence; the
    /// others integrate everything from `z_initial`. `reio_z_start` appends a
    /// reionization regime.
    pub fn build(
        precision: &Precision,
        requires_helium: bool,
        reio_z_start: Option<f64>,
        z_initial: f64,
    ) -> ThermoResult<Self> {
        let (first, transitions) = if requires_helium {
            let p = precision;
            (
                Regime::BeforeRecombination,
                vec![
                    (Regime::HeliumFirst, p.z_he_1, p.delta_z_he_1),
                    (Regime::AfterHeliumFirst, p.z_he_2, p.delta_z_he_2),
                    (Regime::HeliumSecond, p.z_he_3, p.delta_z_he_3),
                    (Regime::Hydrogen, p.z_early_h, p.delta_z_early_h),
                    (Regime::FullRecombination, p.z_full_h, p.delta_z_full_h),
                ],
            )
        } else {
            (Regime::FullRecombination, Vec::new())
        };

        for (regime, _, width) in &transitions {
            check_width(*regime, *width)?;
        }
        check_width(Regime::Reionization, precision.delta_z_reio)?;

        // transitions are placed one width above their nominal redshift
        let mut boundaries: Vec<(Regime, f64, f64)> = transitions
            .into_iter()
            .map(|(regime, z, width)| (regime, z + width, width))
            .collect();

        if !(z_initial.is_finite() && boundaries.first().is_none_or(|b| z_initial > b.1)) {
            return Err(ThermoError::invalid(format!(
                "z_initial = {z_initial} must lie above the first transition"
            )));
        }
        for pair in boundaries.windows(2) {
            if !(pair[1].1 < pair[0].1) {
                return Err(ThermoError::invalid(format!(
                    "transition into {:?} at z = {} is not below the one into {:?} at z = {}",
                    pair[1].0, pair[1].1, pair[0].0, pair[0].1
                )));
            }
        }

        if let Some(z_reio) = reio_z_start {
            let ceiling = boundaries.last().map_or(z_initial, |b| b.1);
            if !(z_reio > 0.0 && z_reio < ceiling) {
                return Err(ThermoError::invalid(format!(
                    "reionization start z = {z_reio} must lie in (0, {ceiling})"
                )));
            }
            let regime = if requires_helium {
                Regime::Reionization
            } else {
                Regime::ReionizationHighPrecision
            };
            boundaries.push((regime, z_reio, precision.delta_z_reio));
        }

        let mut intervals = vec![Interval {
            regime: first,
            z_start: z_initial,
            z_end: 0.0,
            width: None,
        }];
        for (regime, z, width) in boundaries {
            if let Some(last) = intervals.last_mut() {
                last.z_end = z;
            }
            intervals.push(Interval {
                regime,
                z_start: z,
                z_end: 0.0,
                width: Some(width),
            });
        }

        for iv in &intervals {
            debug!(regime = ?iv.regime, z_start = iv.z_start, z_end = iv.z_end, "schedule interval");
        }
        Ok(Self { intervals })
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn z_initial(&self) -> f64 {
        self.intervals[0].z_start
    }

    /// Index of the interval containing `z`; boundaries belong to the
    /// earlier interval.
    pub fn locate(&self, z: f64) -> Option<usize> {
        self.intervals.iter().position(|iv| iv.contains(z))
    }

    /// Regime before interval `index`, if any.
    pub fn previous(&self, index: usize) -> Option<Regime> {
        index.checked_sub(1).map(|i| self.intervals[i].regime)
    }
}

fn check_width(regime: Regime, width: f64) -> ThermoResult<()> {
    if width.is_finite() && width > 0.0 {
        Ok(())
    } else {
        Err(ThermoError::invalid(format!(
            "transition width into {regime:?} must be positive, got {width}"
        )))
    }
}
