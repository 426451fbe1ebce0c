use crate::schema::RunFile;
use th_thermo::ThermoError;

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Unsupported run file version {version} (latest is {LATEST_VERSION})")]
    UnsupportedVersion { version: u32 },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid thermal parameters: {0}")]
    Thermo(#[from] ThermoError),
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Checks that need no background tables. Background parameters are checked
/// when the model is built.
pub fn validate_run(run: &RunFile) -> Result<(), ValidationError> {
    if run.version == 0 || run.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion { version: run.version });
    }
    if run.name.trim().is_empty() {
        return Err(invalid("name", "\"\"", "must not be empty"));
    }

    let fudge = run.rates.fudge_h();
    if !(fudge.is_finite() && fudge > 0.0) {
        return Err(invalid("rates.fudge_h", fudge, "must be positive"));
    }
    if run.output.every == 0 {
        return Err(invalid("output.every", 0, "must be at least 1"));
    }

    run.thermo.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RatesDef;

    #[test]
    fn default_run_validates() {
        validate_run(&RunFile::new("default")).unwrap();
    }

    #[test]
    fn future_version_is_rejected() {
        let mut run = RunFile::new("future");
        run.version = LATEST_VERSION + 1;
        assert!(matches!(
            validate_run(&run),
            Err(ValidationError::UnsupportedVersion { version }) if version == LATEST_VERSION + 1
        ));
    }

    #[test]
    fn field_errors_name_the_field() {
        let mut run = RunFile::new("bad");
        run.rates = RatesDef::Analytic { fudge_h: -1.0 };
        match validate_run(&run) {
            Err(ValidationError::InvalidValue { field, .. }) => assert_eq!(field, "rates.fudge_h"),
            other => panic!("unexpected {other:?}"),
        }

        let mut run = RunFile::new("bad");
        run.output.every = 0;
        assert!(matches!(
            validate_run(&run),
            Err(ValidationError::InvalidValue { ref field, .. }) if field == "output.every"
        ));
    }

    #[test]
    fn thermal_parameters_are_checked() {
        let mut run = RunFile::new("helium");
        run.thermo.yhe = 0.9;
        assert!(matches!(validate_run(&run), Err(ValidationError::Thermo(_))));
    }
}
