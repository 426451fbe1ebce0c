use std::path::Path;
use th_config::*;
use th_core::units::kelvin;
use th_thermo::{NamedLevel, ReionizationInput, ReionizationModel, XeLevel};

#[test]
fn minimal_file_fills_defaults() {
    let run = from_yaml_str("version: 1\nname: minimal\n").unwrap();
    assert_eq!(run, RunFile::new("minimal"));
    assert!((kelvin(run.background.t_cmb) - 2.7255).abs() < 1e-12);
    assert_eq!(run.rates, RatesDef::Analytic { fudge_h: 1.14 });
    assert_eq!(run.output.every, 1);
}

#[test]
fn named_levels_and_tagged_models_parse() {
    let run = from_yaml_str(
        "version: 1
name: levels
rates:
  provider: tabulated
thermo:
  reionization:
    model: many_tanh
    z: [3.5, 11.3]
    xe: [full, 1.08]
  reionization_input:
    mode: optical_depth
    tau: 0.05
",
    )
    .unwrap();
    assert_eq!(
        run.rates,
        RatesDef::Tabulated {
            fudge_h: 1.125,
            escape_correction: true
        }
    );
    match &run.thermo.reionization {
        ReionizationModel::ManyTanh { z, xe, width } => {
            assert_eq!(z, &vec![3.5, 11.3]);
            assert_eq!(xe, &vec![XeLevel::Named(NamedLevel::Full), XeLevel::Value(1.08)]);
            assert_eq!(*width, 0.5);
        }
        other => panic!("unexpected model {other:?}"),
    }
    assert_eq!(run.thermo.reionization_input, ReionizationInput::OpticalDepth { tau: 0.05 });
}

#[test]
fn unknown_provider_is_a_parse_error() {
    let err = from_yaml_str("version: 1\nname: x\nrates:\n  provider: magic\n").unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)), "{err}");
}

#[test]
fn invalid_files_fail_validation() {
    let err = from_yaml_str("version: 7\nname: x\n").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Validation(ValidationError::UnsupportedVersion { version: 7 })
    ));

    let bins_with_tau = "version: 1
name: bins
thermo:
  reionization:
    model: bins_tanh
    z: [6.0, 10.0]
    xe: [1.08, 0.5]
  reionization_input:
    mode: optical_depth
    tau: 0.05
";
    let err = from_yaml_str(bins_with_tau).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ValidationError::Thermo(_))), "{err}");
}

#[test]
fn roundtrip_yaml_and_json() {
    let mut run = RunFile::new("roundtrip");
    run.rates = RatesDef::Tabulated {
        fudge_h: 1.125,
        escape_correction: false,
    };
    run.thermo.reionization = ReionizationModel::half_tanh(9.5);
    run.thermo.heating.annihilation = 2e-7;
    run.output.every = 5;

    let temp_dir = std::env::temp_dir();
    let path = temp_dir.join("th_config_roundtrip.yaml");
    save(&path, &run).unwrap();
    assert_eq!(load(&path).unwrap(), run);

    let path = temp_dir.join("th_config_roundtrip.json");
    save(&path, &run).unwrap();
    let loaded = load(&path).unwrap();
    assert_eq!(loaded.name, run.name);
    assert_eq!(loaded.rates, run.rates);
    assert_eq!(loaded.output, run.output);
    assert!((loaded.thermo.heating.annihilation - 2e-7).abs() < 1e-20);
}

#[test]
fn unknown_extension_is_rejected() {
    let err = load(Path::new("run.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == "toml"));
}

#[test]
fn bad_background_is_reported_when_preparing() {
    let mut run = RunFile::new("negative");
    run.background.omega_b = -0.02;
    assert!(matches!(run.prepare(), Err(ConfigError::Background(_))));
}

#[test]
fn prepared_run_passes_checks() {
    let prepared = RunFile::new("check").prepare().unwrap();
    assert_eq!(prepared.rates.name(), "analytic");
    prepared.check().unwrap();
}

#[test]
fn demos_load_and_validate() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
    for name in ["planck_camb.yaml", "planck_tau.yaml", "many_tanh_annihilation.yaml"] {
        let run = load(&root.join(name)).unwrap_or_else(|e| panic!("Failed to load {name}: {e}"));
        run.prepare()
            .and_then(|p| p.check())
            .unwrap_or_else(|e| panic!("Failed to check {name}: {e}"));
    }
}
