//! Background queries used by the thermal history.

use th_background::{Background, Lcdm, LcdmParams};

#[test]
fn angular_distance_shrinks_toward_last_scattering() {
    let bg = Lcdm::new(&LcdmParams::default()).unwrap();
    let near = bg.comoving_angular_distance(1.0).unwrap();
    let far = bg.comoving_angular_distance(1100.0).unwrap();
    assert!(near > 0.0 && far > near);
    assert!(far > 13_000.0 && far < 14_500.0, "far = {far}");
    assert!(bg.comoving_angular_distance(0.0).unwrap().abs() < 1e-6);
}

#[test]
fn background_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Lcdm>();

    let bg = std::sync::Arc::new(Lcdm::new(&LcdmParams::default()).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let bg = bg.clone();
            std::thread::spawn(move || bg.conformal_time(10.0 * i as f64).unwrap())
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap() > 0.0);
    }
}

#[test]
fn baryon_photon_ratio_scales_with_scale_factor() {
    let bg = Lcdm::new(&LcdmParams::default()).unwrap();
    let r0 = bg.baryon_photon_ratio(0.0);
    assert!((bg.baryon_photon_ratio(999.0) - r0 / 1000.0).abs() < 1e-12);
    // R ~ 0.63 at z ~ 1000 for Planck-like baryon density
    assert!(bg.baryon_photon_ratio(1000.0) > 0.5 && bg.baryon_photon_ratio(1000.0) < 0.75);
}

mod props {
    use proptest::prelude::*;
    use std::sync::OnceLock;
    use th_background::{Background, Lcdm, LcdmParams};

    fn background() -> &'static Lcdm {
        static BG: OnceLock<Lcdm> = OnceLock::new();
        BG.get_or_init(|| Lcdm::new(&LcdmParams::default()).unwrap())
    }

    proptest! {
        #[test]
        fn conformal_time_decreases_with_redshift(z in 0.0f64..1e6, step in 0.01f64..1.0) {
            let bg = background();
            let z2 = z * (1.0 + step) + step;
            prop_assert!(bg.conformal_time(z2).unwrap() < bg.conformal_time(z).unwrap());
        }
    }
}
