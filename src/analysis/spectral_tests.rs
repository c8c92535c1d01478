use super::*;
use crate::analysis::bands::BandDefinition;

fn sine_frame(freq_hz: f32, amplitude: f32) -> Vec<f32> {
    (0..DEFAULT_FRAME_LEN)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq_hz * i as f32 / 512.0).sin())
        .collect()
}

fn default_analyzer() -> SpectralAnalyzer {
    SpectralAnalyzer::new(DEFAULT_FRAME_LEN, BandConfig::default())
}

#[test]
fn test_zero_frame_yields_zero_powers() {
    let analyzer = default_analyzer();
    let powers = analyzer.analyze(&[0.0; DEFAULT_FRAME_LEN]).unwrap();

    assert_eq!(powers.len(), 4);
    for band in powers.iter() {
        assert!(band.power.is_finite());
        assert_eq!(band.power, 0.0);
    }
}

#[test]
fn test_short_frame_rejected() {
    let analyzer = default_analyzer();
    let result = analyzer.analyze(&[1.0; 100]);

    match result {
        Err(SignalError::InsufficientSamples { required, provided }) => {
            assert_eq!(required, 128);
            assert_eq!(provided, 100);
        }
        other => panic!("Expected InsufficientSamples, got {:?}", other),
    }
}

#[test]
fn test_longer_frame_reads_first_n_samples() {
    let analyzer = default_analyzer();
    let mut long = sine_frame(20.0, 1.0);
    long.extend(std::iter::repeat(5.0).take(72));

    let truncated = analyzer.analyze(&long).unwrap();
    let exact = analyzer.analyze(&long[..DEFAULT_FRAME_LEN]).unwrap();
    assert_eq!(truncated, exact);
}

#[test]
fn test_analysis_is_deterministic() {
    let analyzer = default_analyzer();
    let frame: Vec<f32> = (0..DEFAULT_FRAME_LEN)
        .map(|i| ((i * 37) % 11) as f32 - 5.0)
        .collect();

    let first = analyzer.analyze(&frame).unwrap();
    let second = analyzer.analyze(&frame).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_beta_sine_dominates_beta_band() {
    // 20 Hz -> bin 5, inside Beta (bins 3..=7)
    let analyzer = default_analyzer();
    let powers = analyzer.analyze(&sine_frame(20.0, 1.0)).unwrap();

    let beta = powers.get("Beta").unwrap();
    assert!(beta > powers.get("Alpha").unwrap());
    assert!(beta > powers.get("Theta").unwrap());
    assert!(beta > powers.get("Delta").unwrap());
}

#[test]
fn test_dc_frame_dominates_delta_band() {
    let analyzer = default_analyzer();
    let powers = analyzer.analyze(&[1.0; DEFAULT_FRAME_LEN]).unwrap();

    let delta = powers.get("Delta").unwrap();
    for band in powers.iter().filter(|band| band.name != "Delta") {
        assert!(delta > band.power, "Delta should exceed {}", band.name);
    }
}

#[test]
fn test_bin_mapping_and_normalization() {
    // Flat unit spectrum: every band integrates to 1.0 when fully in range
    let analyzer = default_analyzer();
    let spectrum = vec![1.0; DEFAULT_FRAME_LEN / 2];
    let powers = analyzer.band_powers(&spectrum);

    for band in powers.iter() {
        assert!((band.power - 1.0).abs() < 1e-6, "{} = {}", band.name, band.power);
    }
}

#[test]
fn test_range_past_last_bin_is_clipped() {
    // 250..256 Hz maps to bins 62..=64; bin 64 is past N/2 and is dropped,
    // divisor stays 3
    let bands = BandConfig::new(vec![BandDefinition::new("Top", 250.0, 256.0)], 512.0, 2)
        .unwrap();
    let analyzer = SpectralAnalyzer::new(DEFAULT_FRAME_LEN, bands);
    let spectrum = vec![1.0; DEFAULT_FRAME_LEN / 2];
    let powers = analyzer.band_powers(&spectrum);

    let top = powers.get("Top").unwrap();
    assert!((top - 2.0 / 3.0).abs() < 1e-6);
}

#[test]
fn test_collapsed_band_is_defined() {
    // 0.5..1.0 Hz both truncate to bin 0
    let bands =
        BandConfig::new(vec![BandDefinition::new("Slow", 0.5, 1.0)], 512.0, 2).unwrap();
    let analyzer = SpectralAnalyzer::new(DEFAULT_FRAME_LEN, bands);
    let frame = sine_frame(3.0, 2.0);

    let spectrum = analyzer.magnitude_spectrum(&frame).unwrap();
    let powers = analyzer.analyze(&frame).unwrap();
    let slow = powers.get("Slow").unwrap();

    assert!(slow.is_finite());
    assert!((slow - spectrum[0]).abs() < 1e-6);
}

#[test]
fn test_powers_non_negative_for_arbitrary_frames() {
    let analyzer = default_analyzer();
    for seed in 0..20u32 {
        let frame: Vec<f32> = (0..DEFAULT_FRAME_LEN as u32)
            .map(|i| {
                let x = (i.wrapping_mul(2654435761).wrapping_add(seed * 97)) % 2001;
                (x as f32 - 1000.0) * 0.37
            })
            .collect();
        let powers = analyzer.analyze(&frame).unwrap();
        assert!(powers.iter().all(|band| band.power.is_finite() && band.power >= 0.0));
    }
}
