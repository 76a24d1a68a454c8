//! Tone renderer behaviour as seen from the hardware callback
//!
//! Renders into plain buffers; no audio device is needed.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::thread;
use temu_audio::tone::{ToneControls, ToneParams, ToneRenderer};

const RATE: f64 = 44100.0;

fn tone(frequency: f64, amplitude: f64) -> (ToneRenderer, ToneControls) {
    let params = Arc::new(ToneParams::new(RATE, frequency, amplitude));
    (ToneRenderer::new(Arc::clone(&params)), ToneControls::new(params))
}

/// Render `frames` stereo frames and return the left channel
fn render(renderer: &mut ToneRenderer, frames: usize) -> Vec<i16> {
    let mut out = vec![0i16; frames * 2];
    renderer.render_i16(&mut out, 2);
    out.chunks(2).map(|f| f[0]).collect()
}

fn circular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

#[test]
fn test_zero_amplitude_is_silence() {
    let (mut r, c) = tone(440.0, 0.0);
    c.set_duration(1.0);
    assert!(render(&mut r, 4096).iter().all(|&s| s == 0));
}

#[test]
fn test_zero_remaining_is_silence() {
    let (mut r, c) = tone(440.0, 32767.0);
    c.set_duration(0.0);
    assert!(render(&mut r, 4096).iter().all(|&s| s == 0));
}

#[test]
fn test_a440_cycle() {
    let (mut r, c) = tone(440.0, 32767.0);
    c.set_duration(1.0);

    let samples = render(&mut r, 1);
    assert_eq!(samples[0], 0);

    // 44100 / 440 ≈ 100.23 frames per cycle
    render(&mut r, 99);
    assert!(circular_distance(r.phase(), 0.0) < 0.02, "phase {}", r.phase());
}

#[test]
fn test_samples_follow_sine() {
    let (mut r, c) = tone(1000.0, 20000.0);
    c.set_duration(1.0);

    for (k, &s) in render(&mut r, 500).iter().enumerate() {
        let expected = (20000.0 * (TAU * 1000.0 * k as f64 / RATE).sin()).round();
        assert!((s as f64 - expected).abs() <= 1.0, "frame {}: {} vs {}", k, s, expected);
    }
}

#[test]
fn test_sequential_tones_keep_phase() {
    let (mut r, c) = tone(440.0, 30000.0);
    let first_frames = 1234;
    c.set_duration(first_frames as f64 / RATE);
    render(&mut r, 2048);
    assert_eq!(c.remaining_samples(), 0);

    // Silence between tones must not move the phase
    let boundary = (TAU * 440.0 * first_frames as f64 / RATE).rem_euclid(TAU);
    render(&mut r, 512);
    assert!(circular_distance(r.phase(), boundary) < 1e-6);

    c.set_frequency(660.0);
    c.set_duration(0.05);
    let second = render(&mut r, 1000);

    for (k, &s) in second.iter().enumerate() {
        let expected = (30000.0 * (boundary + TAU * 660.0 * k as f64 / RATE).sin()).round();
        assert!((s as f64 - expected).abs() <= 1.0, "frame {}: {} vs {}", k, s, expected);
    }
}

#[test]
fn test_no_jump_at_tone_boundary() {
    let (mut r, c) = tone(500.0, 8000.0);
    c.set_duration(0.01);
    let first = render(&mut r, 441);

    c.set_frequency(700.0);
    c.set_duration(0.01);
    let second = render(&mut r, 441);

    // Largest sample-to-sample step of a 700 Hz sine at this amplitude
    let max_step = 8000.0 * TAU * 700.0 / RATE + 2.0;
    let step = (second[0] as f64 - first[440] as f64).abs();
    assert!(step <= max_step, "step {} exceeds {}", step, max_step);
}

#[test]
fn test_controls_usable_from_another_thread() {
    let (mut r, c) = tone(440.0, 0.0);
    let remote = c.clone();
    thread::spawn(move || {
        remote.set_volume(0.5);
        remote.set_duration(0.1);
    })
    .join()
    .unwrap();

    let samples = render(&mut r, 8820);
    assert!(samples.iter().any(|&s| s != 0));
    assert!(samples[4410..].iter().all(|&s| s == 0));
}

#[test]
fn test_bad_frequency_does_not_break_later_tones() {
    let (mut r, c) = tone(440.0, 20000.0);
    c.set_frequency(f64::NAN);
    c.set_duration(1.0);
    render(&mut r, 32);
    c.set_frequency(f64::INFINITY);
    render(&mut r, 32);
    assert!(r.phase().is_finite());

    c.set_frequency(440.0);
    c.set_duration(0.5);
    let samples = render(&mut r, 1024);
    assert!(r.phase().is_finite(), "phase {}", r.phase());
    assert!(samples.iter().any(|&s| s != 0));
}
