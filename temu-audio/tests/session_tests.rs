//! Playback session integration tests
//!
//! Drives the full load → shape → convert → schedule → play pipeline against
//! a mock player, observing state through the event bus.

mod helpers;

use helpers::{raw_console_sample, wav_sample, write_fixture, MockPlayer};
use std::thread;
use std::time::Duration;
use temu_audio::audio::PcmFormat;
use temu_audio::error::Error;
use temu_audio::playback::{BusyPolicy, Completion, PlaybackSession, SessionSettings};
use temu_common::events::{AudioEvent, EventBus, PlaybackState};
use tokio::sync::broadcast::Receiver;

use PlaybackState::*;

fn session_with(
    player: MockPlayer,
    settings: SessionSettings,
) -> (PlaybackSession<MockPlayer>, Receiver<AudioEvent>) {
    let events = EventBus::new(256);
    let rx = events.subscribe();
    (PlaybackSession::new(player, settings, events), rx)
}

fn session() -> (PlaybackSession<MockPlayer>, Receiver<AudioEvent>) {
    session_with(MockPlayer::new(), SessionSettings::default())
}

/// Drain state transitions seen so far
fn transitions(rx: &mut Receiver<AudioEvent>) -> Vec<(PlaybackState, PlaybackState)> {
    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let AudioEvent::PlaybackStateChanged {
            old_state, new_state, ..
        } = event
        {
            seen.push((old_state, new_state));
        }
    }
    seen
}

fn failures(rx: &mut Receiver<AudioEvent>) -> Vec<String> {
    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let AudioEvent::PlaybackFailed { error, .. } = event {
            seen.push(error);
        }
    }
    seen
}

#[test]
fn test_raw_sample_walks_state_machine() {
    let (_dir, path) = raw_console_sample(2.0);
    let (mut session, mut rx) = session();

    session.play(&path, true).unwrap();

    assert_eq!(
        transitions(&mut rx),
        vec![
            (Idle, Loading),
            (Loading, Converting),
            (Converting, Scheduled),
            (Scheduled, Playing),
        ]
    );
    assert_eq!(session.state(), Playing);
    assert!(session.player().running);

    assert!(session.player().complete());
    assert_eq!(session.state(), Idle);
    assert_eq!(transitions(&mut rx), vec![(Playing, Idle)]);
    assert_eq!(session.completions(), 1);
}

#[test]
fn test_two_second_sample_fills_nine_seconds() {
    let (_dir, path) = raw_console_sample(2.0);
    let (mut session, _rx) = session();

    session.play(&path, true).unwrap();

    let buffers = &session.player().buffers;
    assert_eq!(buffers.len(), 1);
    // 144000 bytes of 8 kHz stereo = 72000 frames, at 44.1 kHz
    assert_eq!(buffers[0].frame_count(), 396_900);
    assert_eq!(buffers[0].channels.len(), 2);
    assert_eq!(buffers[0].format, PcmFormat::host());
    assert_eq!(session.input_format(), Some(&PcmFormat::console()));
}

#[test]
fn test_wav_sample_plays() {
    let format = PcmFormat::pcm8(8000.0, 1);
    let (_dir, path) = wav_sample(0.5, format);
    let settings = SessionSettings {
        target_duration: 1.0,
        ..SessionSettings::default()
    };
    let (mut session, _rx) = session_with(MockPlayer::new(), settings);

    session.play(&path, false).unwrap();

    assert_eq!(session.state(), Playing);
    assert_eq!(session.input_format(), Some(&format));
    let buffer = &session.player().buffers[0];
    assert_eq!(buffer.frame_count(), 44_100);
    assert_eq!(buffer.channels[0], buffer.channels[1]);
}

#[test]
fn test_silent_sample_stays_silent() {
    let (_dir, path) = write_fixture("silence.raw", &vec![128u8; 16_000]);
    let (mut session, _rx) = session();

    session.play(&path, true).unwrap();

    let buffer = &session.player().buffers[0];
    assert!(buffer.channels.iter().flatten().all(|s| s.abs() < 1e-3));
}

#[test]
fn test_missing_file_stops_session() {
    let (mut session, _rx) = session();

    let result = session.play("/nonexistent/temu/beep.raw", true);

    assert!(matches!(result, Err(Error::FileNotFound { .. })));
    assert_eq!(session.state(), Stopped);
    assert_eq!(session.player().attach_calls, 0);
    assert!(!session.player().running);
}

#[test]
fn test_missing_file_reports_failure_event() {
    let (mut session, mut rx) = session();

    let _ = session.play("/nonexistent/temu/beep.raw", true);

    let errors = failures(&mut rx);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("beep.raw"));
}

#[test]
fn test_malformed_wav_stops_session() {
    let (_dir, path) = write_fixture("broken.wav", b"RIFX\0\0\0\0WAVEfmt ");
    let (mut session, _rx) = session();

    assert!(matches!(session.play(&path, false), Err(Error::Format(_))));
    assert_eq!(session.state(), Stopped);
    assert!(session.player().buffers.is_empty());
}

#[test]
fn test_empty_raw_sample_fails() {
    let (_dir, path) = write_fixture("empty.raw", &[]);
    let (mut session, _rx) = session();

    assert!(matches!(session.play(&path, true), Err(Error::EmptySource)));
    assert_eq!(session.state(), Stopped);
}

#[test]
fn test_attach_failure_is_retryable() {
    let (_dir, path) = raw_console_sample(0.25);
    let (mut session, _rx) = session_with(MockPlayer::failing(), SessionSettings::default());

    assert!(matches!(session.play(&path, true), Err(Error::Hardware(_))));
    assert_eq!(session.state(), Stopped);

    session.player_mut().fail_attach = false;
    session.play(&path, true).unwrap();
    assert_eq!(session.state(), Playing);
    assert_eq!(session.player().attach_calls, 2);
}

#[test]
fn test_busy_session_rejects_second_request() {
    let (_dir, path) = raw_console_sample(0.25);
    let (mut session, _rx) = session();

    session.play(&path, true).unwrap();
    assert!(matches!(session.play(&path, true), Err(Error::Busy)));

    assert_eq!(session.state(), Playing);
    assert_eq!(session.player().buffers.len(), 1);
}

#[test]
fn test_replace_policy_flushes_in_flight_buffer() {
    let (_dir, path) = raw_console_sample(0.25);
    let settings = SessionSettings {
        busy_policy: BusyPolicy::Replace,
        ..SessionSettings::default()
    };
    let (mut session, _rx) = session_with(MockPlayer::new(), settings);

    session.play(&path, true).unwrap();
    let first = session.player().last_ticket().unwrap();
    session.play(&path, true).unwrap();

    assert!(first.has_fired());
    assert_eq!(session.player().buffers.len(), 2);
    assert_eq!(session.state(), Playing);
    assert_eq!(session.completions(), 1);
}

#[test]
fn test_new_request_accepted_after_completion() {
    let (_dir, path) = raw_console_sample(0.25);
    let (mut session, _rx) = session();

    session.play(&path, true).unwrap();
    session.player().complete();
    session.play(&path, true).unwrap();

    assert_eq!(session.state(), Playing);
    assert_eq!(session.player().buffers.len(), 2);
}

#[test]
fn test_stop_is_idempotent() {
    let (_dir, path) = raw_console_sample(0.25);
    let (mut session, mut rx) = session();

    // From Idle
    session.stop().unwrap();
    session.stop().unwrap();
    assert_eq!(session.state(), Stopped);
    assert_eq!(transitions(&mut rx), vec![(Idle, Stopped)]);

    session.play(&path, true).unwrap();
    session.stop().unwrap();
    session.stop().unwrap();

    assert_eq!(session.state(), Stopped);
    assert!(!session.player().running);
    let seen = transitions(&mut rx);
    assert_eq!(seen.last(), Some(&(Playing, Stopped)));
    assert_eq!(seen.iter().filter(|(_, to)| *to == Stopped).count(), 1);
}

#[test]
fn test_request_after_stop_passes_through_idle() {
    let (_dir, path) = raw_console_sample(0.25);
    let (mut session, mut rx) = session();

    session.play(&path, true).unwrap();
    session.stop().unwrap();
    transitions(&mut rx);

    session.play(&path, true).unwrap();
    let seen = transitions(&mut rx);
    assert_eq!(seen[..2], [(Stopped, Idle), (Idle, Loading)]);
    assert_eq!(seen.last(), Some(&(Scheduled, Playing)));
}

#[test]
fn test_replace_policy_reports_stop_then_idle() {
    let (_dir, path) = raw_console_sample(0.25);
    let settings = SessionSettings {
        busy_policy: BusyPolicy::Replace,
        ..SessionSettings::default()
    };
    let (mut session, mut rx) = session_with(MockPlayer::new(), settings);

    session.play(&path, true).unwrap();
    transitions(&mut rx);

    session.play(&path, true).unwrap();
    let seen = transitions(&mut rx);
    assert_eq!(seen[..3], [(Playing, Stopped), (Stopped, Idle), (Idle, Loading)]);
}

#[test]
fn test_stop_racing_completion_fires_once() {
    let (_dir, path) = raw_console_sample(0.25);

    for _ in 0..50 {
        let (mut session, _rx) = session();
        session.play(&path, true).unwrap();

        let ticket = session.player().last_ticket().unwrap();
        let render = thread::spawn(move || ticket.fire(Completion::PlayedBack));
        session.stop().unwrap();
        render.join().unwrap();

        assert_eq!(session.completions(), 1);
        assert_eq!(session.state(), Stopped);
    }
}

#[test]
fn test_wait_for_completion() {
    let (_dir, path) = raw_console_sample(0.25);
    let (mut session, _rx) = session();
    session.play(&path, true).unwrap();

    assert_eq!(session.wait_for_completion(Duration::ZERO), Playing);

    let ticket = session.player().last_ticket().unwrap();
    let render = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        ticket.fire(Completion::PlayedBack)
    });
    assert_eq!(session.wait_for_completion(Duration::from_secs(5)), Idle);
    assert!(render.join().unwrap());
}

#[test]
fn test_sessions_are_independent() {
    let (_dir, path) = raw_console_sample(0.25);
    let (mut a, _rx_a) = session();
    let (mut b, _rx_b) = session();

    a.play(&path, true).unwrap();
    b.play(&path, true).unwrap();
    assert_ne!(a.id(), b.id());

    a.stop().unwrap();
    assert_eq!(a.state(), Stopped);
    assert_eq!(b.state(), Playing);
}
