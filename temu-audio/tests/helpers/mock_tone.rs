//! Tone device that never touches hardware

use std::sync::Arc;
use temu_audio::error::{Error, Result};
use temu_audio::tone::{ToneControls, ToneDevice, ToneParams};

pub struct MockTone {
    controls: ToneControls,
    pub running: bool,
    pub enable_calls: usize,
    /// Make the next `enable()` calls fail
    pub fail_enable: bool,
}

impl MockTone {
    pub fn new(sample_rate: f64) -> Self {
        let params = Arc::new(ToneParams::new(sample_rate, 880.0, 16383.0));
        Self {
            controls: ToneControls::new(params),
            running: false,
            enable_calls: 0,
            fail_enable: false,
        }
    }
}

impl ToneDevice for MockTone {
    fn controls(&self) -> &ToneControls {
        &self.controls
    }

    fn enable(&mut self) -> Result<()> {
        self.enable_calls += 1;
        if self.fail_enable {
            return Err(Error::Hardware("mock tone device unavailable".to_string()));
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.controls.silence();
        self.running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
