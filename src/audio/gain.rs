use super::frame::StereoFrame;

/// Anything that processes a block of frames in place.
pub trait Effect: Send {
    fn process(&mut self, buf: &mut [StereoFrame]);
}

/// The named gain stages, in the order they are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GainStage {
    Master, // linear 0..1 volume
    Trim,   // decibels
}

impl GainStage {
    /// Converts a control value in this stage's unit to a linear multiplier.
    pub fn to_linear(self, value: f32) -> f32 {
        match self {
            GainStage::Master => value,
            GainStage::Trim => db_to_linear(value),
        }
    }
}

pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

// gain
#[derive(Clone, Copy, Debug)]
pub struct Gain {
    linear: f32,
}

impl Gain {
    pub fn new(linear: f32) -> Self {
        let mut gain = Self { linear: 1.0 };
        gain.set_linear(linear);
        gain
    }

    /// Never negative; NaN silences.
    pub fn set_linear(&mut self, linear: f32) {
        self.linear = if linear.is_nan() { 0.0 } else { linear.max(0.0) };
    }

    pub fn linear(&self) -> f32 {
        self.linear
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Effect for Gain {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        if self.linear == 1.0 {
            return;
        }
        for f in buf.iter_mut() {
            *f = *f * self.linear;
        }
    }
}

/// Master then trim.
#[derive(Clone, Copy, Debug, Default)]
pub struct GainChain {
    master: Gain,
    trim: Gain,
}

impl GainChain {
    pub fn new(master: f32, trim_db: f32) -> Self {
        let mut chain = Self::default();
        chain.set(GainStage::Master, master);
        chain.set(GainStage::Trim, trim_db);
        chain
    }

    pub fn set(&mut self, stage: GainStage, value: f32) {
        let linear = stage.to_linear(value);
        match stage {
            GainStage::Master => self.master.set_linear(linear),
            GainStage::Trim => self.trim.set_linear(linear),
        }
    }

    pub fn linear(&self, stage: GainStage) -> f32 {
        match stage {
            GainStage::Master => self.master.linear(),
            GainStage::Trim => self.trim.linear(),
        }
    }
}

impl Effect for GainChain {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        self.master.process(buf);
        self.trim.process(buf);
    }
}
