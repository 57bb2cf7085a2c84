//! APU (Audio Processing Unit) Emulator
//!
//! Implements the Ricoh 2A03 APU with 5 channels:
//! - 2 Square wave channels
//! - 1 Triangle wave channel
//! - 1 Noise channel
//! - 1 DMC (Delta Modulation Channel)

use log::debug;

use crate::config::Config;
use crate::interrupt::{Interrupt, InterruptLine};
use crate::rom::Mapper;

/// APU registers
pub const REG_PULSE1_CTRL: u16 = 0x4000;
pub const REG_PULSE1_SWEEP: u16 = 0x4001;
pub const REG_PULSE1_FREQ_LOW: u16 = 0x4002;
pub const REG_PULSE1_FREQ_HIGH: u16 = 0x4003;
pub const REG_PULSE2_CTRL: u16 = 0x4004;
pub const REG_PULSE2_SWEEP: u16 = 0x4005;
pub const REG_PULSE2_FREQ_LOW: u16 = 0x4006;
pub const REG_PULSE2_FREQ_HIGH: u16 = 0x4007;
pub const REG_TRIANGLE_CTRL: u16 = 0x4008;
pub const REG_TRIANGLE_FREQ_LOW: u16 = 0x400A;
pub const REG_TRIANGLE_FREQ_HIGH: u16 = 0x400B;
pub const REG_NOISE_CTRL: u16 = 0x400C;
pub const REG_NOISE_FREQ: u16 = 0x400E;
pub const REG_NOISE_LENGTH: u16 = 0x400F;
pub const REG_DMC_CTRL: u16 = 0x4010;
pub const REG_DMC_DAC: u16 = 0x4011;
pub const REG_DMC_START: u16 = 0x4012;
pub const REG_DMC_LENGTH: u16 = 0x4013;
pub const REG_CHANNEL_ENABLE: u16 = 0x4015;
pub const REG_FRAME_COUNTER: u16 = 0x4017;

/// CPU cycles stolen by one DMC sample fetch
pub const DMC_STALL_CYCLES: u64 = 4;

pub const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0], // 12.5%
    [0, 1, 1, 0, 0, 0, 0, 0], // 25%
    [0, 1, 1, 1, 1, 0, 0, 0], // 50%
    [1, 0, 0, 1, 1, 1, 1, 1], // 25% negated
];

pub const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

pub const TRIANGLE_TABLE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11,
    12, 13, 14, 15,
];

pub const NOISE_PERIOD_TABLE: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

/// NTSC DMC rates in CPU cycles
pub const DMC_RATE_TABLE: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

/// Envelope generator shared by the pulse and noise channels
#[derive(Debug, Clone, Copy, Default)]
pub struct Envelope {
    pub start: bool,
    pub divider: u8,
    pub decay: u8,
}

impl Envelope {
    pub fn clock(&mut self, period: u8, looped: bool) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = period;
        } else if self.divider > 0 {
            self.divider -= 1;
        } else {
            self.divider = period;
            if self.decay > 0 {
                self.decay -= 1;
            } else if looped {
                self.decay = 15;
            }
        }
    }
}

/// How a pulse sweep unit negates its change amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepNegate {
    /// Pulse 1: `period - change - 1`
    OnesComplement,
    /// Pulse 2: `period - change`
    TwosComplement,
}

/// Square wave channel
#[derive(Debug, Clone)]
pub struct PulseChannel {
    pub enabled: bool,
    /// $4000/$4004: DDLC VVVV
    pub ctrl: u8,
    /// $4001/$4005: EPPP NSSS
    pub sweep: u8,
    pub sweep_reload: bool,
    pub sweep_counter: u8,
    pub negate: SweepNegate,

    pub envelope: Envelope,
    pub length_counter: u8,

    pub timer_period: u16,
    pub timer_counter: u16,
    pub sequencer: u8,
}

impl PulseChannel {
    pub fn new(negate: SweepNegate) -> Self {
        Self {
            enabled: false,
            ctrl: 0,
            sweep: 0,
            sweep_reload: false,
            sweep_counter: 0,
            negate,
            envelope: Envelope::default(),
            length_counter: 0,
            timer_period: 0,
            timer_counter: 0,
            sequencer: 0,
        }
    }

    fn duty(&self) -> usize {
        (self.ctrl >> 6) as usize
    }

    fn halt(&self) -> bool {
        self.ctrl & 0x20 != 0
    }

    fn constant_volume(&self) -> bool {
        self.ctrl & 0x10 != 0
    }

    fn envelope_period(&self) -> u8 {
        self.ctrl & 0x0F
    }

    pub fn set_ctrl(&mut self, value: u8) {
        self.ctrl = value;
    }

    pub fn set_sweep(&mut self, value: u8) {
        self.sweep = value;
        self.sweep_reload = true;
    }

    pub fn set_freq_low(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0x0700) | value as u16;
    }

    pub fn set_freq_high(&mut self, value: u8) {
        if self.enabled {
            self.length_counter = LENGTH_TABLE[(value >> 3) as usize];
        }
        self.timer_period = (self.timer_period & 0x00FF) | ((value & 0x07) as u16) << 8;
        self.sequencer = 0;
        self.envelope.start = true;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length_counter = 0;
        }
    }

    pub fn clock_timer(&mut self) {
        if self.timer_counter > 0 {
            self.timer_counter -= 1;
        } else {
            self.timer_counter = self.timer_period;
            self.sequencer = (self.sequencer + 1) % 8;
        }
    }

    pub fn clock_envelope(&mut self) {
        let period = self.envelope_period();
        let looped = self.halt();
        self.envelope.clock(period, looped);
    }

    pub fn clock_sweep(&mut self) {
        let enabled = self.sweep & 0x80 != 0;
        let period = (self.sweep >> 4) & 0x07;
        let negate = self.sweep & 0x08 != 0;
        let shift = self.sweep & 0x07;

        if self.sweep_counter == 0 && enabled && shift != 0 && !self.sweep_muted() {
            let change = self.timer_period >> shift;
            self.timer_period = if !negate {
                self.timer_period.wrapping_add(change)
            } else {
                match self.negate {
                    SweepNegate::OnesComplement => {
                        self.timer_period.wrapping_sub(change).wrapping_sub(1)
                    }
                    SweepNegate::TwosComplement => self.timer_period.wrapping_sub(change),
                }
            };
        }

        if self.sweep_counter == 0 || self.sweep_reload {
            self.sweep_counter = period;
            self.sweep_reload = false;
        } else {
            self.sweep_counter -= 1;
        }
    }

    pub fn clock_length(&mut self) {
        if self.length_counter > 0 && !self.halt() {
            self.length_counter -= 1;
        }
    }

    pub fn sweep_muted(&self) -> bool {
        self.timer_period < 8 || self.timer_period > 0x7FF
    }

    pub fn get_output(&self) -> u8 {
        if self.length_counter == 0
            || self.sweep_muted()
            || DUTY_TABLE[self.duty()][self.sequencer as usize] == 0
        {
            return 0;
        }
        let volume = if self.constant_volume() {
            self.envelope_period()
        } else {
            self.envelope.decay
        };
        volume & 0x0F
    }
}

/// Triangle wave channel
#[derive(Debug, Clone, Default)]
pub struct TriangleChannel {
    pub enabled: bool,
    /// $4008: CRRR RRRR
    pub ctrl: u8,
    pub linear_counter: u8,
    pub linear_reload: bool,
    pub length_counter: u8,

    pub timer_period: u16,
    pub timer_counter: u16,
    pub sequencer: u8,
}

impl TriangleChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn control(&self) -> bool {
        self.ctrl & 0x80 != 0
    }

    pub fn set_ctrl(&mut self, value: u8) {
        self.ctrl = value;
    }

    pub fn set_freq_low(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0x0700) | value as u16;
    }

    pub fn set_freq_high(&mut self, value: u8) {
        if self.enabled {
            self.length_counter = LENGTH_TABLE[(value >> 3) as usize];
        }
        self.timer_period = (self.timer_period & 0x00FF) | ((value & 0x07) as u16) << 8;
        self.linear_reload = true;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length_counter = 0;
        }
    }

    /// Clocked every CPU cycle
    pub fn clock_timer(&mut self) {
        if self.timer_counter > 0 {
            self.timer_counter -= 1;
        } else {
            self.timer_counter = self.timer_period;
            if self.linear_counter > 0 && self.length_counter > 0 {
                self.sequencer = (self.sequencer + 1) % 32;
            }
        }
    }

    pub fn clock_linear(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.ctrl & 0x7F;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }

        if !self.control() {
            self.linear_reload = false;
        }
    }

    pub fn clock_length(&mut self) {
        if self.length_counter > 0 && !self.control() {
            self.length_counter -= 1;
        }
    }

    pub fn get_output(&self) -> u8 {
        if self.linear_counter == 0 || self.length_counter == 0 {
            return 0;
        }
        TRIANGLE_TABLE[self.sequencer as usize]
    }
}

/// Noise channel
#[derive(Debug, Clone)]
pub struct NoiseChannel {
    pub enabled: bool,
    /// $400C: --LC VVVV
    pub ctrl: u8,
    /// Mode bit of $400E
    pub mode: bool,
    pub envelope: Envelope,
    pub length_counter: u8,

    pub timer_period: u16,
    pub timer_counter: u16,
    /// 15-bit LFSR
    pub shift_register: u16,
}

impl NoiseChannel {
    pub fn new() -> Self {
        Self {
            enabled: false,
            ctrl: 0,
            mode: false,
            envelope: Envelope::default(),
            length_counter: 0,
            timer_period: NOISE_PERIOD_TABLE[0],
            timer_counter: 0,
            shift_register: 1,
        }
    }

    fn halt(&self) -> bool {
        self.ctrl & 0x20 != 0
    }

    fn constant_volume(&self) -> bool {
        self.ctrl & 0x10 != 0
    }

    fn envelope_period(&self) -> u8 {
        self.ctrl & 0x0F
    }

    pub fn set_ctrl(&mut self, value: u8) {
        self.ctrl = value;
    }

    pub fn set_freq(&mut self, value: u8) {
        self.mode = value & 0x80 != 0;
        self.timer_period = NOISE_PERIOD_TABLE[(value & 0x0F) as usize];
    }

    pub fn set_length(&mut self, value: u8) {
        if self.enabled {
            self.length_counter = LENGTH_TABLE[(value >> 3) as usize];
        }
        self.envelope.start = true;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length_counter = 0;
        }
    }

    pub fn clock_timer(&mut self) {
        if self.timer_counter > 0 {
            self.timer_counter -= 1;
        } else {
            self.timer_counter = self.timer_period;
            let tap = if self.mode { 6 } else { 1 };
            let feedback = (self.shift_register ^ (self.shift_register >> tap)) & 0x01;
            self.shift_register >>= 1;
            self.shift_register |= feedback << 14;
        }
    }

    pub fn clock_envelope(&mut self) {
        let period = self.envelope_period();
        let looped = self.halt();
        self.envelope.clock(period, looped);
    }

    pub fn clock_length(&mut self) {
        if self.length_counter > 0 && !self.halt() {
            self.length_counter -= 1;
        }
    }

    pub fn get_output(&self) -> u8 {
        if self.shift_register & 0x01 == 1 || self.length_counter == 0 {
            return 0;
        }
        let volume = if self.constant_volume() {
            self.envelope_period()
        } else {
            self.envelope.decay
        };
        volume & 0x0F
    }
}

impl Default for NoiseChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// DMC (Delta Modulation Channel)
#[derive(Debug, Clone)]
pub struct DmcChannel {
    pub enabled: bool,
    /// $4010: IL-- RRRR
    pub ctrl: u8,
    /// $4012
    pub sample_address: u8,
    /// $4013
    pub sample_length: u8,
    pub irq: bool,

    pub timer_counter: u16,
    pub output_level: u8,

    pub address_counter: u16,
    pub bytes_remaining: u16,
    pub sample_buffer: Option<u8>,

    pub shift_register: u8,
    pub bits_remaining: u8,
    pub silence: bool,
}

impl DmcChannel {
    pub fn new() -> Self {
        Self {
            enabled: false,
            ctrl: 0,
            sample_address: 0,
            sample_length: 0,
            irq: false,
            timer_counter: 0,
            output_level: 0,
            address_counter: 0xC000,
            bytes_remaining: 0,
            sample_buffer: None,
            shift_register: 0,
            bits_remaining: 8,
            silence: true,
        }
    }

    fn irq_enabled(&self) -> bool {
        self.ctrl & 0x80 != 0
    }

    fn looped(&self) -> bool {
        self.ctrl & 0x40 != 0
    }

    /// Timer reload in APU cycles
    fn period(&self) -> u16 {
        DMC_RATE_TABLE[(self.ctrl & 0x0F) as usize] / 2
    }

    pub fn set_ctrl(&mut self, value: u8) {
        self.ctrl = value;
        if !self.irq_enabled() {
            self.irq = false;
        }
    }

    pub fn set_dac(&mut self, value: u8) {
        self.output_level = value & 0x7F;
    }

    pub fn set_address(&mut self, value: u8) {
        self.sample_address = value;
    }

    pub fn set_length(&mut self, value: u8) {
        self.sample_length = value;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.bytes_remaining = 0;
        } else if self.bytes_remaining == 0 {
            self.restart();
        }
    }

    /// Reload the address and length counters from $4012/$4013
    pub fn restart(&mut self) {
        self.address_counter = 0xC000 + self.sample_address as u16 * 64;
        self.bytes_remaining = self.sample_length as u16 * 16 + 1;
    }

    /// Returns true when the memory reader fetched a byte and stalled the CPU
    pub fn clock_timer(&mut self, mapper: &mut dyn Mapper) -> bool {
        let stall = self.fill_buffer(mapper);

        if self.timer_counter > 0 {
            self.timer_counter -= 1;
        } else {
            self.timer_counter = self.period();
            self.clock_output();
        }

        stall
    }

    fn fill_buffer(&mut self, mapper: &mut dyn Mapper) -> bool {
        if self.sample_buffer.is_some() || self.bytes_remaining == 0 {
            return false;
        }

        self.sample_buffer = Some(mapper.read(self.address_counter));
        self.address_counter = self.address_counter.wrapping_add(1);
        if self.address_counter == 0 {
            self.address_counter = 0x8000;
        }

        self.bytes_remaining -= 1;
        if self.bytes_remaining == 0 {
            if self.looped() {
                debug!("DMC sample loop");
                self.restart();
            } else if self.irq_enabled() {
                debug!("DMC IRQ");
                self.irq = true;
            }
        }

        true
    }

    fn clock_output(&mut self) {
        if !self.silence {
            if self.shift_register & 0x01 == 1 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }
        }
        self.shift_register >>= 1;

        self.bits_remaining -= 1;
        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            match self.sample_buffer.take() {
                Some(byte) => {
                    self.silence = false;
                    self.shift_register = byte;
                }
                None => self.silence = true,
            }
        }
    }

    pub fn get_output(&self) -> u8 {
        self.output_level & 0x7F
    }
}

impl Default for DmcChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame sequencer mode selected by $4017 bit 7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerMode {
    #[default]
    FourStep,
    FiveStep,
}

/// Frame counter for APU
#[derive(Debug, Clone, Default)]
pub struct FrameCounter {
    pub mode: SequencerMode,
    pub irq_inhibit: bool,
    pub step: u8,
    pub irq: bool,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, value: u8) {
        self.mode = if value & 0x80 != 0 {
            SequencerMode::FiveStep
        } else {
            SequencerMode::FourStep
        };
        self.irq_inhibit = value & 0x40 != 0;
        if self.irq_inhibit {
            self.irq = false;
        }
        self.step = 0;
    }
}

/// APU emulator
#[derive(Debug, Clone)]
pub struct Apu {
    pub pulse1: PulseChannel,
    pub pulse2: PulseChannel,
    pub triangle: TriangleChannel,
    pub noise: NoiseChannel,
    pub dmc: DmcChannel,
    pub frame_counter: FrameCounter,

    cycles: u64,
    frame_period: u64,
    sample_interval: u64,
    samples: Vec<f32>,
}

impl Apu {
    /// Create a new APU instance
    pub fn new(config: &Config) -> Self {
        Self {
            pulse1: PulseChannel::new(SweepNegate::OnesComplement),
            pulse2: PulseChannel::new(SweepNegate::TwosComplement),
            triangle: TriangleChannel::new(),
            noise: NoiseChannel::new(),
            dmc: DmcChannel::new(),
            frame_counter: FrameCounter::new(),
            cycles: 0,
            frame_period: config.frame_period.max(1) as u64,
            sample_interval: config.sample_interval(),
            samples: Vec::with_capacity(config.audio_buffer_capacity),
        }
    }

    /// Power-on register writes
    pub fn reset(&mut self) {
        self.write_register(REG_FRAME_COUNTER, 0);
        self.write_register(REG_CHANNEL_ENABLE, 0);
        for address in REG_PULSE1_CTRL..=REG_DMC_LENGTH {
            self.write_register(address, 0);
        }
        self.frame_counter.irq = false;
        self.dmc.irq = false;
    }

    /// Cycles since creation
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Channel enable bits as last written to $4015
    pub fn channel_enable(&self) -> u8 {
        self.pulse1.enabled as u8
            | (self.pulse2.enabled as u8) << 1
            | (self.triangle.enabled as u8) << 2
            | (self.noise.enabled as u8) << 3
            | (self.dmc.enabled as u8) << 4
    }

    fn irq_pending(&self) -> bool {
        self.frame_counter.irq || self.dmc.irq
    }

    /// Raise or withdraw the IRQ line after the flags moved
    fn update_irq(&self, was_pending: bool, interrupts: &mut InterruptLine) {
        let pending = self.irq_pending();
        if pending && !was_pending {
            interrupts.send(Interrupt::IRQ);
        } else if was_pending && !pending {
            interrupts.clear(Interrupt::IRQ);
        }
    }

    /// Read from APU registers
    pub fn read(&mut self, address: u16, interrupts: &mut InterruptLine) -> u8 {
        if address != REG_CHANNEL_ENABLE {
            return 0;
        }

        let was_pending = self.irq_pending();

        let mut value = 0u8;
        value |= if self.pulse1.length_counter > 0 { 0x01 } else { 0 };
        value |= if self.pulse2.length_counter > 0 { 0x02 } else { 0 };
        value |= if self.triangle.length_counter > 0 { 0x04 } else { 0 };
        value |= if self.noise.length_counter > 0 { 0x08 } else { 0 };
        value |= if self.dmc.bytes_remaining > 0 { 0x10 } else { 0 };
        value |= if self.frame_counter.irq { 0x40 } else { 0 };
        value |= if self.dmc.irq { 0x80 } else { 0 };

        self.frame_counter.irq = false;
        self.update_irq(was_pending, interrupts);

        value
    }

    /// Write to APU registers
    pub fn write(&mut self, address: u16, value: u8, interrupts: &mut InterruptLine) {
        let was_pending = self.irq_pending();
        self.write_register(address, value);
        self.update_irq(was_pending, interrupts);
    }

    fn write_register(&mut self, address: u16, value: u8) {
        match address {
            REG_PULSE1_CTRL => self.pulse1.set_ctrl(value),
            REG_PULSE1_SWEEP => self.pulse1.set_sweep(value),
            REG_PULSE1_FREQ_LOW => self.pulse1.set_freq_low(value),
            REG_PULSE1_FREQ_HIGH => self.pulse1.set_freq_high(value),
            REG_PULSE2_CTRL => self.pulse2.set_ctrl(value),
            REG_PULSE2_SWEEP => self.pulse2.set_sweep(value),
            REG_PULSE2_FREQ_LOW => self.pulse2.set_freq_low(value),
            REG_PULSE2_FREQ_HIGH => self.pulse2.set_freq_high(value),
            REG_TRIANGLE_CTRL => self.triangle.set_ctrl(value),
            REG_TRIANGLE_FREQ_LOW => self.triangle.set_freq_low(value),
            REG_TRIANGLE_FREQ_HIGH => self.triangle.set_freq_high(value),
            REG_NOISE_CTRL => self.noise.set_ctrl(value),
            REG_NOISE_FREQ => self.noise.set_freq(value),
            REG_NOISE_LENGTH => self.noise.set_length(value),
            REG_DMC_CTRL => self.dmc.set_ctrl(value),
            REG_DMC_DAC => self.dmc.set_dac(value),
            REG_DMC_START => self.dmc.set_address(value),
            REG_DMC_LENGTH => self.dmc.set_length(value),
            REG_CHANNEL_ENABLE => {
                self.pulse1.set_enabled(value & 0x01 != 0);
                self.pulse2.set_enabled(value & 0x02 != 0);
                self.triangle.set_enabled(value & 0x04 != 0);
                self.noise.set_enabled(value & 0x08 != 0);
                self.dmc.set_enabled(value & 0x10 != 0);
                self.dmc.irq = false;
            }
            REG_FRAME_COUNTER => {
                self.frame_counter.write(value);
                debug!("frame counter mode {:?}", self.frame_counter.mode);
                if self.frame_counter.mode == SequencerMode::FiveStep {
                    self.clock_quarter_frame();
                    self.clock_half_frame();
                }
            }
            _ => {}
        }
    }

    /// Clock quarter frame operations
    pub fn clock_quarter_frame(&mut self) {
        self.pulse1.clock_envelope();
        self.pulse2.clock_envelope();
        self.triangle.clock_linear();
        self.noise.clock_envelope();
    }

    /// Clock half frame operations
    pub fn clock_half_frame(&mut self) {
        self.pulse1.clock_length();
        self.pulse1.clock_sweep();
        self.pulse2.clock_length();
        self.pulse2.clock_sweep();
        self.triangle.clock_length();
        self.noise.clock_length();
    }

    /// Advance one frame sequencer step
    fn clock_frame_step(&mut self) {
        let step = self.frame_counter.step;

        match self.frame_counter.mode {
            SequencerMode::FourStep => {
                self.clock_quarter_frame();
                if step == 1 || step == 3 {
                    self.clock_half_frame();
                }
                if step == 3 && !self.frame_counter.irq_inhibit {
                    self.frame_counter.irq = true;
                }
                self.frame_counter.step = (step + 1) % 4;
            }
            SequencerMode::FiveStep => {
                if step < 4 {
                    self.clock_quarter_frame();
                }
                if step == 1 || step == 4 {
                    self.clock_half_frame();
                }
                self.frame_counter.step = (step + 1) % 5;
            }
        }
    }

    /// Advance one CPU cycle. Returns true when the DMC stalled the CPU.
    pub fn step(&mut self, mapper: &mut dyn Mapper, interrupts: &mut InterruptLine) -> bool {
        let was_pending = self.irq_pending();
        self.cycles = self.cycles.wrapping_add(1);

        if self.cycles % self.sample_interval == 0 {
            let sample = self.sample();
            self.samples.push(sample);
        }

        let mut stall = false;
        if self.cycles % 2 == 0 {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
            self.noise.clock_timer();
            stall = self.dmc.clock_timer(mapper);
        }

        self.triangle.clock_timer();

        if self.cycles % self.frame_period == 0 {
            self.clock_frame_step();
        }

        self.update_irq(was_pending, interrupts);
        stall
    }

    /// Mix the current channel outputs
    pub fn sample(&self) -> f32 {
        mix(
            self.pulse1.get_output(),
            self.pulse2.get_output(),
            self.triangle.get_output(),
            self.noise.get_output(),
            self.dmc.get_output(),
        )
    }

    /// Samples produced since the last drain
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Hand over the accumulated samples, keeping the buffer's allocation
    pub fn drain_samples(&mut self) -> Vec<f32> {
        let drained = self.samples.to_vec();
        self.samples.clear();
        drained
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Non-linear NES mixer
pub fn mix(pulse1: u8, pulse2: u8, triangle: u8, noise: u8, dmc: u8) -> f32 {
    let p1 = pulse1 as f32;
    let p2 = pulse2 as f32;
    let triangle = triangle as f32;
    let noise = noise as f32;
    let dmc = dmc as f32;

    let pulse_out = if p1 != 0.0 || p2 != 0.0 {
        95.88 / ((8128.0 / (p1 + p2)) + 100.0)
    } else {
        0.0
    };

    let tnd_out = if triangle != 0.0 || noise != 0.0 || dmc != 0.0 {
        159.79 / (1.0 / ((triangle / 8227.0) + (noise / 12241.0) + (dmc / 22638.0)) + 100.0)
    } else {
        0.0
    };

    pulse_out + tnd_out
}
