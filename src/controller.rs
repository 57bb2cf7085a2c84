//! Controller input handling

use bitflags::bitflags;

bitflags! {
    /// Standard pad buttons, in shift-register order (A first)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Button: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const SELECT = 1 << 2;
        const START = 1 << 3;
        const UP = 1 << 4;
        const DOWN = 1 << 5;
        const LEFT = 1 << 6;
        const RIGHT = 1 << 7;
    }
}

/// Open-bus bits always present on a controller read
const OPEN_BUS: u8 = 0x40;

/// Standard NES controller
#[derive(Debug, Clone, Default)]
pub struct StandardController {
    pub buttons: Button,
    pub strobe: bool,
    /// Next bit to report; 8 means the register is exhausted
    pub index: u8,
}

impl StandardController {
    pub fn new() -> Self {
        Self {
            buttons: Button::empty(),
            strobe: false,
            index: 0,
        }
    }

    pub fn button_down(&mut self, button: Button) {
        self.buttons.insert(button);
    }

    pub fn button_up(&mut self, button: Button) {
        self.buttons.remove(button);
    }

    pub fn set_buttons(&mut self, buttons: Button) {
        self.buttons = buttons;
    }

    pub fn strobe_write(&mut self, value: u8) {
        self.strobe = value & 0x01 != 0;
        if self.strobe {
            self.index = 0;
        }
    }

    pub fn read(&mut self) -> u8 {
        if self.strobe {
            // A is reported continuously while strobe is high
            return OPEN_BUS | self.buttons.contains(Button::A) as u8;
        }

        if self.index >= 8 {
            return OPEN_BUS;
        }

        let bit = (self.buttons.bits() >> self.index) & 0x01;
        self.index += 1;
        OPEN_BUS | bit
    }
}

/// Both controller ports; `$4016` writes strobe both pads
#[derive(Debug, Clone, Default)]
pub struct ControllerPorts {
    pub port1: StandardController,
    pub port2: StandardController,
}

impl ControllerPorts {
    pub fn new() -> Self {
        Self {
            port1: StandardController::new(),
            port2: StandardController::new(),
        }
    }

    pub fn strobe_write(&mut self, value: u8) {
        self.port1.strobe_write(value);
        self.port2.strobe_write(value);
    }

    pub fn read1(&mut self) -> u8 {
        self.port1.read()
    }

    pub fn read2(&mut self) -> u8 {
        self.port2.read()
    }

    /// Port 1 or 2
    pub fn port_mut(&mut self, port: u8) -> Option<&mut StandardController> {
        match port {
            1 => Some(&mut self.port1),
            2 => Some(&mut self.port2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_out_order() {
        let mut pad = StandardController::new();
        pad.set_buttons(Button::A | Button::START | Button::RIGHT);
        pad.strobe_write(1);
        pad.strobe_write(0);

        let bits: Vec<u8> = (0..8).map(|_| pad.read() & 0x01).collect();
        assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 1]);
        assert_eq!(pad.read(), 0x40);
        assert_eq!(pad.read(), 0x40);
    }

    #[test]
    fn test_strobe_high_reports_a() {
        let mut pad = StandardController::new();
        pad.button_down(Button::A);
        pad.strobe_write(1);
        assert_eq!(pad.read(), 0x41);
        assert_eq!(pad.read(), 0x41);
        pad.button_up(Button::A);
        assert_eq!(pad.read(), 0x40);
    }

    #[test]
    fn test_ports_share_strobe() {
        let mut ports = ControllerPorts::new();
        if let Some(pad) = ports.port_mut(2) {
            pad.button_down(Button::B);
        }
        ports.strobe_write(1);
        ports.strobe_write(0);
        assert_eq!(ports.read2() & 1, 0);
        assert_eq!(ports.read2() & 1, 1);
        assert_eq!(ports.read1(), 0x40);
        assert!(ports.port_mut(3).is_none());
    }
}
