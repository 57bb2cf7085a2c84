//! Interrupt line shared by the CPU, PPU, APU and mapper
//!
//! Producers raise bits, the CPU clears the bit it serviced.

use bitflags::bitflags;

bitflags! {
    /// Pending interrupt classes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Interrupt: u8 {
        const BRK = 1 << 0;
        const IRQ = 1 << 1;
        const NMI = 1 << 2;
        const RESET = 1 << 3;
    }
}

/// Set of pending interrupts
#[derive(Debug, Clone, Copy, Default)]
pub struct InterruptLine {
    pending: Interrupt,
}

impl InterruptLine {
    pub fn new() -> Self {
        Self {
            pending: Interrupt::empty(),
        }
    }

    pub fn send(&mut self, interrupt: Interrupt) {
        self.pending.insert(interrupt);
    }

    pub fn clear(&mut self, interrupt: Interrupt) {
        self.pending.remove(interrupt);
    }

    pub fn is_set(&self, interrupt: Interrupt) -> bool {
        self.pending.contains(interrupt)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// All pending bits
    pub fn pending(&self) -> Interrupt {
        self.pending
    }

    /// Highest-priority pending interrupt: RESET > NMI > IRQ > BRK
    pub fn get(&self) -> Option<Interrupt> {
        [Interrupt::RESET, Interrupt::NMI, Interrupt::IRQ, Interrupt::BRK]
            .into_iter()
            .find(|i| self.pending.contains(*i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let mut line = InterruptLine::new();
        assert_eq!(line.get(), None);

        line.send(Interrupt::BRK);
        line.send(Interrupt::IRQ);
        assert_eq!(line.get(), Some(Interrupt::IRQ));

        line.send(Interrupt::NMI);
        assert_eq!(line.get(), Some(Interrupt::NMI));

        line.send(Interrupt::RESET);
        assert_eq!(line.get(), Some(Interrupt::RESET));

        line.clear(Interrupt::RESET | Interrupt::NMI);
        assert_eq!(line.get(), Some(Interrupt::IRQ));
        assert!(line.is_set(Interrupt::BRK));
    }
}
