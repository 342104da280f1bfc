
use crate::SubSystem;

/// Represents a mock for `MainBus`: one flat 64 KiB array with no cartridge
/// or bank controller attached, so tests can place code and data anywhere.
pub struct MockBus {
    pub data: Vec<u8>,
}

impl Default for MockBus {
    fn default() -> Self {
        Self {
            data: vec![0u8; 0x10000],
        }
    }
}

impl MockBus {
    /// A mock bus with the given program placed at address 0.
    pub fn with_program(program: &[u8]) -> Self {
        let mut bus = Self::default();
        bus.data[..program.len()].copy_from_slice(program);
        bus
    }
}

impl SubSystem for MockBus {
    fn write(&mut self, address: u16, value: u8) {
        self.data[usize::from(address)] = value;
    }

    fn read(&mut self, address: u16) -> u8 {
        self.data[usize::from(address)]
    }
}
