use crate::SubSystem;
use crate::bus::InterruptRegister;
use crate::constants::*;

/// Rate selectors for the two TAC frequency bits. The tick period in machine
/// cycles is `1 << (20 - selector)`, so the table below yields 256, 4, 16
/// and 64 cycles respectively.
const TIMA_RATES: [u32; 4] = [12, 18, 16, 14];

/// DIV advances once per 64 machine cycles.
const DIV_PERIOD: u32 = 64;

/// Drives the DIV and TIMA registers.
///
/// Both counters live in the bus like every other I/O register; the struct
/// only carries the cycle accumulators between steps.
#[derive(Default)]
pub struct Timer {
    div_clock: u32,
    timer_clock: u32,
}

impl Timer {
    /// Advances the timer unit by the given number of machine cycles.
    pub fn step<T: SubSystem>(&mut self, bus: &mut T, cycles: u8) {
        self.div_clock += u32::from(cycles);
        if self.div_clock >= DIV_PERIOD {
            let div = bus.read_io(REG_DIV);
            bus.write_io(REG_DIV, div.wrapping_add((self.div_clock / DIV_PERIOD) as u8));
            self.div_clock %= DIV_PERIOD;
        }

        let tac = bus.read_io(REG_TAC);
        if tac & 0b100 == 0 {
            return;
        }

        self.timer_clock += u32::from(cycles);
        let period = 1 << (20 - TIMA_RATES[usize::from(tac & 0b11)]);
        while self.timer_clock >= period {
            self.timer_clock -= period;
            let (counter, overflow) = bus.read_io(REG_TIMA).overflowing_add(1);
            if overflow {
                let modulo = bus.read_io(REG_TMA);
                bus.write_io(REG_TIMA, modulo);
                bus.request_interrupt(InterruptRegister::TIMER);
            } else {
                bus.write_io(REG_TIMA, counter);
            }
        }
    }
}
