use std::time::{SystemTime, UNIX_EPOCH};

const SECONDS: usize = 0;
const MINUTES: usize = 1;
const HOURS: usize = 2;
const DAY_LO: usize = 3;
const DAY_HI: usize = 4;

/// Halt bit in the day-high register; while set the clock does not advance.
const FLAG_HALT: u8 = 0x40;
/// Day-counter overflow bit; sticky until software clears it.
const FLAG_OVERFLOW: u8 = 0x80;

/// Writable bits per register. The unused bits read back as written here,
/// matching cartridge behavior.
const WRITE_MASKS: [u8; 5] = [0x3F, 0x3F, 0x1F, 0xFF, 0xC1];

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Battery-backed real-time clock carried by some MBC3 cartridges.
///
/// The live counters advance lazily: elapsed wall-clock seconds are folded
/// in whenever the latch protocol completes, so no periodic tick is needed.
/// Mapped reads always return the latched snapshot.
pub(crate) struct Rtc {
    /// Live counters: seconds, minutes, hours, day low, day high/flags.
    ticking: [u8; 5],
    /// Snapshot frozen by the 0x00 -> 0x01 latch sequence.
    latched: [u8; 5],
    prelatched: bool,
    /// Wall-clock second the live counters were last brought up to date.
    last_tick: u64,
}

impl Rtc {
    pub fn new() -> Rtc {
        Rtc {
            ticking: [0; 5],
            latched: [0; 5],
            prelatched: false,
            last_tick: now_secs(),
        }
    }

    /// Latch-register write protocol: a 0x00 write arms the latch, a 0x01
    /// write while armed advances the clock and freezes a snapshot.
    pub fn latch(&mut self, value: u8) {
        match value {
            0x00 => self.prelatched = true,
            0x01 if self.prelatched => {
                self.prelatched = false;
                self.step_at(now_secs());
                self.latched = self.ticking;
            }
            _ => self.prelatched = false,
        }
    }

    /// Fold elapsed wall-clock time into the live counters.
    pub fn step_at(&mut self, now: u64) {
        let elapsed = now.saturating_sub(self.last_tick);
        self.last_tick = now;

        if self.ticking[DAY_HI] & FLAG_HALT != 0 || elapsed == 0 {
            return;
        }

        let mut seconds = self.ticking[SECONDS] as u64
            + self.ticking[MINUTES] as u64 * 60
            + self.ticking[HOURS] as u64 * 3600
            + elapsed;
        let day_base = self.ticking[DAY_LO] as u64
            | ((self.ticking[DAY_HI] as u64 & 0x01) << 8);

        let days = day_base + seconds / 86_400;
        seconds %= 86_400;

        self.ticking[SECONDS] = (seconds % 60) as u8;
        self.ticking[MINUTES] = (seconds / 60 % 60) as u8;
        self.ticking[HOURS] = (seconds / 3600) as u8;
        self.ticking[DAY_LO] = days as u8;

        let mut hi = self.ticking[DAY_HI] & !0x01;
        hi |= ((days >> 8) & 0x01) as u8;
        // The day counter is 9 bits; passing day 511 sets the sticky
        // overflow flag.
        if days > 0x1FF {
            hi |= FLAG_OVERFLOW;
        }
        self.ticking[DAY_HI] = hi;
    }

    /// Mapped register read; always serves the latched snapshot.
    pub fn read(&self, reg: usize) -> u8 {
        self.latched.get(reg).copied().unwrap_or(0xFF)
    }

    /// Mapped register write; lands in the live counters.
    pub fn write(&mut self, reg: usize, value: u8) {
        self.write_at(reg, value, now_secs());
    }

    /// Any wall-clock time pending since the last advance is folded in
    /// first, so counters the write does not touch keep it; the write then
    /// re-bases the elapsed-time origin.
    pub fn write_at(&mut self, reg: usize, value: u8, now: u64) {
        if reg < 5 {
            self.step_at(now);
            self.ticking[reg] = value & WRITE_MASKS[reg];
        }
    }

    #[cfg(test)]
    pub fn ticking(&self) -> [u8; 5] {
        self.ticking
    }

    #[cfg(test)]
    pub fn set_last_tick(&mut self, secs: u64) {
        self.last_tick = secs;
    }
}
