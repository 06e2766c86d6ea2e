use embassy_time::{Duration, Instant, Timer};

use crate::scheduler::Timebase;

pub struct EmbassyTimebase;

impl Timebase for EmbassyTimebase {
    fn now_us(&self) -> u64 {
        Instant::now().as_micros()
    }

    async fn wait_until(&mut self, deadline_us: u64) {
        Timer::at(Instant::from_micros(deadline_us)).await
    }

    async fn delay_ms(&mut self, ms: u64) {
        Timer::after(Duration::from_millis(ms)).await
    }
}
