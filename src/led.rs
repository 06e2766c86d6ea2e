use core::cell::RefCell;
use core::iter::once;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use log::*;
use smart_leds::{brightness, colors, SmartLedsWrite, RGB8};

use crate::config::{LED_ACTIVE_COLOR, LED_BRIGHTNESS};

pub trait Feedback {
    fn set_active(&mut self);
    fn set_idle(&mut self);
}

/// A missing driver (`None`) turns every call into a no-op.
pub struct PixelFeedback<W> {
    led: Option<W>,
    color: RGB8,
    level: u8,
}

impl<W> PixelFeedback<W>
where
    W: SmartLedsWrite,
    W::Color: From<RGB8>,
    W::Error: core::fmt::Debug,
{
    pub fn new(led: Option<W>) -> Self {
        let mut feedback = Self {
            led,
            color: LED_ACTIVE_COLOR,
            level: LED_BRIGHTNESS,
        };
        if feedback.led.is_none() {
            warn!("[Feedback] No LED available, running without visual feedback");
        }
        feedback.set_idle();
        feedback
    }

    pub fn with_color(mut self, color: RGB8, level: u8) -> Self {
        self.color = color;
        self.level = level;
        self
    }

    fn show(&mut self, color: RGB8) {
        let level = self.level;
        if let Some(led) = self.led.as_mut() {
            if let Err(e) = led.write(brightness(once(color), level)) {
                debug!("[Feedback] LED write failed: {:?}", e);
            }
        }
    }
}

impl<W> Feedback for PixelFeedback<W>
where
    W: SmartLedsWrite,
    W::Color: From<RGB8>,
    W::Error: core::fmt::Debug,
{
    fn set_active(&mut self) {
        self.show(self.color);
    }

    fn set_idle(&mut self) {
        self.show(colors::BLACK);
    }
}

pub struct SharedFeedback<M: RawMutex, F> {
    inner: Mutex<M, RefCell<F>>,
}

impl<M: RawMutex, F: Feedback> SharedFeedback<M, F> {
    pub fn new(feedback: F) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(feedback)),
        }
    }

    pub fn set_active(&self) {
        self.inner.lock(|f| f.borrow_mut().set_active())
    }

    pub fn set_idle(&self) {
        self.inner.lock(|f| f.borrow_mut().set_idle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use std::vec::Vec;

    #[derive(Default)]
    struct RecordingStrip {
        frames: Vec<Vec<RGB8>>,
    }

    impl SmartLedsWrite for RecordingStrip {
        type Error = ();
        type Color = RGB8;

        fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
        where
            T: IntoIterator<Item = I>,
            I: Into<Self::Color>,
        {
            self.frames.push(iterator.into_iter().map(Into::into).collect());
            Ok(())
        }
    }

    #[test]
    fn starts_idle_then_pulses_active_color() {
        let mut feedback = PixelFeedback::new(Some(RecordingStrip::default()));
        feedback.set_active();
        feedback.set_idle();

        let frames = &feedback.led.as_ref().unwrap().frames;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], [colors::BLACK]);
        assert_eq!(frames[1], [LED_ACTIVE_COLOR]);
        assert_eq!(frames[2], [colors::BLACK]);
    }

    #[test]
    fn brightness_scales_active_color() {
        let mut feedback = PixelFeedback::new(Some(RecordingStrip::default()))
            .with_color(RGB8 { r: 0, g: 200, b: 0 }, 0);
        feedback.set_active();

        let frames = &feedback.led.as_ref().unwrap().frames;
        assert_eq!(frames.last().unwrap()[0], colors::BLACK);
    }

    #[test]
    fn missing_led_is_silent() {
        let shared = SharedFeedback::<NoopRawMutex, _>::new(PixelFeedback::<RecordingStrip>::new(
            None,
        ));
        shared.set_active();
        shared.set_idle();
    }
}
