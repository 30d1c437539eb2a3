//! # LED Tide Indicator Frames
//!
//! The physical meter is a strip of RGB indicators laid out bottom to top:
//!
//! ```text
//! [low x2] [level x12 ........................] [high x2]
//!  falling   min_led_level (-2 ft) → +9 ft        rising
//! ```
//!
//! Given a tide level and trend, each [`DisplayMode`] produces a sequence of
//! [`LedFrame`]s, each held for its own `display_time`. The consumer renders a
//! frame, waits, and moves on; when the sequence ends it asks the tide state
//! for a fresh snapshot and starts over. Driving the actual strip is left to
//! whatever sits behind the renderer.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use std::time::Duration;

/// Indicator counts and the level the first level indicator stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedLayout {
    pub low_leds: usize,
    pub high_leds: usize,
    pub level_leds: usize,
    /// Tide level in whole feet shown by level indicator 0
    pub min_led_level: i32,
}

impl Default for LedLayout {
    fn default() -> Self {
        LedLayout {
            low_leds: 2,
            high_leds: 2,
            level_leds: 12,
            min_led_level: -2,
        }
    }
}

impl LedLayout {
    pub fn total(&self) -> usize {
        self.low_leds + self.level_leds + self.high_leds
    }

    /// Level in whole feet at which indicator `n` lights up.
    fn threshold(&self, n: usize) -> i32 {
        n as i32 + self.min_led_level
    }
}

/// One complete state of the strip and how long to show it.
#[derive(Clone, Debug, PartialEq)]
pub struct LedFrame {
    pub low: Vec<Rgb888>,
    pub level: Vec<Rgb888>,
    pub high: Vec<Rgb888>,
    pub display_time: Duration,
}

impl LedFrame {
    /// Colours in strip order: low group, level indicators, high group.
    pub fn pixels(&self) -> impl Iterator<Item = Rgb888> + '_ {
        self.low
            .iter()
            .chain(self.level.iter())
            .chain(self.high.iter())
            .copied()
    }

    /// Number of lit level indicators.
    pub fn lit_level(&self) -> usize {
        self.level.iter().filter(|c| **c != Rgb888::BLACK).count()
    }
}

/// Three-segment rainbow over `0..=255`.
pub fn wheel(pos: u8) -> Rgb888 {
    match pos {
        0..=84 => Rgb888::new(pos * 3, 255 - pos * 3, 0),
        85..=169 => {
            let pos = pos - 85;
            Rgb888::new(255 - pos * 3, 0, pos * 3)
        }
        _ => {
            let pos = pos - 170;
            Rgb888::new(0, pos * 3, 255 - pos * 3)
        }
    }
}

/// How an indicator's position maps to its colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColourMap {
    Solid(Rgb888),
    /// Rainbow spread over the level indicators, rotated by `offset`
    Wheel { offset: u8 },
}

impl ColourMap {
    pub fn colour(&self, n: usize, layout: &LedLayout) -> Rgb888 {
        match *self {
            ColourMap::Solid(colour) => colour,
            ColourMap::Wheel { offset } => {
                let interval = 256 / layout.level_leds.max(1);
                wheel(((n * interval + offset as usize) & 255) as u8)
            }
        }
    }
}

/// A way of showing the tide on the strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    /// Fill indicators one per second, then flash the partial foot
    CountUpWheel,
    CountUpSolid(Rgb888),
    /// Hold the filled level while the rainbow rotates
    StaticWheel,
    /// Hold the filled level in one colour
    StaticSolid(Rgb888),
    Off,
}

const SOLID_COLOURS: [Rgb888; 5] = [
    Rgb888::RED,
    Rgb888::GREEN,
    Rgb888::BLUE,
    Rgb888::MAGENTA,
    Rgb888::CYAN,
];

const STEP: Duration = Duration::from_secs(1);
const FLASH: Duration = Duration::from_millis(100);
const HOLD: Duration = Duration::from_secs(10);

impl DisplayMode {
    /// Every mode the input button steps through, in order.
    pub fn cycle() -> Vec<DisplayMode> {
        let mut modes = vec![DisplayMode::CountUpWheel];
        modes.extend(SOLID_COLOURS.iter().map(|c| DisplayMode::CountUpSolid(*c)));
        modes.push(DisplayMode::StaticWheel);
        modes.extend(SOLID_COLOURS.iter().map(|c| DisplayMode::StaticSolid(*c)));
        modes.push(DisplayMode::Off);
        modes
    }

    /// Frames showing `level` feet with the given trend.
    ///
    /// All modes but [`DisplayMode::Off`] yield a finite sequence.
    pub fn frames(
        &self,
        layout: &LedLayout,
        level: f64,
        rising: bool,
    ) -> Box<dyn Iterator<Item = LedFrame> + Send> {
        match *self {
            DisplayMode::CountUpWheel => {
                Box::new(count_up(layout, level, rising, ColourMap::Wheel { offset: 0 }).into_iter())
            }
            DisplayMode::CountUpSolid(colour) => {
                Box::new(count_up(layout, level, rising, ColourMap::Solid(colour)).into_iter())
            }
            DisplayMode::StaticWheel => {
                let layout = *layout;
                Box::new((0..=255u8).map(move |offset| {
                    static_frame(&layout, level, rising, ColourMap::Wheel { offset }, FLASH)
                }))
            }
            DisplayMode::StaticSolid(colour) => Box::new(std::iter::once(static_frame(
                layout,
                level,
                rising,
                ColourMap::Solid(colour),
                HOLD,
            ))),
            DisplayMode::Off => {
                let frame = LedFrame {
                    low: vec![Rgb888::BLACK; layout.low_leds],
                    level: vec![Rgb888::BLACK; layout.level_leds],
                    high: vec![Rgb888::BLACK; layout.high_leds],
                    display_time: STEP,
                };
                Box::new(std::iter::repeat(frame))
            }
        }
    }
}

/// Current position in [`DisplayMode::cycle`], advanced by input events.
#[derive(Clone, Debug)]
pub struct ModeSelector {
    modes: Vec<DisplayMode>,
    index: usize,
}

impl ModeSelector {
    /// Start at `index`, wrapping out-of-range values.
    pub fn new(index: usize) -> Self {
        let modes = DisplayMode::cycle();
        let index = index % modes.len();
        ModeSelector { modes, index }
    }

    pub fn current(&self) -> DisplayMode {
        self.modes[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Step to the next mode, wrapping after the last.
    pub fn advance(&mut self) -> DisplayMode {
        self.index = (self.index + 1) % self.modes.len();
        self.current()
    }
}

impl Default for ModeSelector {
    fn default() -> Self {
        ModeSelector::new(0)
    }
}

/// Trend indicators: the low group lights while falling, the high group while rising.
fn trend_groups(layout: &LedLayout, rising: bool, colours: ColourMap) -> (Vec<Rgb888>, Vec<Rgb888>) {
    let low = if rising {
        Rgb888::BLACK
    } else {
        colours.colour(0, layout)
    };
    let high = if rising {
        colours.colour(layout.level_leds.saturating_sub(1), layout)
    } else {
        Rgb888::BLACK
    };
    (vec![low; layout.low_leds], vec![high; layout.high_leds])
}

fn count_up(layout: &LedLayout, level: f64, rising: bool, colours: ColourMap) -> Vec<LedFrame> {
    let (low, high) = trend_groups(layout, rising, colours);
    let mut strip = vec![Rgb888::BLACK; layout.level_leds];
    let frame = |strip: &[Rgb888], display_time| LedFrame {
        low: low.clone(),
        level: strip.to_vec(),
        high: high.clone(),
        display_time,
    };

    let mut frames = vec![frame(&strip, STEP)];
    let whole = level.trunc();
    let whole_feet = whole as i32;

    for n in 0..layout.level_leds {
        if whole_feet >= layout.threshold(n) {
            strip[n] = colours.colour(n, layout);
            frames.push(frame(&strip, STEP));
        } else {
            // Tenths of a foot above the last lit indicator, shown as flashes
            let flashes = ((level - whole) * 10.0) as i32;
            for _ in 0..flashes {
                for colour in [colours.colour(n, layout), Rgb888::BLACK] {
                    strip[n] = colour;
                    frames.push(frame(&strip, FLASH));
                }
            }
            break;
        }
    }
    frames
}

fn static_frame(
    layout: &LedLayout,
    level: f64,
    rising: bool,
    colours: ColourMap,
    display_time: Duration,
) -> LedFrame {
    let (low, high) = trend_groups(layout, rising, colours);
    let whole_feet = level.trunc() as i32;
    let level = (0..layout.level_leds)
        .map(|n| {
            if whole_feet >= layout.threshold(n) {
                colours.colour(n, layout)
            } else {
                Rgb888::BLACK
            }
        })
        .collect();
    LedFrame {
        low,
        level,
        high,
        display_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_segments() {
        assert_eq!(wheel(0), Rgb888::new(0, 255, 0));
        assert_eq!(wheel(85), Rgb888::new(255, 0, 0));
        assert_eq!(wheel(170), Rgb888::new(0, 0, 255));
        assert_eq!(wheel(255), Rgb888::new(0, 255, 0));
    }

    #[test]
    fn cycle_has_thirteen_modes_ending_off() {
        let modes = DisplayMode::cycle();
        assert_eq!(modes.len(), 13);
        assert_eq!(modes[0], DisplayMode::CountUpWheel);
        assert_eq!(modes[1], DisplayMode::CountUpSolid(Rgb888::RED));
        assert_eq!(modes[6], DisplayMode::StaticWheel);
        assert_eq!(modes[12], DisplayMode::Off);
    }

    #[test]
    fn selector_wraps() {
        let mut selector = ModeSelector::new(12);
        assert_eq!(selector.current(), DisplayMode::Off);
        assert_eq!(selector.advance(), DisplayMode::CountUpWheel);
        assert_eq!(ModeSelector::new(14).index(), 1);
    }

    #[test]
    fn count_up_fills_then_flashes_remainder() {
        let layout = LedLayout::default();
        let frames: Vec<_> = DisplayMode::CountUpSolid(Rgb888::BLUE)
            .frames(&layout, 5.35, true)
            .collect();

        // Blank frame, indicators for -2..=5 (8 of them), then 3 on/off flashes
        assert_eq!(frames.len(), 1 + 8 + 3 * 2);
        assert_eq!(frames[0].lit_level(), 0);
        assert_eq!(frames[8].lit_level(), 8);
        assert_eq!(frames[8].display_time, Duration::from_secs(1));

        let flash_on = &frames[9];
        assert_eq!(flash_on.lit_level(), 9);
        assert_eq!(flash_on.display_time, Duration::from_millis(100));
        assert_eq!(frames.last().unwrap().lit_level(), 8);
    }

    #[test]
    fn trend_groups_follow_direction() {
        let layout = LedLayout::default();
        let rising = DisplayMode::StaticSolid(Rgb888::GREEN)
            .frames(&layout, 3.0, true)
            .next()
            .unwrap();
        assert!(rising.low.iter().all(|c| *c == Rgb888::BLACK));
        assert!(rising.high.iter().all(|c| *c == Rgb888::GREEN));

        let falling = DisplayMode::StaticSolid(Rgb888::GREEN)
            .frames(&layout, 3.0, false)
            .next()
            .unwrap();
        assert!(falling.low.iter().all(|c| *c == Rgb888::GREEN));
        assert!(falling.high.iter().all(|c| *c == Rgb888::BLACK));
    }

    #[test]
    fn static_modes() {
        let layout = LedLayout::default();
        let solid: Vec<_> = DisplayMode::StaticSolid(Rgb888::CYAN)
            .frames(&layout, 0.9, false)
            .collect();
        assert_eq!(solid.len(), 1);
        // -2, -1 and 0 are at or below 0.9 truncated
        assert_eq!(solid[0].lit_level(), 3);
        assert_eq!(solid[0].display_time, Duration::from_secs(10));

        let wheel: Vec<_> = DisplayMode::StaticWheel.frames(&layout, 4.2, true).collect();
        assert_eq!(wheel.len(), 256);
        assert_ne!(wheel[0].level[0], wheel[1].level[0]);
        assert!(wheel.iter().all(|f| f.lit_level() == 7));
    }

    #[test]
    fn level_above_strip_lights_everything_without_flashing() {
        let layout = LedLayout::default();
        let frames: Vec<_> = DisplayMode::CountUpWheel.frames(&layout, 14.7, true).collect();
        assert_eq!(frames.len(), 1 + layout.level_leds);
        assert_eq!(frames.last().unwrap().lit_level(), layout.level_leds);
    }

    #[test]
    fn off_is_endless_and_dark() {
        let layout = LedLayout::default();
        let frames: Vec<_> = DisplayMode::Off.frames(&layout, 5.0, true).take(100).collect();
        assert_eq!(frames.len(), 100);
        assert!(frames.iter().all(|f| f.pixels().all(|c| c == Rgb888::BLACK)));
        assert_eq!(frames[0].pixels().count(), layout.total());
    }
}
