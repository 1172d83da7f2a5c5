use crate::audio::AudioSink;
use crate::error::{CwError, Result};
use crate::symbols::{encode, Code};
use crate::synth::{Element, SampleBuffer, ToneSynthesizer};
use crate::timing::{frames, Timing};
use crate::Options;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Queuing,
    Playing,
}

struct Queue {
    state: PlayerState,
    elements: Vec<Element>,
    after_char: bool,
}

impl Queue {
    fn push(&mut self, element: Element) {
        match (self.elements.last_mut(), element) {
            (Some(Element::Silence(last)), Element::Silence(more)) => *last += more,
            _ => self.elements.push(element),
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.state == PlayerState::Playing {
            return Err(CwError::Busy);
        }
        Ok(())
    }
}

pub struct Player<S: AudioSink> {
    options: Options,
    timing: Timing,
    synth: ToneSynthesizer,
    queue: Mutex<Queue>,
    sink: Mutex<S>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl<S: AudioSink> Player<S> {
    pub fn new(options: Options, sink: S) -> Result<Self> {
        let synth = ToneSynthesizer::new(&options)?;
        let timing = Timing::from_wpm(options.wpm)?;
        log::debug!(
            "Player at {} wpm, {} Hz: dot {:?}",
            options.wpm,
            options.frequency_hz,
            timing.dot
        );

        Ok(Self {
            options,
            timing,
            synth,
            queue: Mutex::new(Queue {
                state: PlayerState::Idle,
                elements: Vec::new(),
                after_char: false,
            }),
            sink: Mutex::new(sink),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn state(&self) -> PlayerState {
        lock(&self.queue).state
    }

    /// Also forgets the last character, so a following space is a full word
    /// gap.
    pub fn reset(&self) -> Result<()> {
        let mut queue = lock(&self.queue);
        queue.ensure_idle()?;
        queue.elements.clear();
        queue.after_char = false;
        queue.state = PlayerState::Idle;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let mut queue = lock(&self.queue);
        queue.ensure_idle()?;
        queue.elements.clear();
        queue.state = PlayerState::Idle;
        Ok(())
    }

    pub fn rune(&self, c: char) -> Result<()> {
        let mut queue = lock(&self.queue);
        queue.ensure_idle()?;
        self.push_char(&mut queue, c);
        Ok(())
    }

    pub fn string(&self, s: &str) -> Result<()> {
        let mut queue = lock(&self.queue);
        queue.ensure_idle()?;
        for c in s.chars() {
            self.push_char(&mut queue, c);
        }
        Ok(())
    }

    fn push_char(&self, queue: &mut Queue, c: char) {
        let t = &self.timing;
        match encode(c) {
            Code::Symbols(symbols) => {
                for symbol in symbols {
                    queue.push(Element::Tone(t.symbol(symbol)));
                    queue.push(Element::Silence(t.intra_gap));
                }
                queue.push(Element::Silence(t.char_gap_remainder()));
                queue.after_char = true;
            }
            Code::WordGap => {
                let gap = if queue.after_char {
                    t.word_gap_remainder()
                } else {
                    t.inter_word_gap
                };
                queue.push(Element::Silence(gap));
                queue.after_char = false;
            }
        }
        queue.state = PlayerState::Queuing;
    }

    pub fn elements(&self) -> Vec<Element> {
        lock(&self.queue).elements.clone()
    }

    pub fn duration(&self) -> Duration {
        lock(&self.queue).elements.iter().map(Element::duration).sum()
    }

    pub fn render(&self, elements: &[Element]) -> SampleBuffer {
        let rate = self.options.sample_rate;
        let total: Duration = elements.iter().map(Element::duration).sum();
        let mut samples = Vec::with_capacity(frames(total, rate) * self.options.channels as usize);

        let mut elapsed = Duration::ZERO;
        let mut start = 0;
        for element in elements {
            elapsed += element.duration();
            let end = frames(elapsed, rate);
            self.synth.render_into(element.is_tone(), end - start, &mut samples);
            start = end;
        }

        SampleBuffer::new(self.synth.format(), samples)
    }

    /// Blocks until the sink has played the queue. On failure the queue is
    /// kept.
    pub fn sync_play(&self) -> Result<()> {
        let elements = {
            let mut queue = lock(&self.queue);
            queue.ensure_idle()?;
            if queue.elements.is_empty() {
                return Ok(());
            }
            queue.state = PlayerState::Playing;
            queue.elements.clone()
        };

        let buffer = self.render(&elements);
        log::info!(
            "Playing {} frames ({:?})",
            buffer.frames(),
            buffer.duration()
        );

        let started = Instant::now();
        let result = lock(&self.sink).play(&buffer);

        let mut queue = lock(&self.queue);
        match &result {
            Ok(()) => {
                log::info!("Playback finished after {:?}", started.elapsed());
                queue.elements.clear();
                queue.after_char = false;
                queue.state = PlayerState::Idle;
            }
            Err(e) => {
                log::warn!("Playback failed, keeping {} queued elements: {}", elements.len(), e);
                queue.state = PlayerState::Queuing;
            }
        }
        result
    }
}
